//! Configuration integration tests
//!
//! Tests for the table loader and the layered configuration pipeline.

mod table_loader;
