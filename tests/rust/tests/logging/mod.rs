//! Logging integration tests
//!
//! Tests for level rules, enrichment and the Elasticsearch sink.

mod pipeline;
