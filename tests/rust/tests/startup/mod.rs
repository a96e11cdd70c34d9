//! Host startup tests
//!
//! Configuration is loaded first (the table supplies `IndexFormat`), then
//! the logger is assembled from it, as a host does at startup.

use std::sync::Arc;

use hostkit_config::{ConfigurationBuilder, SqlConfigurationBuilderExt, StandardSourcesExt};
use hostkit_logging::{
    configure_logger_for, configure_logger_with_endpoint, HostEnvironment, TraceContext,
    TraceContextExt, DEFAULT_ELASTICSEARCH_URL, INDEX_FORMAT_KEY,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::db::TestConfigDatabase;
use tests::elasticsearch::all_bulk_items;
use tests::sinks::CapturingSink;
use tracing::level_filters::LevelFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_index_format_flows_from_table_to_logger() {
    let db = TestConfigDatabase::with_rows(&[(INDEX_FORMAT_KEY, "billing-api-{0:yyyy.MM.dd}")]);
    let config = ConfigurationBuilder::new()
        .add_in_memory([(INDEX_FORMAT_KEY, "overridden")])
        .add_custom_configuration(db.connection_string())
        .build()
        .unwrap();

    let env = HostEnvironment::new("billing-api", "Staging");
    let logger = configure_logger_for(&env, config.get(INDEX_FORMAT_KEY));

    let options = logger.elasticsearch_options().unwrap();
    assert_eq!(options.node_uri, DEFAULT_ELASTICSEARCH_URL);
    assert_eq!(options.index_format.as_deref(), Some("billing-api-{0:yyyy.MM.dd}"));
    assert_eq!(options.index_pattern(), "billing-api-*");
    assert_eq!(options.minimum_level, LevelFilter::DEBUG);
    assert!(logger.has_console_sink());
    assert_eq!(logger.level_for("billing_api"), LevelFilter::INFO);
}

#[test]
fn test_missing_index_format_uses_sink_default() {
    let db = TestConfigDatabase::new();
    let config = ConfigurationBuilder::new()
        .add_custom_configuration(db.connection_string())
        .build()
        .unwrap();

    let env = HostEnvironment::new("billing-api", "Production");
    let logger = configure_logger_for(&env, config.get(INDEX_FORMAT_KEY));

    let options = logger.elasticsearch_options().unwrap();
    assert_eq!(options.index_format, None);
    assert_eq!(options.effective_index_format(), "logstash-{0:yyyy.MM.dd}");
}

#[test]
fn test_config_failure_stops_startup() {
    let db = TestConfigDatabase::with_rows(&[("IndexFormat", "a"), ("indexformat", "b")]);

    let result = ConfigurationBuilder::new()
        .add_custom_configuration(db.connection_string())
        .build();

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_events_reach_console_capture_and_elasticsearch() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errors": false })))
        .mount(&server)
        .await;

    let db = TestConfigDatabase::with_rows(&[(INDEX_FORMAT_KEY, "billing-{0:yyyy}")]);
    let config = ConfigurationBuilder::new()
        .add_custom_configuration(db.connection_string())
        .build()
        .unwrap();

    let capture = Arc::new(CapturingSink::new());
    let logger = configure_logger_with_endpoint(
        "billing-api",
        "Development",
        config.get(INDEX_FORMAT_KEY),
        true,
        &server.uri(),
    )
    .write_to(capture.clone());

    tokio::task::spawn_blocking(move || {
        let (subscriber, guard) = logger.build().unwrap();
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!(target: "billing_api", "request");
            span.set_trace_context(TraceContext::hierarchical("|req42.1.", Some("|req42.")));
            let _entered = span.enter();

            tracing::debug!(target: "billing_api", "loading invoices");
            tracing::info!(target: "Microsoft.AspNetCore", "suppressed");
        });
        guard.flush();
        drop(guard);
    })
    .await
    .unwrap();

    assert_eq!(capture.messages(), vec!["loading invoices"]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].method.as_str(), "PUT");

    let items = all_bulk_items(&requests);
    assert_eq!(items.len(), 1);
    let (action, document) = &items[0];
    let index = action["index"]["_index"].as_str().unwrap();
    assert!(index.starts_with("billing-2"), "unexpected index {}", index);
    assert_eq!(document["level"], "Debug");
    assert_eq!(document["fields"]["ApplicationName"], "billing-api");
    assert_eq!(document["fields"]["EnvironmentName"], "Development");
    assert_eq!(document["fields"]["SpanId"], "|req42.1.");
    assert_eq!(document["fields"]["TraceId"], "req42");
    assert_eq!(document["fields"]["ParentId"], "|req42.");
}
