//! Pipeline tests: events flow through level rules and enrichers to sinks

use std::sync::Arc;

use hostkit_logging::{
    configure_logger_with_endpoint, LoggerConfiguration, TraceContext, TraceContextExt,
    APPLICATION_NAME_PROPERTY, ENVIRONMENT_NAME_PROPERTY, PARENT_ID_PROPERTY, SPAN_ID_PROPERTY,
    TRACE_ID_PROPERTY,
};
use pretty_assertions::assert_eq;
use tests::sinks::CapturingSink;

/// Logger for `billing-api` without the Elasticsearch sink, capturing events
fn capture(is_development: bool) -> (LoggerConfiguration, Arc<CapturingSink>) {
    let sink = Arc::new(CapturingSink::new());
    let environment = if is_development { "Development" } else { "Production" };
    let config = configure_logger_with_endpoint("billing-api", environment, None, is_development, "")
        .write_to(sink.clone());
    (config, sink)
}

fn run(config: &LoggerConfiguration, f: impl FnOnce()) {
    let (subscriber, _guard) = config.build().expect("logger should build");
    tracing::subscriber::with_default(subscriber, f);
}

// ============================================================================
// Level rules
// ============================================================================

#[test]
fn test_production_level_rules() {
    let (config, sink) = capture(false);

    run(&config, || {
        tracing::debug!(target: "billing_api", "app debug");
        tracing::info!(target: "billing_api", "app info");
        tracing::info!(target: "Microsoft.AspNetCore.Routing", "framework info");
        tracing::warn!(target: "Microsoft.AspNetCore.Routing", "framework warn");
        tracing::info!(target: "System.Net.Http.HttpClient.Default", "http info");
        tracing::info!(target: "Microsoft.Hosting.Lifetime", "lifetime info");
        tracing::debug!(target: "Microsoft.Hosting.Lifetime", "lifetime debug");
    });

    assert_eq!(
        sink.messages(),
        vec!["app info", "framework warn", "lifetime info"]
    );
}

#[test]
fn test_development_enables_application_debug() {
    let (config, sink) = capture(true);

    run(&config, || {
        tracing::debug!(target: "billing_api::jobs", "app debug");
        tracing::trace!(target: "billing_api::jobs", "app trace");
        tracing::debug!(target: "other_crate", "other debug");
    });

    assert_eq!(sink.messages(), vec!["app debug"]);
}

#[test]
fn test_sink_minimum_level() {
    let warnings = Arc::new(CapturingSink::with_minimum_level(
        tracing::level_filters::LevelFilter::WARN,
    ));
    let (config, everything) = capture(false);
    let config = config.write_to(warnings.clone());

    run(&config, || {
        tracing::info!(target: "billing_api", "info");
        tracing::error!(target: "billing_api", "error");
    });

    assert_eq!(everything.messages(), vec!["info", "error"]);
    assert_eq!(warnings.messages(), vec!["error"]);
}

// ============================================================================
// Enrichment
// ============================================================================

#[test]
fn test_static_properties() {
    let (config, sink) = capture(false);

    run(&config, || {
        tracing::info!(target: "billing_api", invoice = 42, "sent");
    });

    let event = sink.find("sent").unwrap();
    assert_eq!(event.property_str(APPLICATION_NAME_PROPERTY), Some("billing-api"));
    assert_eq!(event.property_str(ENVIRONMENT_NAME_PROPERTY), Some("Production"));
    assert_eq!(event.property("invoice"), Some(&serde_json::json!(42)));
}

#[test]
fn test_no_trace_context_yields_empty_ids() {
    let (config, sink) = capture(false);

    run(&config, || {
        tracing::info!(target: "billing_api", "outside any span");
    });

    let event = sink.find("outside any span").unwrap();
    assert_eq!(event.property_str(SPAN_ID_PROPERTY), Some(""));
    assert_eq!(event.property_str(TRACE_ID_PROPERTY), Some(""));
    assert_eq!(event.property_str(PARENT_ID_PROPERTY), Some(""));
}

#[test]
fn test_w3c_trace_context() {
    let (config, sink) = capture(false);
    let trace_id: [u8; 16] = core::array::from_fn(|i| 0xa0 + i as u8);
    let context = TraceContext::w3c(trace_id, [0x11; 8], Some([0x22; 8]));

    run(&config, || {
        let span = tracing::info_span!(target: "billing_api", "request");
        span.set_trace_context(context);
        let _entered = span.enter();
        tracing::info!(target: "billing_api", "in request");
    });

    let event = sink.find("in request").unwrap();
    assert_eq!(
        event.property_str(TRACE_ID_PROPERTY),
        Some("a0a1a2a3a4a5a6a7a8a9aaabacadaeaf")
    );
    assert_eq!(event.property_str(SPAN_ID_PROPERTY), Some("1111111111111111"));
    assert_eq!(event.property_str(PARENT_ID_PROPERTY), Some("2222222222222222"));
}

#[test]
fn test_hierarchical_trace_context() {
    let (config, sink) = capture(false);

    run(&config, || {
        let span = tracing::info_span!(target: "billing_api", "legacy");
        span.set_trace_context(TraceContext::hierarchical("|root.span1.", Some("|root.")));
        let _entered = span.enter();
        tracing::info!(target: "billing_api", "legacy call");
    });

    let event = sink.find("legacy call").unwrap();
    assert_eq!(event.property_str(SPAN_ID_PROPERTY), Some("|root.span1."));
    assert_eq!(event.property_str(TRACE_ID_PROPERTY), Some("root"));
    assert_eq!(event.property_str(PARENT_ID_PROPERTY), Some("|root."));
}

#[test]
fn test_explicit_span_id_is_not_overwritten() {
    let (config, sink) = capture(false);

    run(&config, || {
        let span = tracing::info_span!(target: "billing_api", "request");
        span.set_trace_context(TraceContext::new_root());
        let _entered = span.enter();
        tracing::info!(target: "billing_api", SpanId = "caller-span", "explicit");
    });

    let event = sink.find("explicit").unwrap();
    assert_eq!(event.property_str(SPAN_ID_PROPERTY), Some("caller-span"));
    assert_eq!(event.property_str(TRACE_ID_PROPERTY).map(str::len), Some(32));
}

#[test]
fn test_nearest_span_context_wins() {
    let (config, sink) = capture(false);
    let parent = TraceContext::from_traceparent(
        "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
    )
    .unwrap();
    let child = parent.child();

    run(&config, || {
        let outer = tracing::info_span!(target: "billing_api", "outer");
        outer.set_trace_context(parent.clone());
        let _outer = outer.enter();

        let inner = tracing::info_span!(target: "billing_api", "inner");
        inner.set_trace_context(child.clone());
        {
            let _inner = inner.enter();
            tracing::info!(target: "billing_api", "inner event");
        }

        // A span without its own context inherits the nearest one.
        let plain = tracing::info_span!(target: "billing_api", "plain");
        let _plain = plain.enter();
        tracing::info!(target: "billing_api", "plain event");
    });

    let inner = sink.find("inner event").unwrap();
    assert_eq!(
        inner.property_str(TRACE_ID_PROPERTY),
        Some("0af7651916cd43dd8448eb211c80319c")
    );
    assert_eq!(inner.property_str(SPAN_ID_PROPERTY), Some(child.span_id().as_str()));
    assert_eq!(inner.property_str(PARENT_ID_PROPERTY), Some(parent.span_id().as_str()));

    let plain = sink.find("plain event").unwrap();
    assert_eq!(plain.property_str(SPAN_ID_PROPERTY), Some(parent.span_id().as_str()));
    assert_eq!(plain.property_str(PARENT_ID_PROPERTY), Some("b7ad6b7169203331"));
}

#[test]
fn test_trace_context_readable_from_span() {
    let (config, _sink) = capture(false);
    let context = TraceContext::hierarchical("|abc.1.", None);

    run(&config, || {
        let span = tracing::info_span!(target: "billing_api", "request");
        assert_eq!(span.trace_context(), None);

        span.set_trace_context(context.clone());
        assert_eq!(span.trace_context(), Some(context.clone()));
    });
}
