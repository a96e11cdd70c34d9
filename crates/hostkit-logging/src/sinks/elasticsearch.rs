//! Elasticsearch sink
//!
//! Events are rendered to bulk-API documents on the logging thread and
//! handed to a dedicated worker thread over a channel. The worker posts
//! NDJSON batches to `<node>/_bulk` when the batch is full, when the period
//! elapses, on flush and on shutdown. When template auto-registration is on,
//! the index template is registered once before the first batch.
//!
//! Delivery is best-effort: a failed request is reported on stderr and its
//! batch is dropped. Nothing is retried.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::level_filters::LevelFilter;
use url::Url;

use super::LogSink;
use crate::error::LoggingError;
use crate::event::{level_name, LogEvent};

/// Index name used when no format is configured.
pub const DEFAULT_INDEX_FORMAT: &str = "logstash-{0:yyyy.MM.dd}";
/// Name under which the index template is registered.
pub const DEFAULT_TEMPLATE_NAME: &str = "hostkit-events-template";
/// Property naming the category of an event in indexed documents.
pub const SOURCE_CONTEXT_PROPERTY: &str = "SourceContext";

const DEFAULT_BATCH_POSTING_LIMIT: usize = 50;
const DEFAULT_PERIOD: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(15);
const ESV6_TYPE_NAME: &str = "logevent";
const NDJSON: &str = "application/x-ndjson";

/// Elasticsearch major version the index template targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateVersion {
    ESv6,
    #[default]
    ESv7,
    ESv8,
}

/// Settings of the Elasticsearch sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticsearchSinkOptions {
    /// Base URL of the node, e.g. `http://localhost:9200`.
    pub node_uri: String,
    /// Register the index template before the first batch.
    pub auto_register_template: bool,
    pub template_version: TemplateVersion,
    pub template_name: String,
    /// Index name format; `{0:<date pattern>}` is replaced with the event
    /// date. `None` means [`DEFAULT_INDEX_FORMAT`].
    pub index_format: Option<String>,
    /// Most verbose level forwarded to the index.
    pub minimum_level: LevelFilter,
    /// Events per bulk request.
    pub batch_posting_limit: usize,
    /// Longest time an event waits before its batch is posted.
    pub period: Duration,
}

impl ElasticsearchSinkOptions {
    pub fn new(node_uri: impl Into<String>) -> Self {
        Self {
            node_uri: node_uri.into(),
            auto_register_template: false,
            template_version: TemplateVersion::default(),
            template_name: DEFAULT_TEMPLATE_NAME.to_string(),
            index_format: None,
            minimum_level: LevelFilter::TRACE,
            batch_posting_limit: DEFAULT_BATCH_POSTING_LIMIT,
            period: DEFAULT_PERIOD,
        }
    }

    /// The configured index format, or the default.
    pub fn effective_index_format(&self) -> &str {
        self.index_format.as_deref().unwrap_or(DEFAULT_INDEX_FORMAT)
    }

    /// Wildcard pattern matching every index this sink writes to.
    pub fn index_pattern(&self) -> String {
        let format = self.effective_index_format();
        let prefix = format.split('{').next().unwrap_or_default();
        format!("{}*", prefix.to_lowercase())
    }
}

// =============================================================================
// Index names
// =============================================================================

/// Render an index name for an event timestamp.
///
/// `{0:yyyy.MM.dd}` style placeholders accept the date tokens `yyyy`, `yy`,
/// `MM`, `dd`, `HH`, `hh`, `mm` and `ss`; a bare `{0}` renders `yyyy.MM.dd`.
/// Elasticsearch index names are lowercase, so the result is too.
pub fn render_index_name(format: &str, timestamp: DateTime<Utc>) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let placeholder = &after[..end];
        match placeholder.strip_prefix('0') {
            Some("") => out.push_str(&timestamp.format("%Y.%m.%d").to_string()),
            Some(spec) if spec.starts_with(':') => {
                let pattern = date_pattern_to_strftime(&spec[1..]);
                out.push_str(&timestamp.format(&pattern).to_string());
            }
            _ => {
                out.push('{');
                out.push_str(placeholder);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out.to_lowercase()
}

fn date_pattern_to_strftime(pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut out = String::new();
    let mut rest = pattern;

    'scan: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(remaining) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = remaining;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }

    out
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Serialize)]
struct Document<'a> {
    #[serde(rename = "@timestamp")]
    timestamp: String,
    level: &'static str,
    message: &'a str,
    fields: Map<String, Value>,
}

impl<'a> Document<'a> {
    fn from_event(event: &'a LogEvent) -> Self {
        let mut fields: Map<String, Value> = event
            .properties()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fields
            .entry(SOURCE_CONTEXT_PROPERTY)
            .or_insert_with(|| Value::from(event.target.as_str()));

        Self {
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level_name(event.level),
            message: &event.message,
            fields,
        }
    }
}

/// A rendered document waiting for its bulk request.
#[derive(Debug)]
struct PendingDocument {
    index: String,
    body: String,
}

fn bulk_body(version: TemplateVersion, batch: &[PendingDocument]) -> String {
    let mut body = String::new();
    for doc in batch {
        let action = match version {
            TemplateVersion::ESv6 => {
                json!({ "index": { "_index": doc.index, "_type": ESV6_TYPE_NAME } })
            }
            TemplateVersion::ESv7 | TemplateVersion::ESv8 => {
                json!({ "index": { "_index": doc.index } })
            }
        };
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&doc.body);
        body.push('\n');
    }
    body
}

fn template_path(version: TemplateVersion, name: &str) -> String {
    match version {
        TemplateVersion::ESv6 | TemplateVersion::ESv7 => format!("_template/{}", name),
        TemplateVersion::ESv8 => format!("_index_template/{}", name),
    }
}

fn template_body(version: TemplateVersion, index_pattern: &str) -> Value {
    let settings = json!({ "index.refresh_interval": "5s" });
    let mappings = json!({
        "dynamic_templates": [{
            "string_fields": {
                "match": "*",
                "match_mapping_type": "string",
                "mapping": {
                    "type": "text",
                    "index": true,
                    "norms": false,
                    "fields": {
                        "raw": { "type": "keyword", "index": true, "ignore_above": 256 }
                    }
                }
            }
        }],
        "properties": {
            "message": { "type": "text", "index": true },
            "@timestamp": { "type": "date" },
            "level": { "type": "keyword" },
            "fields": { "type": "object", "dynamic": true }
        }
    });

    match version {
        TemplateVersion::ESv6 => json!({
            "index_patterns": [index_pattern],
            "settings": settings,
            "mappings": { "_default_": mappings }
        }),
        TemplateVersion::ESv7 => json!({
            "index_patterns": [index_pattern],
            "settings": settings,
            "mappings": mappings
        }),
        TemplateVersion::ESv8 => json!({
            "index_patterns": [index_pattern],
            "template": { "settings": settings, "mappings": mappings }
        }),
    }
}

// =============================================================================
// Sink
// =============================================================================

#[derive(Debug)]
enum Message {
    Event(PendingDocument),
    Flush(Sender<()>),
    Shutdown,
}

/// Sink forwarding events to an Elasticsearch node.
#[derive(Debug)]
pub struct ElasticsearchSink {
    sender: Sender<Message>,
    index_format: String,
    minimum_level: LevelFilter,
}

/// Owns the sink's worker thread. Dropping it posts what is queued and
/// stops the worker.
#[derive(Debug)]
pub struct ElasticsearchWorker {
    sender: Sender<Message>,
    handle: Option<JoinHandle<()>>,
}

impl ElasticsearchSink {
    /// Validate the options and start the worker thread.
    pub fn start(
        options: ElasticsearchSinkOptions,
    ) -> Result<(Self, ElasticsearchWorker), LoggingError> {
        let endpoints = Endpoints::new(&options)?;
        let (sender, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let worker_options = options.clone();
        let handle = std::thread::Builder::new()
            .name("elasticsearch-sink".to_string())
            .spawn(move || {
                // The blocking client owns a runtime; it must live and die on
                // this thread.
                let client = match Client::builder().timeout(REQUEST_TIMEOUT).build() {
                    Ok(client) => {
                        let _ = ready_tx.send(Ok(()));
                        client
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                BulkWorker::new(client, endpoints, worker_options).run(receiver);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(LoggingError::HttpClient(e));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(LoggingError::WorkerSpawn(std::io::Error::other(
                    "elasticsearch worker exited during startup",
                )));
            }
        }

        let sink = Self {
            sender: sender.clone(),
            index_format: options.effective_index_format().to_string(),
            minimum_level: options.minimum_level,
        };
        let worker = ElasticsearchWorker {
            sender,
            handle: Some(handle),
        };
        Ok((sink, worker))
    }
}

impl LogSink for ElasticsearchSink {
    fn minimum_level(&self) -> LevelFilter {
        self.minimum_level
    }

    fn emit(&self, event: &LogEvent) {
        let body = match serde_json::to_string(&Document::from_event(event)) {
            Ok(body) => body,
            Err(e) => {
                eprintln!("[Elasticsearch] Failed to serialize log event: {}", e);
                return;
            }
        };
        let index = render_index_name(&self.index_format, event.timestamp);

        // A closed channel means the worker has shut down; the event is dropped.
        let _ = self.sender.send(Message::Event(PendingDocument { index, body }));
    }

    fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.sender.send(Message::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv_timeout(FLUSH_TIMEOUT);
        }
    }
}

impl Drop for ElasticsearchWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                eprintln!("[Elasticsearch] Worker thread panicked");
            }
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

#[derive(Debug, Clone)]
struct Endpoints {
    bulk: Url,
    template: Url,
}

impl Endpoints {
    fn new(options: &ElasticsearchSinkOptions) -> Result<Self, LoggingError> {
        let invalid = |source| LoggingError::InvalidEndpoint {
            endpoint: options.node_uri.clone(),
            source,
        };

        let mut base = Url::parse(&options.node_uri).map_err(invalid)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            bulk: base.join("_bulk").map_err(invalid)?,
            template: base
                .join(&template_path(options.template_version, &options.template_name))
                .map_err(invalid)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
}

struct BulkWorker {
    client: Client,
    endpoints: Endpoints,
    options: ElasticsearchSinkOptions,
    template_pending: bool,
    batch: Vec<PendingDocument>,
}

impl BulkWorker {
    fn new(client: Client, endpoints: Endpoints, options: ElasticsearchSinkOptions) -> Self {
        Self {
            client,
            endpoints,
            template_pending: options.auto_register_template,
            batch: Vec::with_capacity(options.batch_posting_limit),
            options,
        }
    }

    fn run(mut self, receiver: Receiver<Message>) {
        let mut deadline = Instant::now() + self.options.period;

        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(timeout) {
                Ok(Message::Event(doc)) => {
                    self.batch.push(doc);
                    if self.batch.len() >= self.options.batch_posting_limit.max(1) {
                        self.post_batch();
                    }
                }
                Ok(Message::Flush(ack)) => {
                    self.post_batch();
                    let _ = ack.send(());
                }
                Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    self.post_batch();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if Instant::now() >= deadline {
                self.post_batch();
                deadline = Instant::now() + self.options.period;
            }
        }
    }

    fn register_template(&mut self) {
        self.template_pending = false;

        let body = template_body(self.options.template_version, &self.options.index_pattern());
        let result = self
            .client
            .put(self.endpoints.template.clone())
            .json(&body)
            .send();

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => eprintln!(
                "[Elasticsearch] Template registration rejected: HTTP {}",
                response.status()
            ),
            Err(e) => eprintln!("[Elasticsearch] Template registration failed: {}", e),
        }
    }

    fn post_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if self.template_pending {
            self.register_template();
        }

        let body = bulk_body(self.options.template_version, &self.batch);
        let count = self.batch.len();
        self.batch.clear();

        let result = self
            .client
            .post(self.endpoints.bulk.clone())
            .header(CONTENT_TYPE, NDJSON)
            .body(body)
            .send();

        match result {
            Ok(response) if response.status().is_success() => {
                let parsed: BulkResponse = response.json().unwrap_or_default();
                if parsed.errors {
                    eprintln!(
                        "[Elasticsearch] Some of {} events were rejected by the bulk API",
                        count
                    );
                }
            }
            Ok(response) => eprintln!(
                "[Elasticsearch] Bulk request rejected: HTTP {} ({} events dropped)",
                response.status(),
                count
            ),
            Err(e) => eprintln!(
                "[Elasticsearch] Bulk request failed: {} ({} events dropped)",
                e, count
            ),
        }
    }
}
