//! Trace Context - distributed-trace identifiers of the current unit of work
//!
//! A [`TraceContext`] is attached to a tracing span with
//! [`TraceContextExt::set_trace_context`] and stored in the span's
//! extensions. Events emitted inside that span (or any child span) are
//! correlated by the pipeline layer through [`find_in_scope`], the only
//! place that reads this ambient state.

use rand::Rng;
use tracing::{Event, Span, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Registry;

use crate::error::LoggingError;

/// Trace identifiers in one of the supported id formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceContext {
    /// Legacy hierarchical id such as `|root.span1.`.
    Hierarchical {
        id: String,
        parent_id: Option<String>,
    },
    /// W3C trace-context ids.
    W3C {
        trace_id: [u8; 16],
        span_id: [u8; 8],
        parent_span_id: Option<[u8; 8]>,
    },
    /// An id format that cannot be interpreted.
    Unknown,
}

impl TraceContext {
    pub fn w3c(trace_id: [u8; 16], span_id: [u8; 8], parent_span_id: Option<[u8; 8]>) -> Self {
        TraceContext::W3C {
            trace_id,
            span_id,
            parent_span_id,
        }
    }

    pub fn hierarchical(id: impl Into<String>, parent_id: Option<&str>) -> Self {
        TraceContext::Hierarchical {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
        }
    }

    /// Start a new W3C trace with random ids and no parent.
    pub fn new_root() -> Self {
        TraceContext::W3C {
            trace_id: random_id(),
            span_id: random_id(),
            parent_span_id: None,
        }
    }

    /// Continue a trace from an incoming W3C `traceparent` header.
    ///
    /// Format: `00-<32 hex trace id>-<16 hex parent span id>-<2 hex flags>`.
    /// The returned context is a new span whose parent is the header's span.
    pub fn from_traceparent(header: &str) -> Result<Self, LoggingError> {
        let invalid = || LoggingError::InvalidTraceParent(header.to_string());

        let parts: Vec<&str> = header.trim().split('-').collect();
        let [version, trace, parent, flags] = parts.as_slice() else {
            return Err(invalid());
        };

        if version.len() != 2 || *version == "ff" || flags.len() != 2 {
            return Err(invalid());
        }
        let mut version_byte = [0u8; 1];
        let mut flags_byte = [0u8; 1];
        hex::decode_to_slice(version, &mut version_byte).map_err(|_| invalid())?;
        hex::decode_to_slice(flags, &mut flags_byte).map_err(|_| invalid())?;

        let mut trace_id = [0u8; 16];
        let mut parent_span_id = [0u8; 8];
        hex::decode_to_slice(trace, &mut trace_id).map_err(|_| invalid())?;
        hex::decode_to_slice(parent, &mut parent_span_id).map_err(|_| invalid())?;

        if is_zero(&trace_id) || is_zero(&parent_span_id) {
            return Err(invalid());
        }

        Ok(TraceContext::W3C {
            trace_id,
            span_id: random_id(),
            parent_span_id: Some(parent_span_id),
        })
    }

    /// A child span of this context in the same trace.
    pub fn child(&self) -> Self {
        match self {
            TraceContext::Hierarchical { id, .. } => {
                let suffix: u32 = rand::thread_rng().gen();
                TraceContext::Hierarchical {
                    id: format!("{}{:08x}.", id, suffix),
                    parent_id: Some(id.clone()),
                }
            }
            TraceContext::W3C {
                trace_id, span_id, ..
            } => TraceContext::W3C {
                trace_id: *trace_id,
                span_id: random_id(),
                parent_span_id: Some(*span_id),
            },
            TraceContext::Unknown => TraceContext::Unknown,
        }
    }

    /// Span id: the hierarchical id itself, or the hex W3C span id.
    pub fn span_id(&self) -> String {
        match self {
            TraceContext::Hierarchical { id, .. } => id.clone(),
            TraceContext::W3C { span_id, .. } => hex::encode(span_id),
            TraceContext::Unknown => String::new(),
        }
    }

    /// Trace id: the root of the hierarchy, or the hex W3C trace id.
    pub fn trace_id(&self) -> String {
        match self {
            TraceContext::Hierarchical { id, .. } => root_id(id).to_string(),
            TraceContext::W3C { trace_id, .. } => hex::encode(trace_id),
            TraceContext::Unknown => String::new(),
        }
    }

    /// Parent id. A hierarchical root has none and yields `""`; a W3C root
    /// yields the all-zero span id.
    pub fn parent_id(&self) -> String {
        match self {
            TraceContext::Hierarchical { parent_id, .. } => {
                parent_id.clone().unwrap_or_default()
            }
            TraceContext::W3C { parent_span_id, .. } => {
                hex::encode(parent_span_id.unwrap_or([0u8; 8]))
            }
            TraceContext::Unknown => String::new(),
        }
    }

    /// Render as a W3C `traceparent` value for outgoing requests.
    pub fn to_traceparent(&self) -> Option<String> {
        match self {
            TraceContext::W3C {
                trace_id, span_id, ..
            } => Some(format!(
                "00-{}-{}-01",
                hex::encode(trace_id),
                hex::encode(span_id)
            )),
            _ => None,
        }
    }
}

/// Root segment of a hierarchical id: `|root.span1.` → `root`.
fn root_id(id: &str) -> &str {
    let trimmed = id.strip_prefix('|').unwrap_or(id);
    match trimmed.find('.') {
        Some(end) => &trimmed[..end],
        None => trimmed,
    }
}

fn random_id<const N: usize>() -> [u8; N] {
    let mut rng = rand::thread_rng();
    let mut id = [0u8; N];
    while is_zero(&id) {
        rng.fill(&mut id[..]);
    }
    id
}

fn is_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

// =============================================================================
// Span attachment
// =============================================================================

/// Attach and read trace context on tracing spans.
pub trait TraceContextExt {
    /// Store `context` on this span, replacing any previous one.
    fn set_trace_context(&self, context: TraceContext);

    /// The context stored on this span, if any.
    fn trace_context(&self) -> Option<TraceContext>;
}

impl TraceContextExt for Span {
    fn set_trace_context(&self, context: TraceContext) {
        self.with_subscriber(|(id, dispatch)| {
            if let Some(registry) = dispatch.downcast_ref::<Registry>() {
                if let Some(span) = registry.span(id) {
                    span.extensions_mut().replace(context);
                }
            }
        });
    }

    fn trace_context(&self) -> Option<TraceContext> {
        self.with_subscriber(|(id, dispatch)| {
            let registry = dispatch.downcast_ref::<Registry>()?;
            let span = registry.span(id)?;
            let extensions = span.extensions();
            extensions.get::<TraceContext>().cloned()
        })
        .flatten()
    }
}

/// The trace context governing `event`: the nearest span in its scope
/// carrying one, searched from the innermost span outwards.
pub fn find_in_scope<S>(ctx: &Context<'_, S>, event: &Event<'_>) -> Option<TraceContext>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let scope = ctx.event_scope(event)?;
    for span in scope {
        let extensions = span.extensions();
        if let Some(context) = extensions.get::<TraceContext>() {
            return Some(context.clone());
        }
    }
    None
}
