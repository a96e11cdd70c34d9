use std::fmt::Write as _;
use std::io::Write;

use serde_json::Value;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

use super::LogSink;
use crate::event::LogEvent;

/// Writes one compact line per event to stdout (or any writer).
///
/// Writes go through a `tracing_appender` non-blocking writer; keep the
/// returned [`WorkerGuard`] alive so buffered lines are flushed on exit.
#[derive(Clone)]
pub struct ConsoleSink {
    writer: NonBlocking,
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

impl ConsoleSink {
    /// Sink writing to stdout.
    pub fn stdout() -> (Self, WorkerGuard) {
        Self::with_writer(std::io::stdout())
    }

    /// Sink writing to an arbitrary writer.
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> (Self, WorkerGuard) {
        let (writer, guard) = tracing_appender::non_blocking(writer);
        (Self { writer }, guard)
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, event: &LogEvent) {
        let line = render_line(event);
        let mut writer = self.writer.clone();
        if let Err(e) = writer.write_all(line.as_bytes()) {
            eprintln!("[Console] Failed to write log line: {}", e);
        }
    }
}

/// `HH:MM:SS.mmm LEVEL target: message key=value ...` followed by a newline.
pub fn render_line(event: &LogEvent) -> String {
    let mut line = format!(
        "{} {:>5} {}: {}",
        event.timestamp.format("%H:%M:%S%.3f"),
        event.level.as_str(),
        event.target,
        event.message
    );

    for (name, value) in event.properties() {
        match value {
            Value::String(s) => write!(line, " {}={}", name, s).ok(),
            other => write!(line, " {}={}", name, other).ok(),
        };
    }

    line.push('\n');
    line
}
