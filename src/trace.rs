//! Room activity tracing
//!
//! A [`Tracer`] receives human-readable strings about room activity: joins,
//! leaves, received messages and per-member deliveries. It is an
//! observability hook for operators and tests, separate from the `tracing`
//! logs the crate emits. The room uses [`off()`] unless told otherwise.

use std::io::Write;
use std::sync::Mutex;

/// Receiver of room activity traces
pub trait Tracer: Send + Sync {
    /// Record one trace line
    fn trace(&self, line: &str);
}

/// Tracer that writes each trace to a writer, followed by a newline
#[derive(Debug)]
pub struct WriterTracer<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterTracer<W> {
    /// Take the writer back
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Tracer for WriterTracer<W> {
    fn trace(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        // A broken trace sink must never disturb the room.
        let _ = writeln!(out, "{}", line);
    }
}

/// Tracer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn trace(&self, _line: &str) {}
}

/// Tracer that forwards traces to `tracing` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn trace(&self, line: &str) {
        tracing::debug!(target: "chat_relay::trace", "{}", line);
    }
}

/// Create a tracer that writes to `out`
pub fn new<W: Write + Send>(out: W) -> WriterTracer<W> {
    WriterTracer {
        out: Mutex::new(out),
    }
}

/// Create a tracer that ignores all traces
pub fn off() -> NoopTracer {
    NoopTracer
}
