//! Diagnostic output capability.
//!
//! The session reports human-readable progress and error text through
//! this narrow interface. Fan-out to multiple destinations and buffer
//! management are the embedding application's concern; the core only
//! needs "accepts a formatted message". With no sink supplied the
//! session uses [`NullDiagnostics`] and the output is discarded.

/// A destination for formatted diagnostic text.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, message: &str);
}

/// Discards all diagnostic output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl DiagnosticSink for NullDiagnostics {
    fn emit(&self, _message: &str) {}
}

/// Adapts a closure into a sink.
pub struct FnDiagnostics<F>(pub F);

impl<F> DiagnosticSink for FnDiagnostics<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn emit(&self, message: &str) {
        (self.0)(message)
    }
}
