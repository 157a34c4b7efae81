//! Injected warning sink.
//!
//! Components that need to warn the caller (task handles, the settings
//! attribute-name check) receive a `Diagnostics` from the owning [`Client`]
//! instead of writing to a process-wide logger.
//!
//! [`Client`]: crate::Client

use tracing::warn;

/// Receives non-fatal warnings. Warnings never change control flow.
pub trait Diagnostics: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        warn!(target: "docsearch", "{}", message);
    }
}

/// Drops every warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn warn(&self, _message: &str) {}
}
