//! Injected observability for the checked query layer.
//!
//! Faults (internal-consistency violations) and warnings never fail a query.
//! They are routed through a [`Diagnostics`] handle instead of an ambient
//! logger so tests can assert on exactly what was reported.

use parking_lot::Mutex;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    /// An internal-consistency violation: the index or the caller broke an
    /// invariant and a deterministic fallback was used.
    Fault,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

pub trait Diagnostics: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);

    fn warning(&self, message: &str) {
        self.emit(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    fn fault(&self, message: &str) {
        self.emit(Severity::Fault, message);
    }
}

/// Forwards to `tracing`. Faults are logged at error level with `fault = true`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
            Severity::Fault => error!(fault = true, "{message}"),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    recorded: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.recorded.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.recorded
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.recorded.lock().clear();
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        self.recorded.lock().push(Diagnostic {
            severity,
            message: message.to_string(),
        });
    }
}
