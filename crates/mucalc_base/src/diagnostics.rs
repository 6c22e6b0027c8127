//! The line-oriented diagnostics sink shared by the reduction engines.
//!
//! Three channels exist: *verbose* progress notes, *warnings* that never
//! interrupt a computation, and *errors* that abort the current top-level
//! call. Messages are forwarded to the [`log`] facade so embedders pick
//! them up with their usual logger; warnings and errors are additionally
//! retained on the sink so callers and tests can inspect them after a run.

use std::fmt;

/// Severity of a retained diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Verbose,
    Warning,
    Error,
}

/// A single retained diagnostic message.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Verbose => "verbose",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}", tag, self.message)
    }
}

/// Collecting sink for warnings and errors.
///
/// Verbose messages only go to the `log` facade; warnings and errors are
/// both logged and retained.
#[derive(Default)]
pub struct Diagnostics {
    retained: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a verbose progress message.
    pub fn verbose(&mut self, message: impl Into<String>) {
        log::debug!("{}", message.into());
    }

    /// Emits a warning. Warnings never interrupt the computation.
    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.retained.push(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    /// Emits an error. The caller is expected to return a failure after
    /// recording one.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{message}");
        self.retained.push(Diagnostic {
            severity: Severity::Error,
            message,
        });
    }

    /// All retained warnings and errors, in emission order.
    pub fn messages(&self) -> &[Diagnostic] {
        &self.retained
    }

    /// Retained warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.retained
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// True if any error was recorded.
    pub fn has_errors(&self) -> bool {
        self.retained.iter().any(|d| d.severity == Severity::Error)
    }

    /// Drops all retained messages, keeping the sink itself usable.
    pub fn clear(&mut self) {
        self.retained.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_retained() {
        let mut sink = Diagnostics::new();
        sink.warning("allow disallows (multi-)action(s)");
        assert_eq!(sink.warnings().count(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn errors_are_flagged() {
        let mut sink = Diagnostics::new();
        sink.error("cannot evaluate parameter value");
        assert!(sink.has_errors());
    }

    #[test]
    fn verbose_is_not_retained() {
        let mut sink = Diagnostics::new();
        sink.verbose("applying alphabet reductions");
        assert!(sink.messages().is_empty());
    }
}
