//! Diagnostics shared by every pass of a compilation unit

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::SourceSpan;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Information,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Information => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A single message attached to a span of source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    Information { span: SourceSpan, message: String },
    Warning { span: SourceSpan, message: String },
    Error { span: SourceSpan, message: String },
}

impl Diagnostic {
    pub fn new(severity: Severity, span: SourceSpan, message: impl Into<String>) -> Self {
        let message = message.into();
        match severity {
            Severity::Information => Diagnostic::Information { span, message },
            Severity::Warning => Diagnostic::Warning { span, message },
            Severity::Error => Diagnostic::Error { span, message },
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Information { .. } => Severity::Information,
            Diagnostic::Warning { .. } => Severity::Warning,
            Diagnostic::Error { .. } => Severity::Error,
        }
    }

    pub fn span(&self) -> &SourceSpan {
        match self {
            Diagnostic::Information { span, .. }
            | Diagnostic::Warning { span, .. }
            | Diagnostic::Error { span, .. } => span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Diagnostic::Information { message, .. }
            | Diagnostic::Warning { message, .. }
            | Diagnostic::Error { message, .. } => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::Error { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity(), self.span(), self.message())
    }
}

/// Append-only, insertion-ordered diagnostic list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, span: SourceSpan, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(severity, span, message);
        log::trace!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.push(Severity::Error, span, message);
    }

    pub fn warning(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.push(Severity::Warning, span, message);
    }

    pub fn info(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.push(Severity::Information, span, message);
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity() == severity).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Remembers the error count at the start of a pass so that every
/// "no result" path can assert that it explained itself.
#[derive(Debug, Clone, Copy)]
pub struct ErrorGuard {
    baseline: usize,
}

impl ErrorGuard {
    pub fn new(diagnostics: &Diagnostics) -> Self {
        Self {
            baseline: diagnostics.error_count(),
        }
    }

    pub fn has_new_errors(&self, diagnostics: &Diagnostics) -> bool {
        diagnostics.error_count() > self.baseline
    }

    /// Debug-asserts that at least one Error was appended since the pass began
    pub fn assert_has_errors(&self, diagnostics: &Diagnostics, context: &str) {
        debug_assert!(
            self.has_new_errors(diagnostics),
            "No error diagnostics generated when {}",
            context
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_and_counts() {
        let mut diags = Diagnostics::new();
        diags.warning(SourceSpan::invalid(), "first");
        diags.error(SourceSpan::invalid(), "second");
        diags.info(SourceSpan::invalid(), "third");

        let messages: Vec<_> = diags.iter().map(|d| d.message()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.count(Severity::Warning), 1);
    }

    #[test]
    fn test_error_guard_tracks_new_errors() {
        let mut diags = Diagnostics::new();
        diags.error(SourceSpan::invalid(), "old");
        let guard = ErrorGuard::new(&diags);
        assert!(!guard.has_new_errors(&diags));
        diags.error(SourceSpan::invalid(), "new");
        assert!(guard.has_new_errors(&diags));
    }
}
