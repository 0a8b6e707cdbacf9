//! Structured Feedback Module
//!
//! Machine-readable reports of a compilation:
//! - JSON diagnostic reports with source locations
//! - Compilation statistics

use serde::{Deserialize, Serialize};

use crate::utils::{Diagnostic, Diagnostics, Severity};

// ==================== Diagnostic Report ====================

/// One diagnostic, flattened for serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Location information; absent for the invalid span
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl DiagnosticReport {
    pub fn from_diagnostic(diagnostic: &Diagnostic) -> Self {
        let span = diagnostic.span();
        let location = (!span.is_invalid()).then(|| Location {
            file: span.source_name().to_string(),
            line: span.start.line,
            column: span.start.column,
            end_line: span.end.line,
            end_column: span.end.column,
        });

        Self {
            severity: diagnostic.severity(),
            message: diagnostic.message().to_string(),
            location,
        }
    }
}

// ==================== Compilation Feedback ====================

/// Complete feedback for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationFeedback {
    /// No Error diagnostic was reported
    pub success: bool,

    /// Source names, in input order
    pub sources: Vec<String>,

    /// All errors, warnings and notes in report order
    pub diagnostics: Vec<DiagnosticReport>,

    pub stats: CompilationStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationStats {
    /// Semantic checking time
    pub check_time_ms: u64,

    /// IR generation time
    pub lower_time_ms: u64,

    /// Number of functions with a body
    pub function_count: usize,

    /// Number of body-less function declarations
    pub extern_count: usize,

    /// Number of struct and enum declarations
    pub type_count: usize,

    pub error_count: usize,
    pub warning_count: usize,
}

impl CompilationFeedback {
    pub fn new(sources: Vec<String>, diagnostics: &Diagnostics, mut stats: CompilationStats) -> Self {
        stats.error_count = diagnostics.error_count();
        stats.warning_count = diagnostics.count(Severity::Warning);

        Self {
            success: !diagnostics.has_errors(),
            sources,
            diagnostics: diagnostics.iter().map(DiagnosticReport::from_diagnostic).collect(),
            stats,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Output as compact JSON (for programmatic use)
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// One line per diagnostic followed by a summary line
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = self
            .diagnostics
            .iter()
            .map(|report| match &report.location {
                Some(loc) => format!(
                    "{}:{}:{}: {}: {}",
                    loc.file, loc.line, loc.column, report.severity, report.message
                ),
                None => format!("{}: {}", report.severity, report.message),
            })
            .collect();

        lines.push(format!(
            "{} error(s), {} warning(s)",
            self.stats.error_count, self.stats.warning_count
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{SourceLocation, SourceSpan};
    use pretty_assertions::assert_eq;

    fn span_at(line: u32, column: u32) -> SourceSpan {
        let start = SourceLocation::new("main.ly", 10, line, column);
        let end = SourceLocation::new("main.ly", 14, line, column + 4);
        SourceSpan::new(start, end).unwrap()
    }

    #[test]
    fn test_report_carries_location() {
        let diagnostic = Diagnostic::new(Severity::Error, span_at(3, 7), "failed to find function `g`");
        let report = DiagnosticReport::from_diagnostic(&diagnostic);
        assert_eq!(
            report,
            DiagnosticReport {
                severity: Severity::Error,
                message: "failed to find function `g`".to_string(),
                location: Some(Location {
                    file: "main.ly".to_string(),
                    line: 3,
                    column: 7,
                    end_line: 3,
                    end_column: 11,
                }),
            }
        );
    }

    #[test]
    fn test_invalid_span_has_no_location() {
        let diagnostic = Diagnostic::new(Severity::Warning, SourceSpan::invalid(), "note");
        assert_eq!(DiagnosticReport::from_diagnostic(&diagnostic).location, None);
    }

    #[test]
    fn test_feedback_counts_and_renders() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning(span_at(1, 1), "unreachable code detected");
        diagnostics.error(SourceSpan::invalid(), "checking failed");

        let feedback = CompilationFeedback::new(vec!["main.ly".to_string()], &diagnostics, CompilationStats::default());
        assert!(!feedback.success);
        assert_eq!(feedback.stats.error_count, 1);
        assert_eq!(feedback.stats.warning_count, 1);
        assert_eq!(
            feedback.to_text(),
            "main.ly:1:1: warning: unreachable code detected\nerror: checking failed\n1 error(s), 1 warning(s)"
        );
    }

    #[test]
    fn test_json_round_trips() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(span_at(2, 5), "`x` is already defined in this scope");
        let feedback = CompilationFeedback::new(vec!["main.ly".to_string()], &diagnostics, CompilationStats::default());

        let parsed: CompilationFeedback = serde_json::from_str(&feedback.to_json_compact()).unwrap();
        assert_eq!(parsed.diagnostics, feedback.diagnostics);
        assert_eq!(parsed.stats, feedback.stats);
    }
}
