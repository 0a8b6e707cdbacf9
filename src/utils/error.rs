//! Error handling for layec
//!
//! Semantic problems in user code are reported as [`Diagnostic`]s; this enum
//! covers the failures of the compiler itself and of its inputs.
//!
//! [`Diagnostic`]: crate::utils::Diagnostic

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug)]
pub enum Error {
    #[error("Source span may only be constructed from two locations in the same source ({start} vs {end})")]
    SpanAcrossSources { start: String, end: String },

    #[error("Semantic checking failed with {errors} error(s)")]
    CheckFailed { errors: usize },

    #[error("Lowering failed with {errors} error(s)")]
    LoweringFailed { errors: usize },

    #[error("Malformed syntax tree: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Code generation error: {0}")]
    CodeGen(String),
}
