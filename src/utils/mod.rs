//! Utility module

mod span;
mod error;
mod diagnostic;

pub use span::{SourceLocation, SourceSpan};
pub use error::{Error, Result};
pub use diagnostic::{Diagnostic, Diagnostics, ErrorGuard, Severity};
