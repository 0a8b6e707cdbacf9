//! layec - semantic front end for the Laye systems programming language
//!
//! Takes untyped syntax trees, resolves names and types, checks every
//! function body, and lowers the result to a basic-block IR.

pub mod backend;
pub mod driver;
pub mod feedback;
pub mod frontend;
pub mod middle;
pub mod types;
pub mod utils;

pub use driver::{build, check, Compilation, CompilerOptions};
