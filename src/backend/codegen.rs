//! Code Generation trait - Backend abstraction
//!
//! Every consumer of a lowered module implements this trait. The textual
//! IR printer is the one in-tree implementation.

use crate::middle::ir::IRModule;
use crate::utils::Result;

/// Code generation backend trait
pub trait CodeGen {
    /// Generate output bytes from an IR module
    fn generate(&mut self, module: &IRModule) -> Result<Vec<u8>>;

    /// Get the target triple (e.g., "x86_64-pc-windows-msvc")
    fn target_triple(&self) -> &str;

    /// Get the backend name
    fn name(&self) -> &str;
}
