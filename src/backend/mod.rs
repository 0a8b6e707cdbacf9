//! Backend module - Code generation seam

pub mod codegen;

pub use codegen::CodeGen;
