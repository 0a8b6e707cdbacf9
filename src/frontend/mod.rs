//! Frontend module - Syntax trees, Scopes, Semantic Checking

pub mod ast;
pub mod symbols;
pub mod scope;
pub mod typed_ast;
pub mod checker;
