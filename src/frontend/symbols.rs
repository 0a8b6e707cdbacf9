//! Symbols for Laye
//!
//! Top-level symbols are built in two steps. Collection produces
//! [`DeclaredSymbol`]s (name, kind, span) before any type is known; type
//! population then turns each one into a [`TypedSymbol`] stored in the
//! [`SymbolArena`]. A [`SymbolId`] is the symbol's index in both lists, so
//! identities taken during collection stay valid after population.

use std::fmt;

use crate::types::{FunctionType, SymbolType};
use crate::utils::SourceSpan;

/// Stable handle to a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A local variable or parameter
    Binding,
    Function,
    Struct,
    Enum,
}

impl SymbolKind {
    pub fn is_type(&self) -> bool {
        matches!(self, SymbolKind::Struct | SymbolKind::Enum)
    }
}

/// A symbol whose type has not been resolved yet
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: SourceSpan,
}

/// A fully typed symbol
#[derive(Debug, Clone, PartialEq)]
pub struct TypedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: SourceSpan,
    pub ty: SymbolType,
}

impl TypedSymbol {
    pub fn binding(name: impl Into<String>, span: SourceSpan, ty: SymbolType) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Binding,
            span,
            ty,
        }
    }

    pub fn from_declared(declared: DeclaredSymbol, ty: SymbolType) -> Self {
        Self {
            name: declared.name,
            kind: declared.kind,
            span: declared.span,
            ty,
        }
    }

    pub fn function_type(&self) -> Option<&FunctionType> {
        match &self.ty {
            SymbolType::Function(func) if self.kind == SymbolKind::Function => Some(func),
            _ => None,
        }
    }
}

/// Push-only storage for every typed symbol of a compilation
#[derive(Debug, Clone, Default)]
pub struct SymbolArena {
    symbols: Vec<TypedSymbol>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: TypedSymbol) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> &TypedSymbol {
        &self.symbols[id.0]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &TypedSymbol)> {
        self.symbols.iter().enumerate().map(|(i, s)| (SymbolId(i), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arena_ids_are_stable() {
        let mut arena = SymbolArena::new();
        let a = arena.push(TypedSymbol::binding("a", SourceSpan::invalid(), SymbolType::I32));
        let b = arena.push(TypedSymbol::binding("b", SourceSpan::invalid(), SymbolType::Bool));
        assert_eq!(a, SymbolId(0));
        assert_eq!(b, SymbolId(1));
        assert_eq!(arena.get(a).name, "a");
        assert_eq!(arena.get(b).ty, SymbolType::Bool);
    }

    #[test]
    fn test_from_declared_keeps_identity() {
        let declared = DeclaredSymbol {
            name: "vec3".to_string(),
            kind: SymbolKind::Struct,
            span: SourceSpan::invalid(),
        };
        let ty = SymbolType::Struct { name: "vec3".to_string(), type_params: Vec::new(), fields: Vec::new() };
        let typed = TypedSymbol::from_declared(declared, ty.clone());
        assert_eq!(typed.name, "vec3");
        assert_eq!(typed.kind, SymbolKind::Struct);
        assert_eq!(typed.ty, ty);
        assert!(typed.function_type().is_none());
    }
}
