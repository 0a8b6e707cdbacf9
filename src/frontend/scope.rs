//! Lexical scopes
//!
//! Scopes live in a vector indexed by [`ScopeId`]; each one links to its
//! parent by index. Index 0 is the global scope, which is never popped.

use std::collections::HashMap;

use crate::frontend::symbols::SymbolId;

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, SymbolId>,
    /// Function this scope belongs to, inherited from the parent when unset
    function: Option<SymbolId>,
}

/// Stack of nested scopes
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        let global = Scope {
            parent: None,
            symbols: HashMap::new(),
            function: None,
        };
        Self { scopes: vec![global] }
    }

    /// Enter a new scope; `function` marks a function's outermost scope
    pub fn push(&mut self, function: Option<SymbolId>) -> ScopeId {
        let parent = self.current();
        let function = function.or(self.scopes[parent.0].function);
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            symbols: HashMap::new(),
            function,
        });
        id
    }

    /// Exit the current scope
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Pop scopes until `depth` remain
    pub fn unwind_to(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current(&self) -> ScopeId {
        ScopeId(self.scopes.len() - 1)
    }

    pub fn is_global(&self) -> bool {
        self.current() == ScopeId::GLOBAL
    }

    /// Add a name to the current scope. Fails if the name is already
    /// declared in this very scope; shadowing an outer name is fine.
    pub fn add(&mut self, name: &str, symbol: SymbolId) -> bool {
        let id = self.current();
        let symbols = &mut self.scopes[id.0].symbols;
        if symbols.contains_key(name) {
            return false;
        }
        symbols.insert(name.to_string(), symbol);
        true
    }

    /// Look up a name, searching from the current scope upward
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        let mut scope_id = Some(self.current());
        while let Some(id) = scope_id {
            if let Some(symbol) = self.scopes[id.0].symbols.get(name) {
                return Some(*symbol);
            }
            scope_id = self.scopes[id.0].parent;
        }
        None
    }

    /// Look up a name in the global scope only
    pub fn lookup_global(&self, name: &str) -> Option<SymbolId> {
        self.scopes[ScopeId::GLOBAL.0].symbols.get(name).copied()
    }

    /// Look up a name only in the current scope
    pub fn lookup_local(&self, name: &str) -> Option<SymbolId> {
        self.scopes[self.current().0].symbols.get(name).copied()
    }

    /// The function whose body the current scope is part of
    pub fn enclosing_function(&self) -> Option<SymbolId> {
        self.scopes[self.current().0].function
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
