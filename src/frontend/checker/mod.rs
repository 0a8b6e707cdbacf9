//! Semantic checker for Laye
//!
//! Performs:
//! - Phase 1: declare every top-level symbol in the global scope
//! - Phase 2: resolve struct fields, enum variants and function signatures
//! - Phase 3: check function bodies and produce the typed tree
//!
//! Failures are reported through [`Diagnostics`]. Every check that fails
//! returns `None` after appending at least one Error.

mod conversion;
mod expr;
mod resolve;
mod stmt;


use log::{debug, info};

use crate::frontend::ast::{FunctionBody, FunctionDecl, FunctionModifier, SyntaxRoot, TopLevel};
use crate::frontend::scope::ScopeStack;
use crate::frontend::symbols::{DeclaredSymbol, SymbolArena, SymbolId, SymbolKind, TypedSymbol};
use crate::frontend::typed_ast::{TypedDecl, TypedFunction, TypedFunctionBody, TypedRoot};
use crate::utils::{Diagnostics, ErrorGuard};

use resolve::TypePopulator;

/// Checker configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckerOptions {
    /// Keep checking sibling functions after one fails. The unit still
    /// produces no typed output.
    pub keep_going: bool,
}

/// Result of checking a whole compilation unit
#[derive(Debug, Clone)]
pub struct CheckedProgram {
    pub roots: Vec<TypedRoot>,
    pub symbols: SymbolArena,
}

/// Phase 3 state
pub struct Checker<'d> {
    options: CheckerOptions,
    diagnostics: &'d mut Diagnostics,
    guard: ErrorGuard,
    symbols: SymbolArena,
    scopes: ScopeStack,
    loop_depth: usize,
}

/// Top-level declarations of every file, paired with their symbol ids.
/// Ids are handed out in this order by Phase 1.
fn top_levels(roots: &[SyntaxRoot]) -> impl Iterator<Item = (SymbolId, &TopLevel)> {
    roots
        .iter()
        .flat_map(|root| root.decls.iter())
        .enumerate()
        .map(|(i, decl)| (SymbolId(i), decl))
}

impl<'d> Checker<'d> {
    fn new(diagnostics: &'d mut Diagnostics, symbols: SymbolArena, scopes: ScopeStack, options: CheckerOptions) -> Self {
        let guard = ErrorGuard::new(diagnostics);
        Self {
            options,
            diagnostics,
            guard,
            symbols,
            scopes,
            loop_depth: 0,
        }
    }

    /// Check every file of a compilation unit
    pub fn check_syntax(
        roots: &[SyntaxRoot],
        diagnostics: &mut Diagnostics,
        options: CheckerOptions,
    ) -> Option<CheckedProgram> {
        let guard = ErrorGuard::new(diagnostics);
        info!("checking {} file(s)", roots.len());

        let mut scopes = ScopeStack::new();
        let Some(declared) = Self::declare_symbols(roots, &mut scopes, diagnostics) else {
            guard.assert_has_errors(diagnostics, "declaring top-level symbols");
            return None;
        };
        debug!("declared {} top-level symbol(s)", declared.len());

        let populator = TypePopulator::new(roots, &scopes, diagnostics);
        let Some(symbols) = populator.populate(declared) else {
            guard.assert_has_errors(diagnostics, "resolving top-level types");
            return None;
        };
        debug!("resolved top-level types");

        let mut checker = Checker::new(diagnostics, symbols, scopes, options);
        let roots = checker.check_bodies(roots)?;
        debug_assert!(
            !roots.iter().any(TypedRoot::contains_untyped),
            "untyped placeholder survived checking"
        );

        Some(CheckedProgram {
            roots,
            symbols: checker.symbols,
        })
    }

    /// Phase 1
    fn declare_symbols(
        roots: &[SyntaxRoot],
        scopes: &mut ScopeStack,
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<DeclaredSymbol>> {
        let mut declared = Vec::new();
        for (id, decl) in top_levels(roots) {
            let name = decl.name();
            let kind = match decl {
                TopLevel::Function(_) => SymbolKind::Function,
                TopLevel::Struct(_) => SymbolKind::Struct,
                TopLevel::Enum(_) => SymbolKind::Enum,
            };

            if !scopes.add(&name.name, id) {
                diagnostics.error(
                    name.span.clone(),
                    format!(
                        "`{}` is already defined in this scope (function overloading is not supported)",
                        name.name
                    ),
                );
                return None;
            }

            declared.push(DeclaredSymbol {
                name: name.name.clone(),
                kind,
                span: name.span.clone(),
            });
        }
        Some(declared)
    }

    /// Phase 3
    fn check_bodies(&mut self, roots: &[SyntaxRoot]) -> Option<Vec<TypedRoot>> {
        let mut next_id = 0;
        let mut typed_roots = Vec::with_capacity(roots.len());
        let mut failed = false;

        for root in roots {
            let mut decls = Vec::new();
            for decl in &root.decls {
                let id = SymbolId(next_id);
                next_id += 1;
                match decl {
                    TopLevel::Struct(s) => decls.push(TypedDecl::Struct { symbol: id, span: s.span.clone() }),
                    TopLevel::Enum(e) => decls.push(TypedDecl::Enum { symbol: id, span: e.span.clone() }),
                    TopLevel::Function(func) => match self.check_function(id, func) {
                        Some(typed) => decls.push(TypedDecl::Function(typed)),
                        None => {
                            self.guard.assert_has_errors(self.diagnostics, "checking a function");
                            if !self.options.keep_going {
                                return None;
                            }
                            failed = true;
                        }
                    },
                }
            }
            typed_roots.push(TypedRoot {
                source_name: root.source_name.clone(),
                decls,
            });
        }

        if failed {
            None
        } else {
            Some(typed_roots)
        }
    }

    fn check_function(&mut self, id: SymbolId, decl: &FunctionDecl) -> Option<TypedFunction> {
        debug!("checking function `{}`", decl.name.name);
        let depth = self.scopes.depth();
        let result = self.check_function_inner(id, decl);
        self.scopes.unwind_to(depth);
        self.loop_depth = 0;
        result
    }

    fn check_function_inner(&mut self, id: SymbolId, decl: &FunctionDecl) -> Option<TypedFunction> {
        let extern_library = self.check_extern_modifier(decl)?;

        let Some(function) = self.symbols.get(id).function_type().cloned() else {
            self.diagnostics.error(
                decl.name.span.clone(),
                format!("`{}` does not have a function type", decl.name.name),
            );
            return None;
        };

        self.scopes.push(Some(id));

        let mut params = Vec::with_capacity(decl.params.len());
        for (param, (_, ty)) in decl.params.iter().zip(&function.params) {
            let symbol = self
                .symbols
                .push(TypedSymbol::binding(&param.name.name, param.name.span.clone(), ty.clone()));
            if !self.scopes.add(&param.name.name, symbol) {
                self.diagnostics.error(
                    param.name.span.clone(),
                    format!("parameter `{}` is already defined", param.name.name),
                );
                return None;
            }
            params.push(symbol);
        }

        let body = match &decl.body {
            FunctionBody::Empty(_) => TypedFunctionBody::Empty,
            FunctionBody::Block(block) => TypedFunctionBody::Block(self.check_block(block)?),
            FunctionBody::Expression(expr) => {
                let value = self.check_expr(expr)?;
                TypedFunctionBody::Expression(self.check_implicit_type_cast(value, &function.return_type)?)
            }
        };

        Some(TypedFunction {
            symbol: id,
            name: decl.name.name.clone(),
            name_span: decl.name.span.clone(),
            params,
            extern_library,
            body,
            span: decl.span.clone(),
        })
    }

    fn check_extern_modifier(&mut self, decl: &FunctionDecl) -> Option<Option<String>> {
        let mut library: Option<String> = None;
        for modifier in &decl.modifiers {
            if let FunctionModifier::Extern { library: name, span } = modifier {
                if library.is_some() {
                    self.diagnostics.error(
                        span.clone(),
                        "only one extern modifier allowed per function declaration",
                    );
                    return None;
                }
                library = Some(name.clone());
            }
        }
        Some(library)
    }

    fn is_binding(&self, id: SymbolId) -> bool {
        self.symbols.get(id).kind == SymbolKind::Binding
    }
}
