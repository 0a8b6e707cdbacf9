//! Statement checking

use crate::frontend::ast::{Block, Expr, Ident, Stmt, TypeExpr};
use crate::frontend::symbols::TypedSymbol;
use crate::frontend::typed_ast::{TypedBlock, TypedExpr, TypedExprKind, TypedStmt};
use crate::types::{AccessKind, SymbolType};
use crate::utils::SourceSpan;

use super::resolve::TypeResolver;
use super::Checker;

/// The container a store to `target` would write through, if it is read-only
pub(super) fn read_only_container(target: &TypedExpr) -> Option<&SymbolType> {
    let container = match &target.kind {
        TypedExprKind::Dereference(inner) | TypedExprKind::Index { target: inner, .. } => &inner.ty,
        TypedExprKind::Field { target: inner, .. } => return read_only_container(inner),
        _ => return None,
    };

    match container {
        SymbolType::String => Some(container),
        SymbolType::Pointer { access, .. }
        | SymbolType::Buffer { access, .. }
        | SymbolType::Slice { access, .. }
        | SymbolType::Array { access, .. }
            if matches!(access, AccessKind::ReadOnly | AccessKind::Constant) =>
        {
            Some(container)
        }
        _ => None,
    }
}

impl Checker<'_> {
    /// Check a block in a fresh scope. Statements after one that always
    /// exits are still checked, then collected into a single dead-code node.
    pub(super) fn check_block(&mut self, block: &Block) -> Option<TypedBlock> {
        self.scopes.push(None);

        let mut stmts = Vec::with_capacity(block.stmts.len());
        let mut remaining = block.stmts.iter();
        while let Some(stmt) = remaining.next() {
            let typed = self.check_stmt(stmt)?;
            let exits = typed.always_exits();
            stmts.push(typed);

            if exits {
                let dead: Vec<&Stmt> = remaining.by_ref().collect();
                if let (Some(first), Some(last)) = (dead.first(), dead.last()) {
                    let span = first.span().combine(last.span());
                    self.diagnostics.warning(span.clone(), "unreachable code detected");
                    let dead = dead
                        .into_iter()
                        .map(|stmt| self.check_stmt(stmt))
                        .collect::<Option<Vec<_>>>()?;
                    stmts.push(TypedStmt::DeadCode { stmts: dead, span });
                }
                break;
            }
        }

        self.scopes.pop();
        Some(TypedBlock {
            stmts,
            span: block.span.clone(),
        })
    }

    /// Check the body of an `if` or `while` in its own scope
    fn check_body(&mut self, body: &Stmt) -> Option<TypedStmt> {
        self.scopes.push(None);
        let typed = self.check_stmt(body);
        self.scopes.pop();
        typed
    }

    pub(super) fn check_stmt(&mut self, stmt: &Stmt) -> Option<TypedStmt> {
        match stmt {
            Stmt::Block(block) => Some(TypedStmt::Block(self.check_block(block)?)),
            Stmt::Binding { ty, name, value, span } => self.check_binding(ty.as_ref(), name, value.as_ref(), span),
            Stmt::Expression(expr) => {
                let value = self.check_expr(expr)?;
                Some(TypedStmt::Expression(self.default_untyped(value)?))
            }
            Stmt::Return { value, span } => self.check_return(value.as_ref(), span),
            Stmt::Assign { target, value, span } => self.check_assign(target, value, span),
            Stmt::If { condition, then_body, else_body, span } => {
                let condition = self.check_condition(condition)?;
                let then_body = self.check_body(then_body)?;
                let else_body = match else_body {
                    Some(body) => Some(Box::new(self.check_body(body)?)),
                    None => None,
                };
                Some(TypedStmt::If {
                    condition,
                    then_body: Box::new(then_body),
                    else_body,
                    span: span.clone(),
                })
            }
            Stmt::While { condition, body, else_body, span } => {
                let condition = self.check_condition(condition)?;
                self.loop_depth += 1;
                let body = self.check_body(body);
                self.loop_depth -= 1;
                let body = body?;
                let else_body = match else_body {
                    Some(body) => Some(Box::new(self.check_body(body)?)),
                    None => None,
                };
                Some(TypedStmt::While {
                    condition,
                    body: Box::new(body),
                    else_body,
                    span: span.clone(),
                })
            }
            Stmt::Break { span } => {
                self.check_in_loop("break", span)?;
                Some(TypedStmt::Break { span: span.clone() })
            }
            Stmt::Continue { span } => {
                self.check_in_loop("continue", span)?;
                Some(TypedStmt::Continue { span: span.clone() })
            }
            Stmt::Yield { value, span } => {
                let value = match value {
                    Some(value) => {
                        let value = self.check_expr(value)?;
                        Some(self.default_untyped(value)?)
                    }
                    None => None,
                };
                Some(TypedStmt::Yield { value, span: span.clone() })
            }
        }
    }

    fn check_condition(&mut self, condition: &Expr) -> Option<TypedExpr> {
        let condition = self.check_expr(condition)?;
        self.check_implicit_type_cast(condition, &SymbolType::Bool)
    }

    fn check_in_loop(&mut self, keyword: &str, span: &SourceSpan) -> Option<()> {
        if self.loop_depth == 0 {
            self.diagnostics
                .error(span.clone(), format!("`{}` is only allowed inside a loop", keyword));
            return None;
        }
        Some(())
    }

    fn check_binding(
        &mut self,
        ty: Option<&TypeExpr>,
        name: &Ident,
        value: Option<&Expr>,
        span: &SourceSpan,
    ) -> Option<TypedStmt> {
        let (ty, value) = match (ty, value) {
            (Some(ty), value) => {
                let ty = self.resolve_type(ty)?;
                let value = match value {
                    Some(value) => {
                        let value = self.check_expr(value)?;
                        Some(self.check_implicit_type_cast(value, &ty)?)
                    }
                    None => None,
                };
                (ty, value)
            }
            (None, Some(value)) => {
                let value = self.check_expr(value)?;
                let value = self.default_untyped(value)?;
                (value.ty.clone(), Some(value))
            }
            (None, None) => {
                self.diagnostics.error(
                    name.span.clone(),
                    "`var` binding requires an initialization expression to type check",
                );
                return None;
            }
        };

        if ty.is_void() {
            self.diagnostics
                .error(span.clone(), format!("cannot declare binding `{}` of type void", name.name));
            return None;
        }

        let symbol = self
            .symbols
            .push(TypedSymbol::binding(&name.name, name.span.clone(), ty));
        if !self.scopes.add(&name.name, symbol) {
            self.diagnostics
                .error(name.span.clone(), format!("`{}` is already defined in this scope", name.name));
            return None;
        }

        Some(TypedStmt::Binding {
            symbol,
            value,
            span: span.clone(),
        })
    }

    fn check_return(&mut self, value: Option<&Expr>, span: &SourceSpan) -> Option<TypedStmt> {
        let Some(function) = self
            .scopes
            .enclosing_function()
            .and_then(|id| self.symbols.get(id).function_type())
            .cloned()
        else {
            self.diagnostics.error(span.clone(), "`return` is only allowed inside a function");
            return None;
        };

        let return_type = &*function.return_type;
        let value = match (value, return_type.is_void()) {
            (Some(value), true) => {
                self.diagnostics.error(
                    value.span().clone(),
                    format!("cannot return a value from void function `{}`", function.name),
                );
                return None;
            }
            (None, false) => {
                self.diagnostics.error(
                    span.clone(),
                    format!("function `{}` must return a value of type {}", function.name, return_type),
                );
                return None;
            }
            (Some(value), false) => {
                let value = self.check_expr(value)?;
                Some(self.check_implicit_type_cast(value, return_type)?)
            }
            (None, true) => None,
        };

        Some(TypedStmt::Return {
            value,
            span: span.clone(),
        })
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr, span: &SourceSpan) -> Option<TypedStmt> {
        let target = self.check_expr(target)?;
        if !target.is_lvalue(|id| self.is_binding(id)) {
            self.diagnostics
                .error(target.span.clone(), "cannot assign to this expression; it is not an l-value");
            return None;
        }
        if let Some(container) = read_only_container(&target) {
            self.diagnostics.error(
                target.span.clone(),
                format!("cannot assign through read-only type {}", container),
            );
            return None;
        }

        let value = self.check_expr(value)?;
        let value = self.check_implicit_type_cast(value, &target.ty)?;
        Some(TypedStmt::Assign {
            target,
            value,
            span: span.clone(),
        })
    }
}
