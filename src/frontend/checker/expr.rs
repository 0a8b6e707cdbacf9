//! Expression checking

use crate::frontend::ast::{BinaryOp, Expr, Ident, UnaryOp};
use crate::frontend::symbols::SymbolKind;
use crate::frontend::typed_ast::{TypedExpr, TypedExprKind, TypedUnaryOp};
use crate::types::{AccessKind, SymbolType, VarArgsKind};
use crate::utils::SourceSpan;

use super::stmt::read_only_container;
use super::Checker;

impl Checker<'_> {
    pub(super) fn check_expr(&mut self, expr: &Expr) -> Option<TypedExpr> {
        match expr {
            Expr::Integer { value, signed, span } => Some(TypedExpr::new(
                span.clone(),
                SymbolType::UntypedInteger { signed: *signed },
                TypedExprKind::Integer { magnitude: *value, negative: false },
            )),
            Expr::Float { value, span } => Some(TypedExpr::new(
                span.clone(),
                SymbolType::UntypedFloat,
                TypedExprKind::Float(*value),
            )),
            Expr::Bool { value, span } => Some(TypedExpr::new(
                span.clone(),
                SymbolType::UntypedBool,
                TypedExprKind::Bool(*value),
            )),
            Expr::String { value, span } => Some(TypedExpr::new(
                span.clone(),
                SymbolType::UntypedString,
                TypedExprKind::String(value.clone()),
            )),
            Expr::Name(name) => self.check_name(name),
            Expr::Invoke { target, args, span } => self.check_invoke(target, args, span),
            Expr::Unary { op, operand, span } => self.check_unary(*op, operand, span),
            Expr::Binary { op, left, right, span } => self.check_binary(*op, left, right, span),
            Expr::Index { target, index, span } => self.check_index(target, index, span),
            Expr::Field { target, field, span } => self.check_field(target, field, span),
        }
    }

    fn check_name(&mut self, name: &Ident) -> Option<TypedExpr> {
        let Some(id) = self.scopes.lookup(&name.name) else {
            self.diagnostics.error(
                name.span.clone(),
                format!("the name `{}` does not exist in the current context", name.name),
            );
            return None;
        };

        let symbol = self.symbols.get(id);
        if symbol.kind.is_type() {
            self.diagnostics.error(
                name.span.clone(),
                format!("`{}` is a type and cannot be used as a value", name.name),
            );
            return None;
        }

        Some(TypedExpr::new(name.span.clone(), symbol.ty.clone(), TypedExprKind::LoadValue(id)))
    }

    fn check_invoke(&mut self, target: &Expr, args: &[Expr], span: &SourceSpan) -> Option<TypedExpr> {
        let args = args
            .iter()
            .map(|arg| self.check_expr(arg))
            .collect::<Option<Vec<_>>>()?;

        let Expr::Name(name) = target else {
            self.diagnostics.error(target.span().clone(), "can only invoke top level functions");
            return None;
        };

        // callees are always top-level; locals never shadow them here
        let callee = self
            .scopes
            .lookup_global(&name.name)
            .filter(|id| self.symbols.get(*id).kind == SymbolKind::Function);
        let Some((function, signature)) =
            callee.and_then(|id| self.symbols.get(id).function_type().cloned().map(|f| (id, f)))
        else {
            self.diagnostics.error(
                name.span.clone(),
                format!("failed to find function `{}`", name.name),
            );
            return None;
        };

        let expected = signature.params.len();
        if signature.var_args == VarArgsKind::C {
            if args.len() < expected {
                self.diagnostics.error(
                    span.clone(),
                    format!(
                        "expected at least {} arguments to C-style varargs function `{}`, got {}",
                        expected,
                        name.name,
                        args.len()
                    ),
                );
                return None;
            }
        } else if args.len() != expected {
            self.diagnostics.error(
                span.clone(),
                format!("expected {} arguments to function `{}`, got {}", expected, name.name, args.len()),
            );
            return None;
        }

        let mut typed_args = Vec::with_capacity(args.len());
        let mut params = signature.param_types();
        for arg in args {
            let typed = match params.next() {
                Some(param) => self.check_implicit_type_cast(arg, param)?,
                None => self.promote_variadic_argument(arg)?,
            };
            typed_args.push(typed);
        }

        Some(TypedExpr::new(
            span.clone(),
            (*signature.return_type).clone(),
            TypedExprKind::Invoke { function, args: typed_args },
        ))
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr, span: &SourceSpan) -> Option<TypedExpr> {
        let value = self.check_expr(operand)?;

        match op {
            UnaryOp::Neg => self.check_negation(value, span),
            UnaryOp::Not => {
                let value = self.check_implicit_type_cast(value, &SymbolType::Bool)?;
                Some(TypedExpr::new(
                    span.clone(),
                    SymbolType::Bool,
                    TypedExprKind::Unary { op: TypedUnaryOp::Not, operand: Box::new(value) },
                ))
            }
            UnaryOp::BitNot => {
                let value = self.default_untyped(value)?;
                if !value.ty.is_integer() {
                    self.diagnostics.error(
                        value.span.clone(),
                        format!("operator `~` requires an integer operand, found {}", value.ty),
                    );
                    return None;
                }
                Some(TypedExpr::new(
                    span.clone(),
                    value.ty.clone(),
                    TypedExprKind::Unary { op: TypedUnaryOp::BitNot, operand: Box::new(value) },
                ))
            }
            UnaryOp::AddressOf => {
                if !value.is_lvalue(|id| self.is_binding(id)) {
                    self.diagnostics.error(
                        value.span.clone(),
                        "cannot take the address of this expression; it is not an l-value",
                    );
                    return None;
                }
                // the pointer keeps the access of the container it points into
                let access = match read_only_container(&value) {
                    Some(
                        SymbolType::Pointer { access, .. }
                        | SymbolType::Buffer { access, .. }
                        | SymbolType::Slice { access, .. }
                        | SymbolType::Array { access, .. },
                    ) => *access,
                    Some(_) => AccessKind::ReadOnly,
                    None => AccessKind::ReadWrite,
                };
                let ty = SymbolType::pointer(value.ty.clone(), access);
                Some(TypedExpr::new(span.clone(), ty, TypedExprKind::AddressOf(Box::new(value))))
            }
            UnaryOp::Dereference => {
                let SymbolType::Pointer { element, .. } = &value.ty else {
                    self.diagnostics.error(
                        value.span.clone(),
                        format!("cannot dereference a value of type {}", value.ty),
                    );
                    return None;
                };
                let ty = self.expand_struct_ref((**element).clone());
                Some(TypedExpr::new(span.clone(), ty, TypedExprKind::Dereference(Box::new(value))))
            }
        }
    }

    /// Negating an untyped literal folds into the literal itself
    fn check_negation(&mut self, value: TypedExpr, span: &SourceSpan) -> Option<TypedExpr> {
        match (&value.kind, &value.ty) {
            (TypedExprKind::Integer { magnitude, negative }, SymbolType::UntypedInteger { .. }) => Some(TypedExpr::new(
                span.clone(),
                SymbolType::UntypedInteger { signed: true },
                TypedExprKind::Integer { magnitude: *magnitude, negative: !*negative },
            )),
            (TypedExprKind::Float(float), SymbolType::UntypedFloat) => Some(TypedExpr::new(
                span.clone(),
                SymbolType::UntypedFloat,
                TypedExprKind::Float(-*float),
            )),
            (_, SymbolType::Integer { signed: false } | SymbolType::SizedInteger { signed: false, .. }) => {
                self.diagnostics.error(
                    value.span.clone(),
                    format!("cannot negate a value of unsigned type {}", value.ty),
                );
                None
            }
            (_, SymbolType::Integer { .. } | SymbolType::SizedInteger { .. } | SymbolType::Float | SymbolType::SizedFloat { .. }) => {
                let ty = value.ty.clone();
                Some(TypedExpr::new(
                    span.clone(),
                    ty,
                    TypedExprKind::Unary { op: TypedUnaryOp::Neg, operand: Box::new(value) },
                ))
            }
            _ => {
                self.diagnostics
                    .error(value.span.clone(), format!("cannot negate a value of type {}", value.ty));
                None
            }
        }
    }

    fn check_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: &SourceSpan) -> Option<TypedExpr> {
        let left = self.check_expr(left)?;
        let right = self.check_expr(right)?;

        if op.is_logical() {
            let left = self.check_implicit_type_cast(left, &SymbolType::Bool)?;
            let right = self.check_implicit_type_cast(right, &SymbolType::Bool)?;
            return Some(binary(span, SymbolType::Bool, op, left, right));
        }

        if op.is_comparison() {
            let ordering = !matches!(op, BinaryOp::Eq | BinaryOp::Ne);

            let (left, right) = if left.ty.is_bool_like() || right.ty.is_bool_like() {
                let left = self.check_implicit_type_cast(left, &SymbolType::Bool)?;
                let right = self.check_implicit_type_cast(right, &SymbolType::Bool)?;
                (left, right)
            } else if left.ty == right.ty && !left.ty.is_integer() && !left.ty.is_float_like() && !left.ty.is_untyped() {
                (left, right)
            } else {
                self.check_implicit_numeric_upcast(left, right)?
            };

            let comparable = left.ty.is_integer()
                || left.ty.is_float_like()
                || matches!(left.ty, SymbolType::Rune)
                || !ordering && !matches!(left.ty, SymbolType::Struct { .. } | SymbolType::Array { .. });
            if !comparable {
                self.report_operator(op, &left.ty, span);
                return None;
            }
            return Some(binary(span, SymbolType::Bool, op, left, right));
        }

        let (left, right) = self.check_implicit_numeric_upcast(left, right)?;
        let ty = left.ty.clone();
        let valid = if op.is_bitwise() {
            ty.is_integer()
        } else {
            ty.is_integer() || ty.is_float_like()
        };
        if !valid {
            self.report_operator(op, &ty, span);
            return None;
        }
        Some(binary(span, ty, op, left, right))
    }

    fn report_operator(&mut self, op: BinaryOp, ty: &SymbolType, span: &SourceSpan) {
        self.diagnostics.error(
            span.clone(),
            format!("operator `{}` is not defined for type {}", op.symbol(), ty),
        );
    }

    fn check_index(&mut self, target: &Expr, index: &Expr, span: &SourceSpan) -> Option<TypedExpr> {
        let target = self.check_expr(target)?;
        let index = self.check_expr(index)?;

        let element = match &target.ty {
            SymbolType::Array { element, .. }
            | SymbolType::Buffer { element, .. }
            | SymbolType::Slice { element, .. } => self.expand_struct_ref((**element).clone()),
            SymbolType::String => SymbolType::U8,
            _ => {
                self.diagnostics
                    .error(target.span.clone(), format!("cannot index a value of type {}", target.ty));
                return None;
            }
        };

        let index = if index.ty.is_untyped() {
            self.check_implicit_type_cast(index, &SymbolType::UINT)?
        } else if index.ty.is_integer() {
            index
        } else {
            self.diagnostics
                .error(index.span.clone(), format!("index must be an integer, found {}", index.ty));
            return None;
        };

        Some(TypedExpr::new(
            span.clone(),
            element,
            TypedExprKind::Index { target: Box::new(target), index: Box::new(index) },
        ))
    }

    fn check_field(&mut self, target: &Expr, field: &Ident, span: &SourceSpan) -> Option<TypedExpr> {
        if let Some(variant) = self.check_enum_variant(target, field, span) {
            return variant;
        }

        let mut target = self.check_expr(target)?;

        // fields are reachable through one level of pointer
        if let SymbolType::Pointer { element, .. } = &target.ty {
            if matches!(**element, SymbolType::StructRef(_)) {
                let ty = self.expand_struct_ref((**element).clone());
                let target_span = target.span.clone();
                target = TypedExpr::new(target_span, ty, TypedExprKind::Dereference(Box::new(target)));
            }
        }

        let SymbolType::Struct { name, fields, .. } = &target.ty else {
            self.diagnostics
                .error(target.span.clone(), format!("type {} has no fields", target.ty));
            return None;
        };

        let Some(index) = fields.iter().position(|(n, _)| *n == field.name) else {
            self.diagnostics.error(
                field.span.clone(),
                format!("struct `{}` has no field named `{}`", name, field.name),
            );
            return None;
        };

        let ty = fields[index].1.clone();
        Some(TypedExpr::new(
            span.clone(),
            ty,
            TypedExprKind::Field { target: Box::new(target), field: field.name.clone(), index },
        ))
    }

    /// The declared struct a [`SymbolType::StructRef`] names
    fn expand_struct_ref(&self, ty: SymbolType) -> SymbolType {
        match ty {
            SymbolType::StructRef(name) => match self.scopes.lookup_global(&name) {
                Some(id) => self.symbols.get(id).ty.clone(),
                None => SymbolType::StructRef(name),
            },
            other => other,
        }
    }

    /// `E.A` where `E` names an enum. Returns `None` when `target` is not
    /// an enum name at all.
    fn check_enum_variant(&mut self, target: &Expr, field: &Ident, span: &SourceSpan) -> Option<Option<TypedExpr>> {
        let Expr::Name(name) = target else {
            return None;
        };
        let id = self.scopes.lookup(&name.name)?;
        let symbol = self.symbols.get(id);
        let SymbolType::Enum { variants, .. } = &symbol.ty else {
            return None;
        };

        match variants.iter().find(|(n, _)| *n == field.name) {
            Some((_, value)) => Some(Some(TypedExpr::new(
                span.clone(),
                symbol.ty.clone(),
                TypedExprKind::Integer { magnitude: *value, negative: false },
            ))),
            None => {
                self.diagnostics.error(
                    field.span.clone(),
                    format!("enum `{}` has no variant named `{}`", name.name, field.name),
                );
                Some(None)
            }
        }
    }
}

fn binary(span: &SourceSpan, ty: SymbolType, op: BinaryOp, left: TypedExpr, right: TypedExpr) -> TypedExpr {
    TypedExpr::new(
        span.clone(),
        ty,
        TypedExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
    )
}
