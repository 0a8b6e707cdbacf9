//! Implicit conversions
//!
//! Untyped literals adopt the type their context asks for. Literal to type
//! conversions are range checked; type to type casts are trusted.

use crate::frontend::typed_ast::{TypedExpr, TypedExprKind};
use crate::types::{AccessKind, SymbolType};
use crate::utils::SourceSpan;

use super::Checker;

fn retyped(value: TypedExpr, ty: SymbolType) -> TypedExpr {
    TypedExpr { ty, ..value }
}

fn materialized(value: TypedExpr, ty: SymbolType) -> TypedExpr {
    let span = value.span.clone();
    TypedExpr::new(span, ty, TypedExprKind::Materialize(Box::new(value)))
}

impl Checker<'_> {
    /// Convert `value` to `target`, or report why it cannot be.
    ///
    /// A value that already has the target type is returned untouched.
    pub(super) fn check_implicit_type_cast(&mut self, value: TypedExpr, target: &SymbolType) -> Option<TypedExpr> {
        use SymbolType::*;

        if value.ty == *target {
            return Some(value);
        }

        match (&value.ty, target) {
            (UntypedInteger { .. }, Integer { .. } | SizedInteger { .. }) => self.retype_integer_literal(value, target),
            (UntypedInteger { .. }, RawPtr) => {
                let value = self.retype_integer_literal(value, &SymbolType::UINT)?;
                Some(value.cast_to(RawPtr))
            }
            (UntypedInteger { .. }, Float | SizedFloat { .. }) => Some(self.integer_literal_to_float(value, target)),
            (UntypedFloat, Float | SizedFloat { .. })
            | (UntypedBool, Bool)
            | (UntypedString, String) => Some(retyped(value, target.clone())),
            (UntypedString, _) if *target == SymbolType::c_string() => Some(retyped(value, target.clone())),

            (RawPtr, Buffer { .. }) => Some(value.cast_to(target.clone())),
            (Pointer { element: from, access: AccessKind::ReadWrite }, Pointer { element: to, .. })
            | (Buffer { element: from, access: AccessKind::ReadWrite }, Buffer { element: to, .. })
            | (Slice { element: from, access: AccessKind::ReadWrite }, Slice { element: to, .. })
                if from == to =>
            {
                Some(value.cast_to(target.clone()))
            }
            (Buffer { access: AccessKind::ReadWrite, .. }, RawPtr) => Some(value.cast_to(RawPtr)),
            (Slice { element, .. }, String) if **element == SymbolType::U8 => Some(materialized(value, String)),

            _ => {
                self.diagnostics.error(
                    value.span.clone(),
                    format!("unable to convert from {} to {}", value.ty, target),
                );
                None
            }
        }
    }

    /// Bring the operands of a numeric operator to a common type.
    pub(super) fn check_implicit_numeric_upcast(
        &mut self,
        left: TypedExpr,
        right: TypedExpr,
    ) -> Option<(TypedExpr, TypedExpr)> {
        use SymbolType::*;

        if left.ty.is_float_like() || right.ty.is_float_like() {
            let left = self.drive_to_float(left)?;
            let right = self.drive_to_float(right)?;
            return Some((left, right));
        }

        match (&left.ty, &right.ty) {
            (UntypedInteger { signed: left_signed }, UntypedInteger { signed: right_signed }) => {
                let left_type = Integer { signed: *left_signed };
                let right_type = Integer { signed: *right_signed };
                let left = self.retype_integer_literal(left, &left_type)?;
                let right = self.retype_integer_literal(right, &right_type)?;
                Some((left, right))
            }
            (UntypedInteger { .. }, other) if other.is_integer() => {
                let target = other.clone();
                let left = self.retype_integer_literal(left, &target)?;
                Some((left, right))
            }
            (other, UntypedInteger { .. }) if other.is_integer() => {
                let target = other.clone();
                let right = self.retype_integer_literal(right, &target)?;
                Some((left, right))
            }
            _ if left.ty.is_untyped() || right.ty.is_untyped() => {
                self.diagnostics.error(
                    left.span.combine(&right.span),
                    format!("operands of type {} and {} cannot be made numeric", left.ty, right.ty),
                );
                None
            }
            _ => self.unify_concrete(left, right),
        }
    }

    /// Both operands already have concrete types
    fn unify_concrete(&mut self, left: TypedExpr, right: TypedExpr) -> Option<(TypedExpr, TypedExpr)> {
        use SymbolType::*;

        if left.ty == right.ty {
            return Some((left, right));
        }

        let (Some((_, left_bits)), Some((_, right_bits))) = (left.ty.integer_info(), right.ty.integer_info()) else {
            self.diagnostics.error(
                left.span.combine(&right.span),
                format!("unable to unify types {} and {}", left.ty, right.ty),
            );
            return None;
        };

        let left_dominates = match (&left.ty, &right.ty) {
            (Integer { .. }, Integer { .. }) => {
                self.diagnostics.error(
                    left.span.combine(&right.span),
                    format!("unable to unify {} and {}: the integer types differ in sign", left.ty, right.ty),
                );
                return None;
            }
            (Integer { .. }, _) => true,
            (_, Integer { .. }) => false,
            _ if left_bits != right_bits => left_bits > right_bits,
            _ => {
                self.diagnostics.error(
                    left.span.combine(&right.span),
                    format!(
                        "unable to unify {} and {}: integer types of equal width differ in sign",
                        left.ty, right.ty
                    ),
                );
                return None;
            }
        };

        if left_dominates {
            let ty = left.ty.clone();
            Some((left, right.cast_to(ty)))
        } else {
            let ty = right.ty.clone();
            Some((left.cast_to(ty), right))
        }
    }

    fn drive_to_float(&mut self, value: TypedExpr) -> Option<TypedExpr> {
        use SymbolType::*;

        match &value.ty {
            Float => Some(value),
            UntypedFloat => Some(retyped(value, Float)),
            UntypedInteger { .. } => Some(self.integer_literal_to_float(value, &Float)),
            Integer { .. } | SizedInteger { .. } | SizedFloat { .. } => Some(value.cast_to(Float)),
            _ => {
                self.diagnostics
                    .error(value.span.clone(), format!("{} cannot be made numeric", value.ty));
                None
            }
        }
    }

    /// Give an untyped value the type it gets when nothing else decides
    pub(super) fn default_untyped(&mut self, value: TypedExpr) -> Option<TypedExpr> {
        match value.ty {
            SymbolType::UntypedInteger { signed } => self.retype_integer_literal(value, &SymbolType::Integer { signed }),
            SymbolType::UntypedFloat => Some(retyped(value, SymbolType::Float)),
            SymbolType::UntypedBool => Some(retyped(value, SymbolType::Bool)),
            SymbolType::UntypedString => Some(retyped(value, SymbolType::String)),
            _ => Some(value),
        }
    }

    /// Promotion of an argument passed to a C-style variadic tail
    pub(super) fn promote_variadic_argument(&mut self, value: TypedExpr) -> Option<TypedExpr> {
        match value.ty {
            SymbolType::UntypedString => Some(retyped(value, SymbolType::c_string())),
            SymbolType::SizedInteger { signed, bits } if bits < 32 => {
                Some(value.cast_to(SymbolType::SizedInteger { signed, bits: 32 }))
            }
            SymbolType::SizedFloat { bits } if bits < 64 => Some(value.cast_to(SymbolType::F64)),
            SymbolType::Void => {
                self.diagnostics
                    .error(value.span.clone(), "cannot pass a void value as a variadic argument");
                None
            }
            _ => self.default_untyped(value),
        }
    }

    fn retype_integer_literal(&mut self, value: TypedExpr, target: &SymbolType) -> Option<TypedExpr> {
        let TypedExprKind::Integer { magnitude, negative } = value.kind else {
            self.diagnostics.error(
                value.span.clone(),
                format!("unable to convert from {} to {}", value.ty, target),
            );
            return None;
        };

        if !self.check_literal_range(magnitude, negative, target, &value.span) {
            return None;
        }
        Some(retyped(value, target.clone()))
    }

    fn integer_literal_to_float(&mut self, value: TypedExpr, target: &SymbolType) -> TypedExpr {
        match value.kind {
            TypedExprKind::Integer { magnitude, negative } => {
                let magnitude = magnitude as f64;
                let float = if negative { -magnitude } else { magnitude };
                TypedExpr::new(value.span, target.clone(), TypedExprKind::Float(float))
            }
            _ => value.cast_to(target.clone()),
        }
    }

    /// Check that a literal fits `target`, reporting the violated bound
    fn check_literal_range(&mut self, magnitude: u64, negative: bool, target: &SymbolType, span: &SourceSpan) -> bool {
        let Some((signed, bits)) = target.integer_info() else {
            return true;
        };

        if negative && magnitude != 0 && !signed {
            self.diagnostics.error(
                span.clone(),
                format!("negative value -{} cannot be converted to unsigned type {}", magnitude, target),
            );
            return false;
        }

        let limit = match (signed, negative) {
            (true, true) => 1u64 << (bits - 1),
            (true, false) => (1u64 << (bits - 1)) - 1,
            (false, _) if bits >= 64 => u64::MAX,
            (false, _) => (1u64 << bits) - 1,
        };

        if magnitude <= limit {
            return true;
        }

        let (sign, bound) = if negative {
            ("-", format!("at least -{}", limit))
        } else {
            ("", format!("at most {}", limit))
        };
        self.diagnostics.error(
            span.clone(),
            format!(
                "value {}{} is out of range for type {} (must be {})",
                sign, magnitude, target, bound
            ),
        );
        false
    }
}
