//! Typed syntax tree
//!
//! Output of the checker. Every expression carries its resolved type and
//! every name has been replaced by the [`SymbolId`] it refers to.

use crate::frontend::ast::BinaryOp;
use crate::frontend::symbols::SymbolId;
use crate::types::SymbolType;
use crate::utils::SourceSpan;

/// Typed declarations of one source file
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRoot {
    pub source_name: String,
    pub decls: Vec<TypedDecl>,
}

impl TypedRoot {
    /// Whether any untyped placeholder survived checking
    pub fn contains_untyped(&self) -> bool {
        self.decls.iter().any(|decl| match decl {
            TypedDecl::Function(func) => func.contains_untyped(),
            TypedDecl::Struct { .. } | TypedDecl::Enum { .. } => false,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &TypedFunction> {
        self.decls.iter().filter_map(|decl| match decl {
            TypedDecl::Function(func) => Some(func),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedDecl {
    Struct { symbol: SymbolId, span: SourceSpan },
    Enum { symbol: SymbolId, span: SourceSpan },
    Function(TypedFunction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedFunction {
    pub symbol: SymbolId,
    pub name: String,
    pub name_span: SourceSpan,
    /// Binding symbols of the parameters, in order
    pub params: Vec<SymbolId>,
    pub extern_library: Option<String>,
    pub body: TypedFunctionBody,
    pub span: SourceSpan,
}

impl TypedFunction {
    fn contains_untyped(&self) -> bool {
        match &self.body {
            TypedFunctionBody::Empty => false,
            TypedFunctionBody::Block(block) => block.contains_untyped(),
            TypedFunctionBody::Expression(expr) => expr.contains_untyped(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedFunctionBody {
    Empty,
    Block(TypedBlock),
    Expression(TypedExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedBlock {
    pub stmts: Vec<TypedStmt>,
    pub span: SourceSpan,
}

impl TypedBlock {
    fn contains_untyped(&self) -> bool {
        self.stmts.iter().any(TypedStmt::contains_untyped)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedStmt {
    Block(TypedBlock),
    Binding { symbol: SymbolId, value: Option<TypedExpr>, span: SourceSpan },
    Expression(TypedExpr),
    Return { value: Option<TypedExpr>, span: SourceSpan },
    Assign { target: TypedExpr, value: TypedExpr, span: SourceSpan },
    If { condition: TypedExpr, then_body: Box<TypedStmt>, else_body: Option<Box<TypedStmt>>, span: SourceSpan },
    While { condition: TypedExpr, body: Box<TypedStmt>, else_body: Option<Box<TypedStmt>>, span: SourceSpan },
    Break { span: SourceSpan },
    Continue { span: SourceSpan },
    Yield { value: Option<TypedExpr>, span: SourceSpan },
    /// Statements that can never run, still checked
    DeadCode { stmts: Vec<TypedStmt>, span: SourceSpan },
}

impl TypedStmt {
    pub fn span(&self) -> &SourceSpan {
        match self {
            TypedStmt::Block(block) => &block.span,
            TypedStmt::Expression(expr) => &expr.span,
            TypedStmt::Binding { span, .. }
            | TypedStmt::Return { span, .. }
            | TypedStmt::Assign { span, .. }
            | TypedStmt::If { span, .. }
            | TypedStmt::While { span, .. }
            | TypedStmt::Break { span }
            | TypedStmt::Continue { span }
            | TypedStmt::Yield { span, .. }
            | TypedStmt::DeadCode { span, .. } => span,
        }
    }

    /// Control can never flow past this statement
    pub fn always_exits(&self) -> bool {
        match self {
            TypedStmt::Return { .. }
            | TypedStmt::Break { .. }
            | TypedStmt::Continue { .. }
            | TypedStmt::Yield { .. } => true,
            TypedStmt::Block(block) => block.stmts.iter().any(TypedStmt::always_exits),
            TypedStmt::If { then_body, else_body: Some(else_body), .. } => {
                then_body.always_exits() && else_body.always_exits()
            }
            _ => false,
        }
    }

    fn contains_untyped(&self) -> bool {
        match self {
            TypedStmt::Block(block) => block.contains_untyped(),
            TypedStmt::Binding { value, .. } | TypedStmt::Return { value, .. } | TypedStmt::Yield { value, .. } => {
                value.as_ref().map_or(false, TypedExpr::contains_untyped)
            }
            TypedStmt::Expression(expr) => expr.contains_untyped(),
            TypedStmt::Assign { target, value, .. } => target.contains_untyped() || value.contains_untyped(),
            TypedStmt::If { condition, then_body, else_body, .. }
            | TypedStmt::While { condition, body: then_body, else_body, .. } => {
                condition.contains_untyped()
                    || then_body.contains_untyped()
                    || else_body.as_ref().map_or(false, |s| s.contains_untyped())
            }
            TypedStmt::Break { .. } | TypedStmt::Continue { .. } => false,
            TypedStmt::DeadCode { stmts, .. } => stmts.iter().any(TypedStmt::contains_untyped),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedUnaryOp {
    Neg,
    Not,
    BitNot,
}

/// Expression with its resolved type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub span: SourceSpan,
    pub ty: SymbolType,
    pub kind: TypedExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    /// Integer literal stored as sign and magnitude
    Integer { magnitude: u64, negative: bool },
    Float(f64),
    Bool(bool),
    String(String),
    LoadValue(SymbolId),
    /// Conversion of the inner value to this node's type
    TypeCast(Box<TypedExpr>),
    /// Conversion of a `u8[]` to an owned string
    Materialize(Box<TypedExpr>),
    Invoke { function: SymbolId, args: Vec<TypedExpr> },
    Unary { op: TypedUnaryOp, operand: Box<TypedExpr> },
    Binary { op: BinaryOp, left: Box<TypedExpr>, right: Box<TypedExpr> },
    AddressOf(Box<TypedExpr>),
    Dereference(Box<TypedExpr>),
    Index { target: Box<TypedExpr>, index: Box<TypedExpr> },
    Field { target: Box<TypedExpr>, field: String, index: usize },
}

impl TypedExpr {
    pub fn new(span: SourceSpan, ty: SymbolType, kind: TypedExprKind) -> Self {
        Self { span, ty, kind }
    }

    /// Wrap `self` in a cast to `ty`
    pub fn cast_to(self, ty: SymbolType) -> Self {
        let span = self.span.clone();
        Self::new(span, ty, TypedExprKind::TypeCast(Box::new(self)))
    }

    /// Whether this expression names a storage location
    pub fn is_lvalue(&self, binding: impl Fn(SymbolId) -> bool + Copy) -> bool {
        match &self.kind {
            TypedExprKind::LoadValue(id) => binding(*id),
            TypedExprKind::Dereference(_) => true,
            TypedExprKind::Index { target, .. } => match target.ty {
                SymbolType::Array { .. } => target.is_lvalue(binding),
                _ => true,
            },
            TypedExprKind::Field { target, .. } => target.is_lvalue(binding),
            _ => false,
        }
    }

    pub fn contains_untyped(&self) -> bool {
        if self.ty.is_untyped() {
            return true;
        }
        match &self.kind {
            TypedExprKind::Integer { .. }
            | TypedExprKind::Float(_)
            | TypedExprKind::Bool(_)
            | TypedExprKind::String(_)
            | TypedExprKind::LoadValue(_) => false,
            TypedExprKind::TypeCast(inner)
            | TypedExprKind::Materialize(inner)
            | TypedExprKind::AddressOf(inner)
            | TypedExprKind::Dereference(inner)
            | TypedExprKind::Unary { operand: inner, .. }
            | TypedExprKind::Field { target: inner, .. } => inner.contains_untyped(),
            TypedExprKind::Invoke { args, .. } => args.iter().any(TypedExpr::contains_untyped),
            TypedExprKind::Binary { left, right, .. } => left.contains_untyped() || right.contains_untyped(),
            TypedExprKind::Index { target, index } => target.contains_untyped() || index.contains_untyped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(ty: SymbolType) -> TypedExpr {
        TypedExpr::new(SourceSpan::invalid(), ty, TypedExprKind::Integer { magnitude: 1, negative: false })
    }

    #[test]
    fn test_contains_untyped_looks_through_casts() {
        let inner = literal(SymbolType::UntypedInteger { signed: true });
        let cast = inner.cast_to(SymbolType::I32);
        assert!(cast.contains_untyped());
        assert!(!literal(SymbolType::I32).cast_to(SymbolType::INT).contains_untyped());
    }

    #[test]
    fn test_if_else_exits_only_when_both_branches_exit() {
        let ret = TypedStmt::Return { value: None, span: SourceSpan::invalid() };
        let noop = TypedStmt::Expression(literal(SymbolType::I32));
        let cond = TypedExpr::new(SourceSpan::invalid(), SymbolType::Bool, TypedExprKind::Bool(true));

        let both = TypedStmt::If {
            condition: cond.clone(),
            then_body: Box::new(ret.clone()),
            else_body: Some(Box::new(ret.clone())),
            span: SourceSpan::invalid(),
        };
        let one = TypedStmt::If {
            condition: cond,
            then_body: Box::new(ret),
            else_body: Some(Box::new(noop)),
            span: SourceSpan::invalid(),
        };
        assert!(both.always_exits());
        assert!(!one.always_exits());
    }
}
