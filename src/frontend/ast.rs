//! Untyped syntax tree for Laye
//!
//! Produced by the parser (an external collaborator) and consumed by the
//! checker. Every node carries the span it was parsed from. The tree derives
//! serde so a parser can hand it over as JSON.

use serde::{Deserialize, Serialize};

use crate::types::{AccessKind, CallingConvention, VarArgsKind};
use crate::utils::SourceSpan;

/// All top-level declarations of one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxRoot {
    pub source_name: String,
    pub decls: Vec<TopLevel>,
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopLevel {
    Function(FunctionDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl TopLevel {
    pub fn name(&self) -> &Ident {
        match self {
            TopLevel::Function(f) => &f.name,
            TopLevel::Struct(s) => &s.name,
            TopLevel::Enum(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: SourceSpan,
}

/// `T name` pair used by parameters and struct fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub ty: TypeExpr,
    pub name: Ident,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionModifier {
    Extern { library: String, span: SourceSpan },
    CallingConvention { convention: CallingConvention, span: SourceSpan },
}

impl FunctionModifier {
    pub fn span(&self) -> &SourceSpan {
        match self {
            FunctionModifier::Extern { span, .. } | FunctionModifier::CallingConvention { span, .. } => span,
        }
    }
}

/// Function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub modifiers: Vec<FunctionModifier>,
    pub return_type: TypeExpr,
    pub name: Ident,
    pub params: Vec<Param>,
    pub var_args: VarArgsKind,
    pub body: FunctionBody,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    /// `;` - a declaration only
    Empty(SourceSpan),
    Block(Block),
    /// `=> expr;`
    Expression(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Ident,
    pub fields: Vec<Param>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: Ident,
    pub variants: Vec<EnumVariant>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: Ident,
    pub value: Option<u64>,
}

/// Type syntax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// `int`, `i32`, `void`, `rawptr`, ...
    Builtin { keyword: String, span: SourceSpan },
    /// A declared struct or enum
    Named(Ident),
    /// `int*`, `vec3 readonly*`
    Pointer { element: Box<TypeExpr>, access: AccessKind, span: SourceSpan },
    /// `u8[*]`
    Buffer { element: Box<TypeExpr>, access: AccessKind, span: SourceSpan },
    /// `u8[]`
    Slice { element: Box<TypeExpr>, access: AccessKind, span: SourceSpan },
    /// `u8[8]`
    Array { element: Box<TypeExpr>, capacity: u64, access: AccessKind, span: SourceSpan },
}

impl TypeExpr {
    pub fn span(&self) -> &SourceSpan {
        match self {
            TypeExpr::Builtin { span, .. }
            | TypeExpr::Pointer { span, .. }
            | TypeExpr::Buffer { span, .. }
            | TypeExpr::Slice { span, .. }
            | TypeExpr::Array { span, .. } => span,
            TypeExpr::Named(ident) => &ident.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    AddressOf,
    Dereference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add, Sub, Mul, Div, Mod,
    BitAnd, BitOr, BitXor, Shl, Shr,
    Eq, Ne, Lt, Le, Gt, Ge,
    LogicalAnd, LogicalOr,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "~",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogicalAnd => "and",
            BinaryOp::LogicalOr => "or",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Integer { value: u64, signed: bool, span: SourceSpan },
    Float { value: f64, span: SourceSpan },
    Bool { value: bool, span: SourceSpan },
    String { value: String, span: SourceSpan },
    Name(Ident),
    Invoke { target: Box<Expr>, args: Vec<Expr>, span: SourceSpan },
    Unary { op: UnaryOp, operand: Box<Expr>, span: SourceSpan },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr>, span: SourceSpan },
    Index { target: Box<Expr>, index: Box<Expr>, span: SourceSpan },
    Field { target: Box<Expr>, field: Ident, span: SourceSpan },
}

impl Expr {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Expr::Integer { span, .. }
            | Expr::Float { span, .. }
            | Expr::Bool { span, .. }
            | Expr::String { span, .. }
            | Expr::Invoke { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Index { span, .. }
            | Expr::Field { span, .. } => span,
            Expr::Name(ident) => &ident.span,
        }
    }
}

/// `{ ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: SourceSpan,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Block(Block),
    /// `T name = value;` or `var name = value;`
    Binding { ty: Option<TypeExpr>, name: Ident, value: Option<Expr>, span: SourceSpan },
    Expression(Expr),
    Return { value: Option<Expr>, span: SourceSpan },
    Assign { target: Expr, value: Expr, span: SourceSpan },
    If { condition: Expr, then_body: Box<Stmt>, else_body: Option<Box<Stmt>>, span: SourceSpan },
    While { condition: Expr, body: Box<Stmt>, else_body: Option<Box<Stmt>>, span: SourceSpan },
    Break { span: SourceSpan },
    Continue { span: SourceSpan },
    Yield { value: Option<Expr>, span: SourceSpan },
}

impl Stmt {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Stmt::Block(block) => &block.span,
            Stmt::Expression(expr) => expr.span(),
            Stmt::Binding { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Yield { span, .. } => span,
        }
    }
}
