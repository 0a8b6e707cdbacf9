//! Laye IR definitions
//!
//! Three-address code over basic blocks. Locals live in stack slots
//! (`alloca`), so values flow through loads and stores rather than phis.

use std::fmt;

use crate::types::{CallingConvention, VarArgsKind};

/// IR Struct definition
#[derive(Debug, Clone, PartialEq)]
pub struct IRStruct {
    pub name: String,
    pub fields: Vec<(String, IRType)>,
}

/// IR Module - contains all functions
#[derive(Debug, Clone)]
pub struct IRModule {
    pub name: String,
    pub functions: Vec<IRFunction>,
    pub structs: Vec<IRStruct>,
    pub externs: Vec<IRExtern>,
}

/// External function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct IRExtern {
    pub name: String,
    pub library: Option<String>,
    pub params: Vec<(String, IRType)>,
    pub ret_type: IRType,
    pub calling_convention: CallingConvention,
    pub var_args: VarArgsKind,
}

impl IRModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: Vec::new(),
            structs: Vec::new(),
            externs: Vec::new(),
        }
    }

    pub fn add_struct(&mut self, name: &str, fields: Vec<(String, IRType)>) {
        self.structs.push(IRStruct {
            name: name.to_string(),
            fields,
        });
    }

    pub fn function(&self, name: &str) -> Option<&IRFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// IR Function
#[derive(Debug, Clone)]
pub struct IRFunction {
    pub name: String,
    pub params: Vec<(String, IRType)>,
    pub ret_type: IRType,
    pub calling_convention: CallingConvention,
    pub blocks: Vec<BasicBlock>,
    pub entry_block: BlockId,
}

impl IRFunction {
    pub fn new(name: &str, params: Vec<(String, IRType)>, ret_type: IRType, calling_convention: CallingConvention) -> Self {
        Self {
            name: name.to_string(),
            params,
            ret_type,
            calling_convention,
            blocks: Vec::new(),
            entry_block: BlockId(0),
        }
    }

    pub fn add_block(&mut self, label: &str) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            label: label.to_string(),
            instructions: Vec::new(),
            terminator: None,
        });
        id
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0)
    }

    pub fn get_block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.0)
    }
}

/// Basic block ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Basic block
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

/// Virtual register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(pub usize);

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// IR Value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Register(Register),
    Constant(Constant),
    Parameter(usize),
    Global(String),
    Unit,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Register(r) => write!(f, "{}", r),
            Value::Constant(c) => write!(f, "{}", c),
            Value::Parameter(i) => write!(f, "arg{}", i),
            Value::Global(name) => write!(f, "@{}", name),
            Value::Unit => write!(f, "()"),
        }
    }
}

/// Constant values
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Wide enough for every `u64` magnitude and its negation
    Int(i128),
    Float(f64),
    Bool(bool),
    String(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Float(v) => write!(f, "{:?}", v),
            Constant::Bool(v) => write!(f, "{}", v),
            Constant::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// IR Types
#[derive(Debug, Clone, PartialEq)]
pub enum IRType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Ptr(Box<IRType>),
    Array(Box<IRType>, u64),
    /// Pointer and length pair
    Slice(Box<IRType>),
    Struct(String),
    Function { params: Vec<IRType>, ret: Box<IRType> },
}

impl IRType {
    pub fn is_signed(&self) -> bool {
        matches!(self, IRType::I8 | IRType::I16 | IRType::I32 | IRType::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IRType::F32 | IRType::F64)
    }
}

impl fmt::Display for IRType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IRType::Void => write!(f, "void"),
            IRType::Bool => write!(f, "bool"),
            IRType::I8 => write!(f, "i8"),
            IRType::I16 => write!(f, "i16"),
            IRType::I32 => write!(f, "i32"),
            IRType::I64 => write!(f, "i64"),
            IRType::U8 => write!(f, "u8"),
            IRType::U16 => write!(f, "u16"),
            IRType::U32 => write!(f, "u32"),
            IRType::U64 => write!(f, "u64"),
            IRType::F32 => write!(f, "f32"),
            IRType::F64 => write!(f, "f64"),
            IRType::Ptr(inner) => write!(f, "*{}", inner),
            IRType::Array(elem, size) => write!(f, "[{}; {}]", elem, size),
            IRType::Slice(elem) => write!(f, "[{}]", elem),
            IRType::Struct(name) => write!(f, "%{}", name),
            IRType::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", ret)
            }
        }
    }
}

/// IR Instructions
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// dest = alloca ty
    Alloca { dest: Register, ty: IRType },

    /// dest = load ty, ptr
    Load { dest: Register, ptr: Value, ty: IRType },

    /// store value, ptr
    Store { ptr: Value, value: Value },

    /// dest = op left, right; `ty` is the operand type
    BinOp {
        dest: Register,
        op: BinOp,
        left: Value,
        right: Value,
        ty: IRType,
    },

    /// dest = op value
    UnaryOp { dest: Register, op: UnaryOp, value: Value },

    /// dest = call func(args)
    Call {
        dest: Option<Register>,
        func: String,
        args: Vec<Value>,
    },

    /// dest = cast value from -> to
    Cast {
        dest: Register,
        value: Value,
        from: IRType,
        to: IRType,
    },

    /// dest = materialize value; copies a view into an owned value
    Materialize { dest: Register, value: Value, ty: IRType },

    /// dest = data pointer of a slice value
    SliceData { dest: Register, value: Value },

    /// dest = address of element `index` past `ptr`
    GetElementPtr {
        dest: Register,
        ptr: Value,
        index: Value,
        elem_ty: IRType,
    },

    /// dest = address of field `field` of the struct at `ptr`
    FieldPtr {
        dest: Register,
        ptr: Value,
        struct_name: String,
        field: usize,
    },
}

/// Block terminators
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Return { value: Option<Value> },
    Jump { target: BlockId },
    Branch {
        cond: Value,
        then_target: BlockId,
        else_target: BlockId,
    },
    Unreachable,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::Eq => "eq",
            BinOp::Ne => "ne",
            BinOp::Lt => "lt",
            BinOp::Le => "le",
            BinOp::Gt => "gt",
            BinOp::Ge => "ge",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
        };
        write!(f, "{}", s)
    }
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
            UnaryOp::BitNot => "bitnot",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blocks_are_numbered_in_creation_order() {
        let mut func = IRFunction::new("f", Vec::new(), IRType::Void, CallingConvention::Laye);
        let entry = func.add_block("entry");
        let exit = func.add_block("exit");
        assert_eq!(entry, BlockId(0));
        assert_eq!(exit, BlockId(1));
        assert_eq!(func.get_block(exit).map(|b| b.label.as_str()), Some("exit"));
    }

    #[test]
    fn types_display_compactly() {
        let ty = IRType::Ptr(Box::new(IRType::Array(Box::new(IRType::U8), 4)));
        assert_eq!(ty.to_string(), "*[u8; 4]");
        let func = IRType::Function {
            params: vec![IRType::I32, IRType::Slice(Box::new(IRType::U8))],
            ret: Box::new(IRType::Void),
        };
        assert_eq!(func.to_string(), "fn(i32, [u8]) -> void");
    }

    #[test]
    fn negative_constants_keep_their_sign() {
        assert_eq!(Value::Constant(Constant::Int(-(u64::MAX as i128))).to_string(), "-18446744073709551615");
        assert_eq!(Value::Parameter(2).to_string(), "arg2");
    }
}
