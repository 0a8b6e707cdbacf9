//! Type System for Laye
//!
//! Every type is a plain value; two independently built types are the same
//! type when their shapes are equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Calling convention of a function declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallingConvention {
    Laye,
    LayeNoContext,
    CDecl,
    StdCall,
    FastCall,
}

impl Default for CallingConvention {
    fn default() -> Self {
        CallingConvention::LayeNoContext
    }
}

/// How a function accepts surplus arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarArgsKind {
    None,
    Laye,
    C,
}

impl Default for VarArgsKind {
    fn default() -> Self {
        VarArgsKind::None
    }
}

/// Access permitted through a container type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    ReadWrite,
    ReadOnly,
    WriteOnly,
    Constant,
}

impl Default for AccessKind {
    fn default() -> Self {
        AccessKind::ReadWrite
    }
}

impl AccessKind {
    fn prefix(&self) -> &'static str {
        match self {
            AccessKind::ReadWrite => "",
            AccessKind::ReadOnly => " readonly",
            AccessKind::WriteOnly => " writeonly",
            AccessKind::Constant => " const",
        }
    }
}

/// Placeholder record for a generic parameter (`vec2<T>`, `vec<uint N>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeParam {
    TypeName(String),
    Constant { ty: Box<SymbolType>, name: String },
}

/// Signature of a function
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub calling_convention: CallingConvention,
    pub return_type: Box<SymbolType>,
    pub params: Vec<(String, SymbolType)>,
    pub var_args: VarArgsKind,
}

impl FunctionType {
    pub fn param_types(&self) -> impl Iterator<Item = &SymbolType> {
        self.params.iter().map(|(_, ty)| ty)
    }
}

/// Resolved type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Void,
    Bool,
    Rune,
    /// Platform-width integer with 64-bit semantics
    Integer { signed: bool },
    SizedInteger { signed: bool, bits: u32 },
    Float,
    SizedFloat { bits: u32 },
    RawPtr,
    Array { element: Box<SymbolType>, capacity: u64, access: AccessKind },
    Pointer { element: Box<SymbolType>, access: AccessKind },
    /// Unsized pointer-like container
    Buffer { element: Box<SymbolType>, access: AccessKind },
    /// Length + data
    Slice { element: Box<SymbolType>, access: AccessKind },
    /// Owned length + data
    String,
    Function(FunctionType),
    Struct { name: String, type_params: Vec<TypeParam>, fields: Vec<(String, SymbolType)> },
    /// A struct named from behind a pointer, buffer or slice. The fields
    /// stay with the struct's symbol, which lets a struct point to itself.
    StructRef(String),
    Union { name: String, type_params: Vec<TypeParam>, variants: Vec<(String, SymbolType)> },
    Enum { name: String, variants: Vec<(String, u64)> },
    /// Reference to a type parameter
    Param(String),

    UntypedInteger { signed: bool },
    UntypedFloat,
    UntypedBool,
    UntypedString,
}

/// Outcome of looking a keyword up in the built-in type table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinLookup {
    Type(SymbolType),
    UnsupportedWidth { keyword: String, bits: u32 },
    NotBuiltin,
}

pub const INTEGER_WIDTHS: [u32; 4] = [8, 16, 32, 64];
pub const FLOAT_WIDTHS: [u32; 2] = [32, 64];

impl SymbolType {
    pub const INT: Self = Self::Integer { signed: true };
    pub const UINT: Self = Self::Integer { signed: false };
    pub const I8: Self = Self::SizedInteger { signed: true, bits: 8 };
    pub const I16: Self = Self::SizedInteger { signed: true, bits: 16 };
    pub const I32: Self = Self::SizedInteger { signed: true, bits: 32 };
    pub const I64: Self = Self::SizedInteger { signed: true, bits: 64 };
    pub const U8: Self = Self::SizedInteger { signed: false, bits: 8 };
    pub const U16: Self = Self::SizedInteger { signed: false, bits: 16 };
    pub const U32: Self = Self::SizedInteger { signed: false, bits: 32 };
    pub const U64: Self = Self::SizedInteger { signed: false, bits: 64 };
    pub const F32: Self = Self::SizedFloat { bits: 32 };
    pub const F64: Self = Self::SizedFloat { bits: 64 };

    pub fn pointer(element: SymbolType, access: AccessKind) -> Self {
        Self::Pointer { element: Self::indirect(element), access }
    }

    pub fn buffer(element: SymbolType, access: AccessKind) -> Self {
        Self::Buffer { element: Self::indirect(element), access }
    }

    pub fn slice(element: SymbolType, access: AccessKind) -> Self {
        Self::Slice { element: Self::indirect(element), access }
    }

    /// Structs behind indirection are always held as [`SymbolType::StructRef`]
    fn indirect(element: SymbolType) -> Box<SymbolType> {
        match element {
            Self::Struct { name, .. } => Box::new(Self::StructRef(name)),
            other => Box::new(other),
        }
    }

    /// `u8 readonly[*]`, the type of a C string
    pub fn c_string() -> Self {
        Self::buffer(Self::U8, AccessKind::ReadOnly)
    }

    /// Map a built-in type keyword to its type
    pub fn from_builtin(keyword: &str) -> BuiltinLookup {
        let ty = match keyword {
            "void" => Self::Void,
            "bool" => Self::Bool,
            "rune" => Self::Rune,
            "int" => Self::INT,
            "uint" => Self::UINT,
            "float" => Self::Float,
            "rawptr" => Self::RawPtr,
            "string" => Self::String,
            _ => return Self::sized_builtin(keyword),
        };
        BuiltinLookup::Type(ty)
    }

    fn sized_builtin(keyword: &str) -> BuiltinLookup {
        let mut chars = keyword.chars();
        let Some(prefix) = chars.next() else {
            return BuiltinLookup::NotBuiltin;
        };
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return BuiltinLookup::NotBuiltin;
        }
        let Ok(bits) = digits.parse::<u32>() else {
            return BuiltinLookup::UnsupportedWidth { keyword: keyword.to_string(), bits: u32::MAX };
        };

        let (ty, widths): (SymbolType, &[u32]) = match prefix {
            'i' => (Self::SizedInteger { signed: true, bits }, &INTEGER_WIDTHS),
            'u' => (Self::SizedInteger { signed: false, bits }, &INTEGER_WIDTHS),
            'f' => (Self::SizedFloat { bits }, &FLOAT_WIDTHS),
            _ => return BuiltinLookup::NotBuiltin,
        };

        if widths.contains(&bits) {
            BuiltinLookup::Type(ty)
        } else {
            BuiltinLookup::UnsupportedWidth { keyword: keyword.to_string(), bits }
        }
    }

    /// Literal placeholder that must be retyped by context
    pub fn is_untyped(&self) -> bool {
        matches!(
            self,
            Self::UntypedInteger { .. } | Self::UntypedFloat | Self::UntypedBool | Self::UntypedString
        )
    }

    /// `int`, `uint`, `iN` or `uN`
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer { .. } | Self::SizedInteger { .. })
    }

    pub fn is_float_like(&self) -> bool {
        matches!(self, Self::UntypedFloat | Self::Float | Self::SizedFloat { .. })
    }

    pub fn is_bool_like(&self) -> bool {
        matches!(self, Self::UntypedBool | Self::Bool)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Signedness and width of a concrete integer type
    pub fn integer_info(&self) -> Option<(bool, u32)> {
        match self {
            Self::Integer { signed } => Some((*signed, 64)),
            Self::SizedInteger { signed, bits } => Some((*signed, *bits)),
            _ => None,
        }
    }

    /// Whether an untyped placeholder occurs anywhere inside this type
    pub fn contains_untyped(&self) -> bool {
        match self {
            Self::UntypedInteger { .. } | Self::UntypedFloat | Self::UntypedBool | Self::UntypedString => true,
            Self::Array { element, .. }
            | Self::Pointer { element, .. }
            | Self::Buffer { element, .. }
            | Self::Slice { element, .. } => element.contains_untyped(),
            Self::Function(f) => f.return_type.contains_untyped() || f.param_types().any(Self::contains_untyped),
            Self::Struct { fields, .. } => fields.iter().any(|(_, ty)| ty.contains_untyped()),
            Self::Union { variants, .. } => variants.iter().any(|(_, ty)| ty.contains_untyped()),
            _ => false,
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Bool => write!(f, "bool"),
            Self::Rune => write!(f, "rune"),
            Self::Integer { signed: true } => write!(f, "int"),
            Self::Integer { signed: false } => write!(f, "uint"),
            Self::SizedInteger { signed, bits } => write!(f, "{}{}", if *signed { "i" } else { "u" }, bits),
            Self::Float => write!(f, "float"),
            Self::SizedFloat { bits } => write!(f, "f{}", bits),
            Self::RawPtr => write!(f, "rawptr"),
            Self::Array { element, capacity, access } => write!(f, "{}{}[{}]", element, access.prefix(), capacity),
            Self::Pointer { element, access } => write!(f, "{}{}*", element, access.prefix()),
            Self::Buffer { element, access } => write!(f, "{}{}[*]", element, access.prefix()),
            Self::Slice { element, access } => write!(f, "{}{}[]", element, access.prefix()),
            Self::String => write!(f, "string"),
            Self::Function(func) => write!(f, "function {}", func.name),
            Self::Struct { name, .. } | Self::Union { name, .. } | Self::Enum { name, .. } => write!(f, "{}", name),
            Self::StructRef(name) | Self::Param(name) => write!(f, "{}", name),
            Self::UntypedInteger { .. } => write!(f, "untyped int"),
            Self::UntypedFloat => write!(f, "untyped float"),
            Self::UntypedBool => write!(f, "untyped bool"),
            Self::UntypedString => write!(f, "untyped string"),
        }
    }
}
