//! Type resolution and top-level type population (Phase 2)

use log::trace;

use crate::frontend::ast::{EnumDecl, FunctionDecl, FunctionModifier, Ident, StructDecl, SyntaxRoot, TopLevel, TypeExpr};
use crate::frontend::scope::ScopeStack;
use crate::frontend::symbols::{DeclaredSymbol, SymbolArena, SymbolId, SymbolKind, TypedSymbol};
use crate::types::{BuiltinLookup, FunctionType, SymbolType, VarArgsKind};
use crate::utils::Diagnostics;

use super::{top_levels, Checker};

/// Turns type syntax into [`SymbolType`]s. Implementors decide how a
/// declared (non built-in) type name is found.
pub(super) trait TypeResolver {
    fn diagnostics(&mut self) -> &mut Diagnostics;

    fn resolve_named(&mut self, name: &Ident) -> Option<SymbolType>;

    /// Whether `name` refers to a declared struct
    fn names_struct(&mut self, name: &Ident) -> bool;

    fn resolve_type(&mut self, ty: &TypeExpr) -> Option<SymbolType> {
        match ty {
            TypeExpr::Builtin { keyword, span } => match SymbolType::from_builtin(keyword) {
                BuiltinLookup::Type(ty) => Some(ty),
                BuiltinLookup::UnsupportedWidth { keyword, bits } => {
                    let widths = if keyword.starts_with('f') { "32 or 64" } else { "8, 16, 32 or 64" };
                    self.diagnostics().error(
                        span.clone(),
                        format!("`{}` has an unsupported bit width of {}; supported widths are {}", keyword, bits, widths),
                    );
                    None
                }
                BuiltinLookup::NotBuiltin => {
                    self.diagnostics().error(span.clone(), format!("unknown built-in type `{}`", keyword));
                    None
                }
            },
            TypeExpr::Named(name) => self.resolve_named(name),
            TypeExpr::Pointer { element, access, .. } => {
                let element = self.resolve_indirect(element)?;
                Some(SymbolType::pointer(element, *access))
            }
            TypeExpr::Buffer { element, access, .. } => {
                let resolved = self.resolve_indirect(element)?;
                let element = self.non_void_element(element, resolved)?;
                Some(SymbolType::buffer(element, *access))
            }
            TypeExpr::Slice { element, access, .. } => {
                let resolved = self.resolve_indirect(element)?;
                let element = self.non_void_element(element, resolved)?;
                Some(SymbolType::slice(element, *access))
            }
            TypeExpr::Array { element, capacity, access, span } => {
                let resolved = self.resolve_type(element)?;
                let element = self.non_void_element(element, resolved)?;
                if *capacity == 0 {
                    self.diagnostics().error(span.clone(), "array capacity must be greater than zero");
                    return None;
                }
                Some(SymbolType::Array { element: Box::new(element), capacity: *capacity, access: *access })
            }
        }
    }

    /// A struct behind a pointer, buffer or slice is referenced by name
    /// without resolving its fields, so it may contain itself that way.
    fn resolve_indirect(&mut self, element: &TypeExpr) -> Option<SymbolType> {
        match element {
            TypeExpr::Named(name) if self.names_struct(name) => Some(SymbolType::StructRef(name.name.clone())),
            _ => self.resolve_type(element),
        }
    }

    fn non_void_element(&mut self, element: &TypeExpr, ty: SymbolType) -> Option<SymbolType> {
        if ty.is_void() {
            self.diagnostics().error(element.span().clone(), "`void` is not a valid element type");
            return None;
        }
        Some(ty)
    }
}

/// Phase 2: resolves the type of every declared top-level symbol.
///
/// Struct types embed their field types, so a struct reached again while
/// it is still being resolved is a cycle and gets rejected. Cycles through
/// a pointer, buffer or slice never get here (see `resolve_indirect`).
pub(super) struct TypePopulator<'a> {
    decls: Vec<&'a TopLevel>,
    scopes: &'a ScopeStack,
    diagnostics: &'a mut Diagnostics,
    resolved: Vec<Option<SymbolType>>,
    in_progress: Vec<bool>,
}

impl<'a> TypePopulator<'a> {
    pub(super) fn new(roots: &'a [SyntaxRoot], scopes: &'a ScopeStack, diagnostics: &'a mut Diagnostics) -> Self {
        let decls: Vec<&TopLevel> = top_levels(roots).map(|(_, decl)| decl).collect();
        let count = decls.len();
        Self {
            decls,
            scopes,
            diagnostics,
            resolved: vec![None; count],
            in_progress: vec![false; count],
        }
    }

    pub(super) fn populate(mut self, declared: Vec<DeclaredSymbol>) -> Option<SymbolArena> {
        for index in 0..self.decls.len() {
            self.resolve_symbol(SymbolId(index))?;
        }

        let mut arena = SymbolArena::new();
        for (declared, ty) in declared.into_iter().zip(self.resolved) {
            arena.push(TypedSymbol::from_declared(declared, ty?));
        }
        Some(arena)
    }

    fn resolve_symbol(&mut self, id: SymbolId) -> Option<SymbolType> {
        if let Some(ty) = &self.resolved[id.0] {
            return Some(ty.clone());
        }

        let decl = self.decls[id.0];
        if self.in_progress[id.0] {
            let name = decl.name();
            self.diagnostics
                .error(name.span.clone(), format!("recursive type `{}` is not supported", name.name));
            return None;
        }

        self.in_progress[id.0] = true;
        let ty = match decl {
            TopLevel::Struct(s) => self.resolve_struct(s),
            TopLevel::Enum(e) => self.resolve_enum(e),
            TopLevel::Function(f) => self.resolve_function(f),
        };
        self.in_progress[id.0] = false;

        let ty = ty?;
        trace!("`{}`: {}", decl.name().name, ty);
        self.resolved[id.0] = Some(ty.clone());
        Some(ty)
    }

    fn resolve_struct(&mut self, decl: &StructDecl) -> Option<SymbolType> {
        let mut fields: Vec<(String, SymbolType)> = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            if fields.iter().any(|(name, _)| *name == field.name.name) {
                self.diagnostics.error(
                    field.name.span.clone(),
                    format!("field `{}` is already defined in struct `{}`", field.name.name, decl.name.name),
                );
                return None;
            }

            let ty = self.resolve_type(&field.ty)?;
            if ty.is_void() {
                self.diagnostics.error(
                    field.ty.span().clone(),
                    format!("field `{}` cannot have type void", field.name.name),
                );
                return None;
            }
            fields.push((field.name.name.clone(), ty));
        }

        Some(SymbolType::Struct {
            name: decl.name.name.clone(),
            type_params: Vec::new(),
            fields,
        })
    }

    fn resolve_enum(&mut self, decl: &EnumDecl) -> Option<SymbolType> {
        let mut variants: Vec<(String, u64)> = Vec::with_capacity(decl.variants.len());
        let mut next = Some(0u64);
        for variant in &decl.variants {
            if variants.iter().any(|(name, _)| *name == variant.name.name) {
                self.diagnostics.error(
                    variant.name.span.clone(),
                    format!("variant `{}` is already defined in enum `{}`", variant.name.name, decl.name.name),
                );
                return None;
            }

            let Some(value) = variant.value.or(next) else {
                self.diagnostics.error(
                    variant.name.span.clone(),
                    format!("value of variant `{}` overflows", variant.name.name),
                );
                return None;
            };
            next = value.checked_add(1);
            variants.push((variant.name.name.clone(), value));
        }

        Some(SymbolType::Enum {
            name: decl.name.name.clone(),
            variants,
        })
    }

    fn resolve_function(&mut self, decl: &FunctionDecl) -> Option<SymbolType> {
        let mut calling_convention = None;
        for modifier in &decl.modifiers {
            if let FunctionModifier::CallingConvention { convention, span } = modifier {
                if calling_convention.is_some() {
                    self.diagnostics.error(
                        span.clone(),
                        "only one calling convention modifier allowed per function declaration",
                    );
                    return None;
                }
                calling_convention = Some(*convention);
            }
        }

        if decl.var_args == VarArgsKind::Laye {
            self.diagnostics
                .error(decl.name.span.clone(), "laye-style varargs are not supported yet");
            return None;
        }

        let return_type = self.resolve_type(&decl.return_type)?;

        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = self.resolve_type(&param.ty)?;
            if ty.is_void() {
                self.diagnostics.error(
                    param.ty.span().clone(),
                    format!("parameter `{}` cannot have type void", param.name.name),
                );
                return None;
            }
            params.push((param.name.name.clone(), ty));
        }

        Some(SymbolType::Function(FunctionType {
            name: decl.name.name.clone(),
            type_params: Vec::new(),
            calling_convention: calling_convention.unwrap_or_default(),
            return_type: Box::new(return_type),
            params,
            var_args: decl.var_args,
        }))
    }
}

impl TypeResolver for TypePopulator<'_> {
    fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    fn names_struct(&mut self, name: &Ident) -> bool {
        let id = self.scopes.lookup_global(&name.name);
        id.is_some_and(|id| matches!(self.decls[id.0], TopLevel::Struct(_)))
    }

    fn resolve_named(&mut self, name: &Ident) -> Option<SymbolType> {
        let Some(id) = self.scopes.lookup_global(&name.name) else {
            self.diagnostics.error(name.span.clone(), format!("unknown type `{}`", name.name));
            return None;
        };

        match self.decls[id.0] {
            TopLevel::Struct(_) | TopLevel::Enum(_) => self.resolve_symbol(id),
            TopLevel::Function(_) => {
                self.diagnostics
                    .error(name.span.clone(), format!("`{}` is a function, not a type", name.name));
                None
            }
        }
    }
}

impl TypeResolver for Checker<'_> {
    fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    fn names_struct(&mut self, name: &Ident) -> bool {
        let id = self.scopes.lookup(&name.name);
        id.is_some_and(|id| self.symbols.get(id).kind == SymbolKind::Struct)
    }

    fn resolve_named(&mut self, name: &Ident) -> Option<SymbolType> {
        let Some(id) = self.scopes.lookup(&name.name) else {
            self.diagnostics.error(name.span.clone(), format!("unknown type `{}`", name.name));
            return None;
        };

        let symbol = self.symbols.get(id);
        if symbol.kind.is_type() {
            Some(symbol.ty.clone())
        } else {
            self.diagnostics
                .error(name.span.clone(), format!("`{}` is not a type", name.name));
            None
        }
    }
}
