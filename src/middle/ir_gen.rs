//! IR Generator - typed tree to Laye IR
//!
//! Converts checked functions into basic blocks of three-address code, then
//! verifies every block ends in a terminator. Lowering stops at the first
//! error.

use std::collections::HashMap;

use log::{debug, info};

use crate::frontend::ast::BinaryOp;
use crate::frontend::checker::CheckedProgram;
use crate::frontend::symbols::{SymbolArena, SymbolId, SymbolKind};
use crate::frontend::typed_ast::{
    TypedBlock, TypedDecl, TypedExpr, TypedExprKind, TypedFunction, TypedFunctionBody, TypedStmt,
    TypedUnaryOp,
};
use crate::middle::ir::{
    BinOp as IRBinOp, BlockId, Constant, IRExtern, IRFunction, IRModule, IRType, Instruction, Register,
    Terminator, UnaryOp, Value,
};
use crate::types::SymbolType;
use crate::utils::{Diagnostics, ErrorGuard, SourceSpan};

/// Jump targets of the innermost loop
#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    continue_target: BlockId,
    break_target: BlockId,
}

/// IR Generator
pub struct IRGenerator<'a> {
    symbols: &'a SymbolArena,
    diagnostics: &'a mut Diagnostics,
    guard: ErrorGuard,
    /// Current module being built
    module: IRModule,
    /// Current function being built
    current_fn: Option<IRFunction>,
    /// Current block ID
    current_block: BlockId,
    /// Register counter
    next_register: usize,
    /// Binding to stack slot mapping
    locals: HashMap<SymbolId, Register>,
    loops: Vec<LoopTargets>,
}

impl<'a> IRGenerator<'a> {
    pub fn new(module_name: &str, symbols: &'a SymbolArena, diagnostics: &'a mut Diagnostics) -> Self {
        let guard = ErrorGuard::new(diagnostics);
        Self {
            symbols,
            diagnostics,
            guard,
            module: IRModule::new(module_name),
            current_fn: None,
            current_block: BlockId(0),
            next_register: 0,
            locals: HashMap::new(),
            loops: Vec::new(),
        }
    }

    /// Lower a whole checked program into one module
    pub fn lower(module_name: &str, program: &CheckedProgram, diagnostics: &mut Diagnostics) -> Option<IRModule> {
        IRGenerator::new(module_name, &program.symbols, diagnostics).generate(program)
    }

    /// Generate IR for a program
    pub fn generate(mut self, program: &CheckedProgram) -> Option<IRModule> {
        info!("lowering {} source(s) into module `{}`", program.roots.len(), self.module.name);

        for decl in program.roots.iter().flat_map(|root| &root.decls) {
            if self.generate_decl(decl).is_none() {
                self.guard.assert_has_errors(self.diagnostics, "lowering failed");
                return None;
            }
        }

        info!(
            "lowered {} function(s) and {} extern(s)",
            self.module.functions.len(),
            self.module.externs.len()
        );
        Some(self.module)
    }

    /// Generate IR for a top-level declaration
    fn generate_decl(&mut self, decl: &TypedDecl) -> Option<()> {
        match decl {
            TypedDecl::Struct { symbol, .. } => {
                if let SymbolType::Struct { name, fields, .. } = &self.symbols.get(*symbol).ty {
                    let fields = fields
                        .iter()
                        .map(|(field, ty)| (field.clone(), ir_type(ty)))
                        .collect();
                    self.module.add_struct(name, fields);
                }
                Some(())
            }
            // Variants were folded into integer constants during checking
            TypedDecl::Enum { .. } => Some(()),
            TypedDecl::Function(func) => self.generate_function(func),
        }
    }

    /// Generate IR for a function
    fn generate_function(&mut self, func: &TypedFunction) -> Option<()> {
        let symbols = self.symbols;
        let Some(signature) = symbols.get(func.symbol).function_type() else {
            self.diagnostics
                .error(func.name_span.clone(), format!("`{}` is not a function", func.name));
            return None;
        };

        let params: Vec<(String, IRType)> = signature
            .params
            .iter()
            .map(|(name, ty)| (name.clone(), ir_type(ty)))
            .collect();
        let ret_type = ir_type(&signature.return_type);
        let returns_void = signature.return_type.is_void();

        if let TypedFunctionBody::Empty = func.body {
            debug!("declaring extern `{}`", func.name);
            self.module.externs.push(IRExtern {
                name: func.name.clone(),
                library: func.extern_library.clone(),
                params,
                ret_type,
                calling_convention: signature.calling_convention,
                var_args: signature.var_args,
            });
            return Some(());
        }

        debug!("lowering function `{}`", func.name);

        // Reset state
        let mut ir_func = IRFunction::new(&func.name, params, ret_type, signature.calling_convention);
        self.next_register = 0;
        self.locals.clear();
        self.loops.clear();
        self.current_block = ir_func.add_block("entry");
        ir_func.entry_block = self.current_block;
        self.current_fn = Some(ir_func);

        // Parameters get stack slots like any other binding
        for (i, param) in func.params.iter().enumerate() {
            let slot = self.alloc_slot(ir_type(&symbols.get(*param).ty));
            self.emit_current(Instruction::Store {
                ptr: Value::Register(slot),
                value: Value::Parameter(i),
            });
            self.locals.insert(*param, slot);
        }

        let lowered = match &func.body {
            TypedFunctionBody::Block(block) => self.generate_block(block),
            TypedFunctionBody::Expression(expr) => match self.generate_expr(expr) {
                Some(value) => {
                    let value = if returns_void { None } else { Some(value) };
                    self.set_terminator_current(Terminator::Return { value });
                    Some(())
                }
                None => None,
            },
            TypedFunctionBody::Empty => Some(()),
        };

        let ir_func = self.current_fn.take();
        lowered?;
        let mut ir_func = ir_func?;
        self.complete_function(&mut ir_func, returns_void, func)?;
        self.module.functions.push(ir_func);
        Some(())
    }

    /// Give every open block of a void function a `ret void`. In any other
    /// function an open block means some path falls off the end.
    fn complete_function(&mut self, ir_func: &mut IRFunction, returns_void: bool, func: &TypedFunction) -> Option<()> {
        for block in &mut ir_func.blocks {
            if block.terminator.is_some() {
                continue;
            }
            if !returns_void {
                debug!("block `{}` of `{}` has no terminator", block.label, func.name);
                self.diagnostics.error(
                    func.name_span.clone(),
                    format!("not all code paths return a value in function `{}`", func.name),
                );
                return None;
            }
            block.terminator = Some(Terminator::Return { value: None });
        }
        Some(())
    }

    /// Generate IR for a block. Lowering of the block stops once the
    /// current basic block is terminated.
    fn generate_block(&mut self, block: &TypedBlock) -> Option<()> {
        for stmt in &block.stmts {
            if self.is_terminated(self.current_block) {
                break;
            }
            self.generate_stmt(stmt)?;
        }
        Some(())
    }

    /// Generate IR for a statement
    fn generate_stmt(&mut self, stmt: &TypedStmt) -> Option<()> {
        match stmt {
            TypedStmt::Block(block) => self.generate_block(block),
            TypedStmt::Binding { symbol, value, .. } => {
                let slot = self.alloc_slot(ir_type(&self.symbols.get(*symbol).ty));
                if let Some(value) = value {
                    let value = self.generate_expr(value)?;
                    self.emit_current(Instruction::Store {
                        ptr: Value::Register(slot),
                        value,
                    });
                }
                self.locals.insert(*symbol, slot);
                Some(())
            }
            TypedStmt::Expression(expr) => self.generate_expr(expr).map(|_| ()),
            TypedStmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => Some(self.generate_expr(value)?),
                    None => None,
                };
                self.set_terminator_current(Terminator::Return { value });
                Some(())
            }
            TypedStmt::Assign { target, value, .. } => {
                let ptr = self.generate_address(target)?;
                let value = self.generate_expr(value)?;
                self.emit_current(Instruction::Store { ptr, value });
                Some(())
            }
            TypedStmt::If {
                condition,
                then_body,
                else_body,
                ..
            } => self.generate_if(condition, then_body, else_body.as_deref()),
            TypedStmt::While {
                else_body: Some(_),
                span,
                ..
            } => {
                self.diagnostics
                    .error(span.clone(), "`while` with an `else` body cannot be lowered");
                None
            }
            TypedStmt::While { condition, body, .. } => self.generate_while(condition, body),
            TypedStmt::Break { span } => self.generate_loop_jump(span, |targets| targets.break_target),
            TypedStmt::Continue { span } => self.generate_loop_jump(span, |targets| targets.continue_target),
            TypedStmt::Yield { span, .. } => {
                self.diagnostics.error(span.clone(), "`yield` cannot be lowered yet");
                None
            }
            // Never executed
            TypedStmt::DeadCode { .. } => Some(()),
        }
    }

    fn generate_if(&mut self, condition: &TypedExpr, then_body: &TypedStmt, else_body: Option<&TypedStmt>) -> Option<()> {
        let cond = self.generate_expr(condition)?;
        let then_block = self.add_block("if.then");

        let Some(else_body) = else_body else {
            let merge_block = self.add_block("if.end");
            self.set_terminator_current(Terminator::Branch {
                cond,
                then_target: then_block,
                else_target: merge_block,
            });
            self.current_block = then_block;
            self.generate_stmt(then_body)?;
            self.jump_if_open(merge_block);
            self.current_block = merge_block;
            return Some(());
        };

        let else_block = self.add_block("if.else");
        self.set_terminator_current(Terminator::Branch {
            cond,
            then_target: then_block,
            else_target: else_block,
        });

        self.current_block = then_block;
        self.generate_stmt(then_body)?;
        let then_exit = self.current_block;

        self.current_block = else_block;
        self.generate_stmt(else_body)?;
        let else_exit = self.current_block;

        // Only join when some branch falls through
        let open: Vec<BlockId> = [then_exit, else_exit]
            .into_iter()
            .filter(|block| !self.is_terminated(*block))
            .collect();
        if !open.is_empty() {
            let merge_block = self.add_block("if.end");
            for block in open {
                self.set_terminator(block, Terminator::Jump { target: merge_block });
            }
            self.current_block = merge_block;
        }
        Some(())
    }

    fn generate_while(&mut self, condition: &TypedExpr, body: &TypedStmt) -> Option<()> {
        let cond_block = self.add_block("while.cond");
        let body_block = self.add_block("while.body");
        let exit_block = self.add_block("while.end");

        self.jump_if_open(cond_block);
        self.current_block = cond_block;
        let cond = self.generate_expr(condition)?;
        self.set_terminator_current(Terminator::Branch {
            cond,
            then_target: body_block,
            else_target: exit_block,
        });

        self.loops.push(LoopTargets {
            continue_target: cond_block,
            break_target: exit_block,
        });
        self.current_block = body_block;
        let lowered = self.generate_stmt(body);
        self.loops.pop();
        lowered?;

        self.jump_if_open(cond_block);
        self.current_block = exit_block;
        Some(())
    }

    fn generate_loop_jump(&mut self, span: &SourceSpan, target: impl Fn(&LoopTargets) -> BlockId) -> Option<()> {
        let Some(target) = self.loops.last().map(target) else {
            self.diagnostics.error(span.clone(), "loop control used outside of a loop");
            return None;
        };
        self.set_terminator_current(Terminator::Jump { target });
        Some(())
    }

    /// Generate IR for an expression, returning the value it produces
    fn generate_expr(&mut self, expr: &TypedExpr) -> Option<Value> {
        match &expr.kind {
            TypedExprKind::Integer { magnitude, negative } => {
                let magnitude = *magnitude as i128;
                let value = if *negative { -magnitude } else { magnitude };
                Some(Value::Constant(Constant::Int(value)))
            }
            TypedExprKind::Float(value) => Some(Value::Constant(Constant::Float(*value))),
            TypedExprKind::Bool(value) => Some(Value::Constant(Constant::Bool(*value))),
            TypedExprKind::String(value) => Some(Value::Constant(Constant::String(value.clone()))),
            TypedExprKind::LoadValue(symbol) => self.generate_load_value(*symbol, expr),
            TypedExprKind::TypeCast(inner) => {
                let value = self.generate_expr(inner)?;
                let dest = self.alloc_register();
                self.emit_current(Instruction::Cast {
                    dest,
                    value,
                    from: ir_type(&inner.ty),
                    to: ir_type(&expr.ty),
                });
                Some(Value::Register(dest))
            }
            TypedExprKind::Materialize(inner) => {
                let value = self.generate_expr(inner)?;
                let dest = self.alloc_register();
                self.emit_current(Instruction::Materialize {
                    dest,
                    value,
                    ty: ir_type(&expr.ty),
                });
                Some(Value::Register(dest))
            }
            TypedExprKind::Invoke { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.generate_expr(arg))
                    .collect::<Option<Vec<_>>>()?;
                let func = self.symbols.get(*function).name.clone();
                if expr.ty.is_void() {
                    self.emit_current(Instruction::Call { dest: None, func, args });
                    return Some(Value::Unit);
                }
                let dest = self.alloc_register();
                self.emit_current(Instruction::Call {
                    dest: Some(dest),
                    func,
                    args,
                });
                Some(Value::Register(dest))
            }
            TypedExprKind::Unary { op, operand } => {
                let value = self.generate_expr(operand)?;
                let dest = self.alloc_register();
                let op = match op {
                    TypedUnaryOp::Neg => UnaryOp::Neg,
                    TypedUnaryOp::Not => UnaryOp::Not,
                    TypedUnaryOp::BitNot => UnaryOp::BitNot,
                };
                self.emit_current(Instruction::UnaryOp { dest, op, value });
                Some(Value::Register(dest))
            }
            TypedExprKind::Binary { op, left, right } => match op {
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr => self.generate_short_circuit(*op, left, right),
                _ => {
                    let lhs = self.generate_expr(left)?;
                    let rhs = self.generate_expr(right)?;
                    let dest = self.alloc_register();
                    self.emit_current(Instruction::BinOp {
                        dest,
                        op: convert_binop(*op),
                        left: lhs,
                        right: rhs,
                        ty: ir_type(&left.ty),
                    });
                    Some(Value::Register(dest))
                }
            },
            TypedExprKind::AddressOf(inner) => self.generate_address(inner),
            TypedExprKind::Dereference(inner) => {
                let ptr = self.generate_expr(inner)?;
                Some(self.emit_load(ptr, &expr.ty))
            }
            TypedExprKind::Index { .. } | TypedExprKind::Field { .. } => {
                let ptr = self.generate_address(expr)?;
                Some(self.emit_load(ptr, &expr.ty))
            }
        }
    }

    fn generate_load_value(&mut self, symbol: SymbolId, expr: &TypedExpr) -> Option<Value> {
        if let Some(slot) = self.locals.get(&symbol).copied() {
            return Some(self.emit_load(Value::Register(slot), &expr.ty));
        }

        let symbol = self.symbols.get(symbol);
        if symbol.kind == SymbolKind::Function {
            return Some(Value::Global(symbol.name.clone()));
        }
        self.diagnostics
            .error(expr.span.clone(), format!("`{}` has no storage to load from", symbol.name));
        None
    }

    /// `a and b` / `a or b`: the right operand only runs when it decides
    /// the result
    fn generate_short_circuit(&mut self, op: BinaryOp, left: &TypedExpr, right: &TypedExpr) -> Option<Value> {
        let slot = self.alloc_slot(IRType::Bool);
        let lhs = self.generate_expr(left)?;
        self.emit_current(Instruction::Store {
            ptr: Value::Register(slot),
            value: lhs.clone(),
        });

        let is_and = op == BinaryOp::LogicalAnd;
        let rhs_block = self.add_block(if is_and { "and.rhs" } else { "or.rhs" });
        let end_block = self.add_block(if is_and { "and.end" } else { "or.end" });
        let (then_target, else_target) = if is_and {
            (rhs_block, end_block)
        } else {
            (end_block, rhs_block)
        };
        self.set_terminator_current(Terminator::Branch {
            cond: lhs,
            then_target,
            else_target,
        });

        self.current_block = rhs_block;
        let rhs = self.generate_expr(right)?;
        self.emit_current(Instruction::Store {
            ptr: Value::Register(slot),
            value: rhs,
        });
        self.jump_if_open(end_block);

        self.current_block = end_block;
        Some(self.emit_load(Value::Register(slot), &SymbolType::Bool))
    }

    /// Generate the address of an l-value. Anything else is spilled to a
    /// fresh stack slot first.
    fn generate_address(&mut self, expr: &TypedExpr) -> Option<Value> {
        match &expr.kind {
            TypedExprKind::LoadValue(symbol) if self.locals.contains_key(symbol) => {
                self.locals.get(symbol).map(|slot| Value::Register(*slot))
            }
            TypedExprKind::Dereference(inner) => self.generate_expr(inner),
            TypedExprKind::Index { target, index } => {
                let base = match &target.ty {
                    SymbolType::Array { .. } => self.generate_address(target)?,
                    SymbolType::Pointer { .. } | SymbolType::Buffer { .. } | SymbolType::RawPtr => {
                        self.generate_expr(target)?
                    }
                    SymbolType::Slice { .. } | SymbolType::String => {
                        let value = self.generate_expr(target)?;
                        let dest = self.alloc_register();
                        self.emit_current(Instruction::SliceData { dest, value });
                        Value::Register(dest)
                    }
                    other => {
                        self.diagnostics
                            .error(target.span.clone(), format!("cannot index a value of type {}", other));
                        return None;
                    }
                };
                let index = self.generate_expr(index)?;
                let dest = self.alloc_register();
                self.emit_current(Instruction::GetElementPtr {
                    dest,
                    ptr: base,
                    index,
                    elem_ty: ir_type(&expr.ty),
                });
                Some(Value::Register(dest))
            }
            TypedExprKind::Field { target, index, .. } => {
                let SymbolType::Struct { name, .. } = &target.ty else {
                    self.diagnostics
                        .error(target.span.clone(), format!("type {} has no fields", target.ty));
                    return None;
                };
                let struct_name = name.clone();
                let base = self.generate_address(target)?;
                let dest = self.alloc_register();
                self.emit_current(Instruction::FieldPtr {
                    dest,
                    ptr: base,
                    struct_name,
                    field: *index,
                });
                Some(Value::Register(dest))
            }
            _ => {
                let value = self.generate_expr(expr)?;
                let slot = self.alloc_slot(ir_type(&expr.ty));
                self.emit_current(Instruction::Store {
                    ptr: Value::Register(slot),
                    value,
                });
                Some(Value::Register(slot))
            }
        }
    }

    // ==== Helpers ====

    fn alloc_register(&mut self) -> Register {
        let reg = Register(self.next_register);
        self.next_register += 1;
        reg
    }

    /// Reserve a stack slot in the entry block
    fn alloc_slot(&mut self, ty: IRType) -> Register {
        let dest = self.alloc_register();
        if let Some(ref mut func) = self.current_fn {
            let entry = func.entry_block;
            if let Some(block) = func.get_block_mut(entry) {
                block.instructions.push(Instruction::Alloca { dest, ty });
            }
        }
        dest
    }

    fn emit_load(&mut self, ptr: Value, ty: &SymbolType) -> Value {
        let dest = self.alloc_register();
        self.emit_current(Instruction::Load {
            dest,
            ptr,
            ty: ir_type(ty),
        });
        Value::Register(dest)
    }

    fn add_block(&mut self, label: &str) -> BlockId {
        if let Some(ref mut func) = self.current_fn {
            func.add_block(label)
        } else {
            BlockId(0)
        }
    }

    fn emit_current(&mut self, inst: Instruction) {
        if let Some(ref mut func) = self.current_fn {
            if let Some(block) = func.get_block_mut(self.current_block) {
                block.instructions.push(inst);
            }
        }
    }

    fn set_terminator(&mut self, block: BlockId, term: Terminator) {
        if let Some(ref mut func) = self.current_fn {
            if let Some(block) = func.get_block_mut(block) {
                block.terminator = Some(term);
            }
        }
    }

    fn set_terminator_current(&mut self, term: Terminator) {
        self.set_terminator(self.current_block, term);
    }

    fn is_terminated(&self, block: BlockId) -> bool {
        self.current_fn
            .as_ref()
            .and_then(|func| func.get_block(block))
            .map_or(false, |block| block.terminator.is_some())
    }

    /// Fall through from the current block into `target`
    fn jump_if_open(&mut self, target: BlockId) {
        if !self.is_terminated(self.current_block) {
            self.set_terminator_current(Terminator::Jump { target });
        }
    }
}

fn convert_binop(op: BinaryOp) -> IRBinOp {
    match op {
        BinaryOp::Add => IRBinOp::Add,
        BinaryOp::Sub => IRBinOp::Sub,
        BinaryOp::Mul => IRBinOp::Mul,
        BinaryOp::Div => IRBinOp::Div,
        BinaryOp::Mod => IRBinOp::Mod,
        BinaryOp::Eq => IRBinOp::Eq,
        BinaryOp::Ne => IRBinOp::Ne,
        BinaryOp::Lt => IRBinOp::Lt,
        BinaryOp::Le => IRBinOp::Le,
        BinaryOp::Gt => IRBinOp::Gt,
        BinaryOp::Ge => IRBinOp::Ge,
        BinaryOp::BitAnd | BinaryOp::LogicalAnd => IRBinOp::And,
        BinaryOp::BitOr | BinaryOp::LogicalOr => IRBinOp::Or,
        BinaryOp::BitXor => IRBinOp::Xor,
        BinaryOp::Shl => IRBinOp::Shl,
        BinaryOp::Shr => IRBinOp::Shr,
    }
}

/// Machine-level shape of a checked type
pub fn ir_type(ty: &SymbolType) -> IRType {
    match ty {
        SymbolType::Void | SymbolType::Param(_) => IRType::Void,
        SymbolType::Bool | SymbolType::UntypedBool => IRType::Bool,
        SymbolType::Rune => IRType::U32,
        SymbolType::Integer { signed } | SymbolType::UntypedInteger { signed } => {
            if *signed {
                IRType::I64
            } else {
                IRType::U64
            }
        }
        SymbolType::SizedInteger { signed, bits } => match (signed, bits) {
            (true, 8) => IRType::I8,
            (true, 16) => IRType::I16,
            (true, 32) => IRType::I32,
            (true, _) => IRType::I64,
            (false, 8) => IRType::U8,
            (false, 16) => IRType::U16,
            (false, 32) => IRType::U32,
            (false, _) => IRType::U64,
        },
        SymbolType::Float | SymbolType::UntypedFloat => IRType::F64,
        SymbolType::SizedFloat { bits: 32 } => IRType::F32,
        SymbolType::SizedFloat { .. } => IRType::F64,
        SymbolType::RawPtr => IRType::Ptr(Box::new(IRType::Void)),
        SymbolType::Array { element, capacity, .. } => IRType::Array(Box::new(ir_type(element)), *capacity),
        SymbolType::Pointer { element, .. } | SymbolType::Buffer { element, .. } => {
            IRType::Ptr(Box::new(ir_type(element)))
        }
        SymbolType::Slice { element, .. } => IRType::Slice(Box::new(ir_type(element))),
        SymbolType::String | SymbolType::UntypedString => IRType::Slice(Box::new(IRType::U8)),
        SymbolType::Function(function) => IRType::Ptr(Box::new(IRType::Function {
            params: function.param_types().map(ir_type).collect(),
            ret: Box::new(ir_type(&function.return_type)),
        })),
        SymbolType::Struct { name, .. } | SymbolType::Union { name, .. } | SymbolType::StructRef(name) => {
            IRType::Struct(name.clone())
        }
        SymbolType::Enum { .. } => IRType::U64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::build::*;
    use crate::frontend::ast::{BinaryOp, TopLevel};
    use crate::frontend::checker::{Checker, CheckerOptions};
    use crate::types::{AccessKind, VarArgsKind};
    use pretty_assertions::assert_eq;

    fn generate(decls: Vec<TopLevel>) -> (Option<IRModule>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let program = Checker::check_syntax(&[root(decls)], &mut diagnostics, CheckerOptions::default())
            .expect("program should check");
        let module = IRGenerator::lower("test", &program, &mut diagnostics);
        (module, diagnostics)
    }

    fn generate_ok(decls: Vec<TopLevel>) -> IRModule {
        let (module, diagnostics) = generate(decls);
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message()).collect();
        assert!(!diagnostics.has_errors(), "{:?}", messages);
        module.expect("program should lower")
    }

    fn lowering_error(decls: Vec<TopLevel>) -> String {
        let (module, diagnostics) = generate(decls);
        assert!(module.is_none());
        assert_eq!(diagnostics.error_count(), 1);
        diagnostics
            .iter()
            .find(|d| d.is_error())
            .map(|d| d.message().to_string())
            .unwrap()
    }

    fn terminators(func: &IRFunction) -> Vec<Option<Terminator>> {
        func.blocks.iter().map(|b| b.terminator.clone()).collect()
    }

    #[test]
    fn test_void_function_gets_return() {
        let module = generate_ok(vec![func(ty("void"), "main", vec![], vec![])]);
        let main = module.function("main").unwrap();
        assert_eq!(terminators(main), vec![Some(Terminator::Return { value: None })]);
    }

    #[test]
    fn test_missing_return_is_an_error() {
        let message = lowering_error(vec![func(ty("i32"), "f", vec![], vec![])]);
        assert_eq!(message, "not all code paths return a value in function `f`");
    }

    #[test]
    fn test_return_constant() {
        let module = generate_ok(vec![func(ty("i32"), "answer", vec![], vec![ret(Some(int(42)))])]);
        let answer = module.function("answer").unwrap();
        assert_eq!(
            terminators(answer),
            vec![Some(Terminator::Return {
                value: Some(Value::Constant(Constant::Int(42)))
            })]
        );
    }

    #[test]
    fn test_parameters_are_spilled_to_slots() {
        let module = generate_ok(vec![func(
            ty("i32"),
            "id",
            vec![param(ty("i32"), "x")],
            vec![ret(Some(name("x")))],
        )]);
        let id = module.function("id").unwrap();
        assert_eq!(
            id.blocks[0].instructions,
            vec![
                Instruction::Alloca { dest: Register(0), ty: IRType::I32 },
                Instruction::Store { ptr: Value::Register(Register(0)), value: Value::Parameter(0) },
                Instruction::Load { dest: Register(1), ptr: Value::Register(Register(0)), ty: IRType::I32 },
            ]
        );
    }

    #[test]
    fn test_if_without_fallthrough_has_no_merge_block() {
        let module = generate_ok(vec![func(
            ty("i32"),
            "pick",
            vec![param(ty("bool"), "c")],
            vec![if_(name("c"), ret(Some(int(1))), Some(ret(Some(int(0)))))],
        )]);
        let pick = module.function("pick").unwrap();
        let labels: Vec<&str> = pick.blocks.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["entry", "if.then", "if.else"]);
    }

    #[test]
    fn test_if_without_else_falls_through_to_merge() {
        let module = generate_ok(vec![func(
            ty("void"),
            "maybe",
            vec![param(ty("bool"), "c")],
            vec![if_(name("c"), expr(call("maybe", vec![boolean(false)])), None)],
        )]);
        let maybe = module.function("maybe").unwrap();
        assert_eq!(
            terminators(maybe)[1..].to_vec(),
            vec![
                Some(Terminator::Jump { target: BlockId(2) }),
                Some(Terminator::Return { value: None }),
            ]
        );
    }

    #[test]
    fn test_one_sided_return_is_incomplete() {
        let message = lowering_error(vec![func(
            ty("i32"),
            "half",
            vec![param(ty("bool"), "c")],
            vec![if_(name("c"), ret(Some(int(1))), None)],
        )]);
        assert!(message.starts_with("not all code paths return a value"));
    }

    #[test]
    fn test_while_loop_blocks() {
        let module = generate_ok(vec![func(
            ty("void"),
            "spin",
            vec![],
            vec![
                var(Some(ty("i32")), "i", Some(int(0))),
                while_(
                    binary(BinaryOp::Lt, name("i"), int(10)),
                    block(vec![assign(name("i"), binary(BinaryOp::Add, name("i"), int(1)))]),
                    None,
                ),
            ],
        )]);
        let spin = module.function("spin").unwrap();
        let labels: Vec<&str> = spin.blocks.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["entry", "while.cond", "while.body", "while.end"]);
        assert_eq!(spin.blocks[0].terminator, Some(Terminator::Jump { target: BlockId(1) }));
        assert_eq!(spin.blocks[2].terminator, Some(Terminator::Jump { target: BlockId(1) }));
        assert!(matches!(
            spin.blocks[1].terminator,
            Some(Terminator::Branch { then_target: BlockId(2), else_target: BlockId(3), .. })
        ));
    }

    #[test]
    fn test_break_and_continue_target_the_loop() {
        let module = generate_ok(vec![func(
            ty("void"),
            "loops",
            vec![param(ty("bool"), "c")],
            vec![while_(boolean(true), block(vec![if_(name("c"), brk(), Some(cont()))]), None)],
        )]);
        let loops = module.function("loops").unwrap();
        assert_eq!(loops.blocks[3].terminator, Some(Terminator::Return { value: None }));
        let then_block = loops.blocks.iter().find(|b| b.label == "if.then").unwrap();
        let else_block = loops.blocks.iter().find(|b| b.label == "if.else").unwrap();
        assert_eq!(then_block.terminator, Some(Terminator::Jump { target: BlockId(3) }));
        assert_eq!(else_block.terminator, Some(Terminator::Jump { target: BlockId(1) }));
    }

    #[test]
    fn test_while_else_is_rejected() {
        let message = lowering_error(vec![func(
            ty("void"),
            "f",
            vec![],
            vec![while_(boolean(false), block(vec![]), Some(block(vec![])))],
        )]);
        assert_eq!(message, "`while` with an `else` body cannot be lowered");
    }

    #[test]
    fn test_extern_declarations_become_externs() {
        let module = generate_ok(vec![c_extern(
            ty("i32"),
            "printf",
            vec![param(buffer(ty("u8"), AccessKind::ReadOnly), "format")],
            VarArgsKind::C,
        )]);
        assert!(module.functions.is_empty());
        assert_eq!(module.externs.len(), 1);
        let printf = &module.externs[0];
        assert_eq!(printf.name, "printf");
        assert_eq!(printf.var_args, VarArgsKind::C);
        assert_eq!(printf.params, vec![("format".to_string(), IRType::Ptr(Box::new(IRType::U8)))]);
    }

    #[test]
    fn test_void_call_has_no_destination() {
        let module = generate_ok(vec![
            func(ty("void"), "tick", vec![], vec![]),
            func(ty("void"), "main", vec![], vec![expr(call("tick", vec![]))]),
        ]);
        let main = module.function("main").unwrap();
        assert_eq!(
            main.blocks[0].instructions,
            vec![Instruction::Call { dest: None, func: "tick".to_string(), args: vec![] }]
        );
    }

    #[test]
    fn test_logical_and_short_circuits() {
        let module = generate_ok(vec![func(
            ty("bool"),
            "both",
            vec![param(ty("bool"), "a"), param(ty("bool"), "b")],
            vec![ret(Some(binary(BinaryOp::LogicalAnd, name("a"), name("b"))))],
        )]);
        let both = module.function("both").unwrap();
        let labels: Vec<&str> = both.blocks.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["entry", "and.rhs", "and.end"]);
        assert!(matches!(
            both.blocks[0].terminator,
            Some(Terminator::Branch { then_target: BlockId(1), else_target: BlockId(2), .. })
        ));
    }

    #[test]
    fn test_struct_field_store_uses_field_pointer() {
        let module = generate_ok(vec![
            strukt("pair", vec![param(ty("i32"), "first"), param(ty("i32"), "second")]),
            func(
                ty("void"),
                "set",
                vec![param(ptr(named_ty("pair"), AccessKind::ReadWrite), "p")],
                vec![assign(field(name("p"), "second"), int(7))],
            ),
        ]);
        assert_eq!(module.structs.len(), 1);
        assert_eq!(module.structs[0].fields[1], ("second".to_string(), IRType::I32));

        let set = module.function("set").unwrap();
        let field_ptr = set.blocks[0]
            .instructions
            .iter()
            .find(|inst| matches!(inst, Instruction::FieldPtr { .. }))
            .cloned();
        assert!(matches!(
            field_ptr,
            Some(Instruction::FieldPtr { field: 1, ref struct_name, .. }) if struct_name == "pair"
        ));
        assert!(matches!(
            set.blocks[0].instructions.last(),
            Some(Instruction::Store { value: Value::Constant(Constant::Int(7)), .. })
        ));
    }

    #[test]
    fn test_self_referential_struct_lowers() {
        let module = generate_ok(vec![
            strukt("node", vec![param(ty("i32"), "value"), param(ptr(named_ty("node"), AccessKind::ReadWrite), "next")]),
            func(
                ty("i32"),
                "second",
                vec![param(ptr(named_ty("node"), AccessKind::ReadWrite), "n")],
                vec![ret(Some(field(field(name("n"), "next"), "value")))],
            ),
        ]);
        assert_eq!(
            module.structs[0].fields[1],
            ("next".to_string(), IRType::Ptr(Box::new(IRType::Struct("node".to_string()))))
        );

        let second = module.function("second").unwrap();
        let field_ptrs: Vec<usize> = second.blocks[0]
            .instructions
            .iter()
            .filter_map(|inst| match inst {
                Instruction::FieldPtr { field, .. } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(field_ptrs, vec![1, 0]);
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(ir_type(&SymbolType::INT), IRType::I64);
        assert_eq!(ir_type(&SymbolType::U16), IRType::U16);
        assert_eq!(ir_type(&SymbolType::F32), IRType::F32);
        assert_eq!(ir_type(&SymbolType::String), IRType::Slice(Box::new(IRType::U8)));
        assert_eq!(
            ir_type(&SymbolType::c_string()),
            IRType::Ptr(Box::new(IRType::U8))
        );
    }
}
