//! IR Printer - Pretty print Laye IR
//!
//! Outputs human-readable IR for `--emit-ir` and for debugging.

use std::fmt::{self, Write};

use crate::backend::CodeGen;
use crate::middle::ir::*;
use crate::types::{CallingConvention, VarArgsKind};
use crate::utils::Result;

/// Pretty printer for Laye IR
pub struct IRPrinter {
    output: String,
}

impl IRPrinter {
    pub fn new() -> Self {
        Self { output: String::new() }
    }

    /// Print an IR module to string
    pub fn print_module(&mut self, module: &IRModule) -> String {
        self.output.clear();
        // Writing into a String cannot fail
        let _ = self.write_module(module);
        std::mem::take(&mut self.output)
    }

    fn write_module(&mut self, module: &IRModule) -> fmt::Result {
        writeln!(self.output, "; Module: {}", module.name)?;
        writeln!(self.output, "; Functions: {}", module.functions.len())?;
        writeln!(self.output)?;

        for strukt in &module.structs {
            write!(self.output, "struct %{} {{ ", strukt.name)?;
            for (i, (name, ty)) in strukt.fields.iter().enumerate() {
                if i > 0 {
                    write!(self.output, ", ")?;
                }
                write!(self.output, "{}: {}", name, ty)?;
            }
            writeln!(self.output, " }}")?;
        }

        for ext in &module.externs {
            write!(self.output, "extern ")?;
            if let Some(library) = &ext.library {
                write!(self.output, "{:?} ", library)?;
            }
            write!(self.output, "{}fn {}(", convention_prefix(ext.calling_convention), ext.name)?;
            self.write_params(&ext.params)?;
            if ext.var_args == VarArgsKind::C {
                write!(self.output, "{}...", if ext.params.is_empty() { "" } else { ", " })?;
            }
            writeln!(self.output, ") -> {}", ext.ret_type)?;
        }

        if !module.structs.is_empty() || !module.externs.is_empty() {
            writeln!(self.output)?;
        }

        for func in &module.functions {
            self.write_function(func)?;
            writeln!(self.output)?;
        }
        Ok(())
    }

    fn write_params(&mut self, params: &[(String, IRType)]) -> fmt::Result {
        for (i, (name, ty)) in params.iter().enumerate() {
            if i > 0 {
                write!(self.output, ", ")?;
            }
            write!(self.output, "{}: {}", name, ty)?;
        }
        Ok(())
    }

    /// Print a function
    fn write_function(&mut self, func: &IRFunction) -> fmt::Result {
        write!(self.output, "{}fn {}(", convention_prefix(func.calling_convention), func.name)?;
        self.write_params(&func.params)?;
        writeln!(self.output, ") -> {} {{", func.ret_type)?;

        for block in &func.blocks {
            self.write_block(block)?;
        }

        writeln!(self.output, "}}")
    }

    /// Print a basic block
    fn write_block(&mut self, block: &BasicBlock) -> fmt::Result {
        writeln!(self.output, "  {}.{}:", block.id, block.label)?;

        for inst in &block.instructions {
            write!(self.output, "    ")?;
            self.write_instruction(inst)?;
            writeln!(self.output)?;
        }

        if let Some(ref term) = block.terminator {
            write!(self.output, "    ")?;
            self.write_terminator(term)?;
            writeln!(self.output)?;
        }
        Ok(())
    }

    /// Print an instruction
    fn write_instruction(&mut self, inst: &Instruction) -> fmt::Result {
        match inst {
            Instruction::Alloca { dest, ty } => write!(self.output, "{} = alloca {}", dest, ty),
            Instruction::Load { dest, ptr, ty } => write!(self.output, "{} = load {}, {}", dest, ty, ptr),
            Instruction::Store { ptr, value } => write!(self.output, "store {}, {}", value, ptr),
            Instruction::BinOp {
                dest,
                op,
                left,
                right,
                ty,
            } => write!(self.output, "{} = {} {} {}, {}", dest, op, ty, left, right),
            Instruction::UnaryOp { dest, op, value } => write!(self.output, "{} = {} {}", dest, op, value),
            Instruction::Call { dest, func, args } => {
                if let Some(d) = dest {
                    write!(self.output, "{} = ", d)?;
                }
                write!(self.output, "call {}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(self.output, ", ")?;
                    }
                    write!(self.output, "{}", arg)?;
                }
                write!(self.output, ")")
            }
            Instruction::Cast { dest, value, from, to } => {
                write!(self.output, "{} = cast {} {} to {}", dest, from, value, to)
            }
            Instruction::Materialize { dest, value, ty } => {
                write!(self.output, "{} = materialize {} {}", dest, ty, value)
            }
            Instruction::SliceData { dest, value } => write!(self.output, "{} = slicedata {}", dest, value),
            Instruction::GetElementPtr {
                dest,
                ptr,
                index,
                elem_ty,
            } => write!(self.output, "{} = gep {}, {}, {}", dest, elem_ty, ptr, index),
            Instruction::FieldPtr {
                dest,
                ptr,
                struct_name,
                field,
            } => write!(self.output, "{} = fieldptr %{}, {}, {}", dest, struct_name, ptr, field),
        }
    }

    /// Print a terminator
    fn write_terminator(&mut self, term: &Terminator) -> fmt::Result {
        match term {
            Terminator::Return { value: Some(v) } => write!(self.output, "ret {}", v),
            Terminator::Return { value: None } => write!(self.output, "ret void"),
            Terminator::Jump { target } => write!(self.output, "br {}", target),
            Terminator::Branch {
                cond,
                then_target,
                else_target,
            } => write!(self.output, "br {}, {}, {}", cond, then_target, else_target),
            Terminator::Unreachable => write!(self.output, "unreachable"),
        }
    }
}

fn convention_prefix(convention: CallingConvention) -> &'static str {
    match convention {
        CallingConvention::Laye => "",
        CallingConvention::LayeNoContext => "nocontext ",
        CallingConvention::CDecl => "cdecl ",
        CallingConvention::StdCall => "stdcall ",
        CallingConvention::FastCall => "fastcall ",
    }
}

impl Default for IRPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen for IRPrinter {
    fn generate(&mut self, module: &IRModule) -> Result<Vec<u8>> {
        Ok(self.print_module(module).into_bytes())
    }

    fn target_triple(&self) -> &str {
        "laye-ir"
    }

    fn name(&self) -> &str {
        "ir-printer"
    }
}

/// Convenience function to print a module
pub fn print_ir(module: &IRModule) -> String {
    let mut printer = IRPrinter::new();
    printer.print_module(module)
}
