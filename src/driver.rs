//! Compilation pipeline
//!
//! Syntax trees arrive as JSON produced by an external parser. They are
//! checked as one unit, then optionally lowered to IR.

use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};

use crate::feedback::{CompilationFeedback, CompilationStats};
use crate::frontend::ast::SyntaxRoot;
use crate::frontend::checker::{CheckedProgram, Checker, CheckerOptions};
use crate::frontend::typed_ast::{TypedDecl, TypedFunctionBody};
use crate::middle::ir::IRModule;
use crate::middle::ir_gen::IRGenerator;
use crate::utils::{Diagnostics, Error, Result};

/// Options for one compiler invocation
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub checker: CheckerOptions,
    /// Name of the lowered IR module
    pub module_name: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            checker: CheckerOptions::default(),
            module_name: "main".to_string(),
        }
    }
}

/// Everything one invocation produced
#[derive(Debug)]
pub struct Compilation {
    pub sources: Vec<String>,
    pub diagnostics: Diagnostics,
    pub program: Option<CheckedProgram>,
    pub module: Option<IRModule>,
    pub stats: CompilationStats,
}

impl Compilation {
    pub fn feedback(&self) -> CompilationFeedback {
        CompilationFeedback::new(self.sources.clone(), &self.diagnostics, self.stats.clone())
    }

    /// The lowered module, or the error describing which stage failed
    pub fn into_module(self) -> Result<IRModule> {
        let errors = self.diagnostics.error_count();
        match (self.program, self.module) {
            (_, Some(module)) => Ok(module),
            (None, None) => Err(Error::CheckFailed { errors }),
            (Some(_), None) => Err(Error::LoweringFailed { errors }),
        }
    }
}

/// Deserialize a syntax tree
pub fn parse_syntax(json: &str) -> Result<SyntaxRoot> {
    Ok(serde_json::from_str(json)?)
}

/// Read a syntax tree from a JSON file
pub fn read_syntax(path: &Path) -> Result<SyntaxRoot> {
    debug!("reading syntax tree from {}", path.display());
    let json = fs::read_to_string(path)?;
    parse_syntax(&json)
}

/// Check a unit without lowering it
pub fn check(roots: &[SyntaxRoot], options: &CompilerOptions) -> Compilation {
    let mut diagnostics = Diagnostics::new();
    let mut stats = CompilationStats::default();

    let start = Instant::now();
    let program = Checker::check_syntax(roots, &mut diagnostics, options.checker);
    stats.check_time_ms = start.elapsed().as_millis() as u64;

    if let Some(program) = &program {
        count_decls(program, &mut stats);
    }

    Compilation {
        sources: roots.iter().map(|root| root.source_name.clone()).collect(),
        diagnostics,
        program,
        module: None,
        stats,
    }
}

/// Check a unit and lower it to IR
pub fn build(roots: &[SyntaxRoot], options: &CompilerOptions) -> Compilation {
    let mut compilation = check(roots, options);
    let Some(program) = &compilation.program else {
        info!("checking failed; skipping lowering");
        return compilation;
    };

    let start = Instant::now();
    compilation.module = IRGenerator::lower(&options.module_name, program, &mut compilation.diagnostics);
    compilation.stats.lower_time_ms = start.elapsed().as_millis() as u64;
    compilation
}

fn count_decls(program: &CheckedProgram, stats: &mut CompilationStats) {
    for decl in program.roots.iter().flat_map(|root| &root.decls) {
        match decl {
            TypedDecl::Function(func) if matches!(func.body, TypedFunctionBody::Empty) => stats.extern_count += 1,
            TypedDecl::Function(_) => stats.function_count += 1,
            TypedDecl::Struct { .. } | TypedDecl::Enum { .. } => stats.type_count += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::build::*;
    use crate::types::VarArgsKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_counts_declarations() {
        let roots = vec![root(vec![
            c_extern(ty("i32"), "puts", vec![param(ty("rawptr"), "s")], VarArgsKind::None),
            strukt("point", vec![param(ty("i32"), "x")]),
            func(ty("void"), "main", vec![], vec![]),
        ])];
        let compilation = build(&roots, &CompilerOptions::default());
        assert_eq!(compilation.sources, vec!["test.ly".to_string()]);
        assert_eq!(compilation.stats.function_count, 1);
        assert_eq!(compilation.stats.extern_count, 1);
        assert_eq!(compilation.stats.type_count, 1);

        let module = compilation.into_module().unwrap();
        assert_eq!(module.name, "main");
        assert_eq!(module.functions.len(), 1);
    }

    #[test]
    fn test_check_failure_is_reported() {
        let roots = vec![root(vec![func(ty("void"), "main", vec![], vec![expr(call("missing", vec![]))])])];
        let compilation = build(&roots, &CompilerOptions::default());
        assert!(compilation.module.is_none());
        assert!(!compilation.feedback().success);
        assert!(matches!(compilation.into_module(), Err(Error::CheckFailed { errors: 1 })));
    }

    #[test]
    fn test_lowering_failure_is_reported() {
        let roots = vec![root(vec![func(ty("i32"), "main", vec![], vec![])])];
        let compilation = build(&roots, &CompilerOptions::default());
        assert!(compilation.program.is_some());
        assert!(matches!(compilation.into_module(), Err(Error::LoweringFailed { errors: 1 })));
    }

    #[test]
    fn test_syntax_json_round_trips() {
        let original = root(vec![func(ty("i32"), "answer", vec![], vec![ret(Some(int(42)))])]);
        let json = serde_json::to_string(&original).unwrap();
        let parsed = parse_syntax(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_malformed_json_is_a_syntax_error() {
        assert!(matches!(parse_syntax("{\"source_name\": 3}"), Err(Error::Syntax(_))));
    }
}
