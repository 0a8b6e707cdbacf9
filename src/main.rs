//! Laye Compiler
//!
//! Semantic checking and IR lowering for Laye syntax trees.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use layec::backend::CodeGen;
use layec::frontend::ast::SyntaxRoot;
use layec::frontend::checker::CheckerOptions;
use layec::middle::ir_printer::IRPrinter;
use layec::{driver, Compilation, CompilerOptions};

/// Laye Compiler
#[derive(Parser, Debug)]
#[command(name = "layec")]
#[command(version = "0.1.0")]
#[command(about = "layec - semantic front end for the Laye systems programming language")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check syntax trees for errors
    Check {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Check and lower syntax trees to IR
    Build {
        #[command(flatten)]
        common: CommonArgs,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also print the lowered IR to stdout
        #[arg(long)]
        emit_ir: bool,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Syntax tree files (JSON), checked together as one unit
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,

    /// Keep checking other functions after one fails
    #[arg(long)]
    keep_going: bool,

    /// Diagnostic output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether the unit compiled without errors
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Check { common } => {
            let roots = read_roots(&common.files)?;
            let compilation = driver::check(&roots, &options(&common));
            report(&compilation, common.format);
            Ok(!compilation.diagnostics.has_errors())
        }
        Commands::Build { common, output, emit_ir } => {
            let roots = read_roots(&common.files)?;
            let options = options(&common);
            let compilation = driver::build(&roots, &options);
            report(&compilation, common.format);

            let Some(module) = &compilation.module else {
                return Ok(false);
            };

            let mut printer = IRPrinter::new();
            let bytes = printer
                .generate(module)
                .with_context(|| format!("{} failed to generate output", printer.name()))?;

            let out_path = output.unwrap_or_else(|| PathBuf::from(format!("{}.lir", options.module_name)));
            fs::write(&out_path, &bytes).with_context(|| format!("failed to write {}", out_path.display()))?;
            info!("wrote {} ({})", out_path.display(), printer.target_triple());

            if emit_ir {
                print!("{}", String::from_utf8_lossy(&bytes));
            }
            Ok(true)
        }
    }
}

fn options(common: &CommonArgs) -> CompilerOptions {
    let module_name = common
        .files
        .first()
        .and_then(|path| module_name(path))
        .unwrap_or_else(|| "main".to_string());

    CompilerOptions {
        checker: CheckerOptions {
            keep_going: common.keep_going,
        },
        module_name,
    }
}

/// `hello.ly.json` names module `hello`
fn module_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.split('.').next().filter(|stem| !stem.is_empty())?;
    Some(stem.to_string())
}

fn read_roots(files: &[PathBuf]) -> Result<Vec<SyntaxRoot>> {
    files
        .iter()
        .map(|path| {
            driver::read_syntax(path).with_context(|| format!("failed to load syntax tree {}", path.display()))
        })
        .collect()
}

fn report(compilation: &Compilation, format: Format) {
    let feedback = compilation.feedback();
    match format {
        Format::Json => println!("{}", feedback.to_json()),
        Format::Text if feedback.diagnostics.is_empty() => {
            eprintln!("✅ No errors found in {} source(s)", feedback.sources.len());
        }
        Format::Text => eprintln!("{}", feedback.to_text()),
    }
}
