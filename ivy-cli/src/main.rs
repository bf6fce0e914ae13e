use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use clap::Parser;
use ivy_core::lexer::{Lexer, TokenKind};
use ivy_core::{Diagnostics, compile_to_ir, parse_source};

const MAX_TOKEN_COUNT: usize = 500;
const REQUIRED_TOOLS: [&str; 2] = ["opt", "clang++"];

#[derive(Parser, Debug)]
#[command(name = "ivyc", version, about = "Compiler for the Ivy language")]
struct Cli {
    /// Source file; standard input is read when omitted
    input: Option<PathBuf>,

    #[arg(short, long, default_value = "a", help = "Output base name")]
    output: String,

    #[arg(long, help = "Dump the token stream and exit")]
    tokens: bool,

    #[arg(long, help = "Dump the parsed AST and exit")]
    ast: bool,

    #[arg(long, help = "Emit textual IR instead of a native binary")]
    emit_ir: bool,

    #[arg(long, help = "Check that the required external tools are installed")]
    check_tools: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.check_tools {
        return check_tools();
    }

    let source = read_source(cli.input.as_deref())?;

    if cli.tokens {
        return run_tokens(&source);
    }
    if cli.ast {
        return run_ast(&source);
    }
    compile(&cli, &source)
}

fn read_source(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("could not open file {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("could not read standard input")?;
            Ok(buffer)
        }
    }
}

fn run_tokens(source: &str) -> Result<()> {
    println!("\nToken stream:\n----------------------------------------");

    let mut lexer = Lexer::new(source);
    let mut token_count = 0usize;
    loop {
        let token = lexer.scan_token();
        println!("{}", token.dump_line());

        if token.kind == TokenKind::EndOfFile {
            break;
        }
        if token.kind == TokenKind::Error {
            eprintln!("Lexical error: {}", token.lexeme);
        }

        token_count += 1;
        if token_count > MAX_TOKEN_COUNT {
            eprintln!("Token limit exceeded");
            break;
        }
    }
    Ok(())
}

fn run_ast(source: &str) -> Result<()> {
    let mut diagnostics = Diagnostics::new();
    let statements = parse_source(source, &mut diagnostics);

    if diagnostics.had_error() {
        for diagnostic in diagnostics.entries() {
            eprintln!("{diagnostic}");
        }
        bail!("Parsing failed");
    }

    print!("{}", ivy_core::ast_printer::print_ast(&statements));
    Ok(())
}

fn compile(cli: &Cli, source: &str) -> Result<()> {
    let mut diagnostics = Diagnostics::new();
    let ir = match compile_to_ir(source, &mut diagnostics) {
        Ok(ir) => ir,
        Err(error) => {
            for diagnostic in diagnostics.entries() {
                eprintln!("{diagnostic}");
            }
            return Err(error.into());
        }
    };

    let ll_file = format!("{}.ll", cli.output);
    fs::write(&ll_file, &ir).with_context(|| format!("could not write {ll_file}"))?;

    if cli.emit_ir {
        println!("IR written to {ll_file}");
        return Ok(());
    }

    check_tools()?;
    compile_native(&cli.output)?;
    cleanup_temp_files(&cli.output);
    println!("Compilation successful. Output: {}", cli.output);
    Ok(())
}

/// Runs the external optimizer and native compiler over the emitted IR.
fn compile_native(output_base: &str) -> Result<()> {
    let ll_file = format!("{output_base}.ll");
    let opt_ll_file = format!("{output_base}-opt.ll");

    let status = Command::new("opt")
        .arg(&ll_file)
        .args(["-O3", "-S", "-o"])
        .arg(&opt_ll_file)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to run opt")?;
    if !status.success() || !artifact_exists(&opt_ll_file) {
        bail!("Code optimization failed");
    }

    let status = Command::new("clang++")
        .arg("-O3")
        .arg(&opt_ll_file)
        .arg("-o")
        .arg(output_base)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to run clang++")?;
    if !status.success() || !artifact_exists(output_base) {
        bail!("Binary compilation failed");
    }
    Ok(())
}

fn artifact_exists(path: &str) -> bool {
    fs::metadata(path).map(|meta| meta.len() > 0).unwrap_or(false)
}

fn cleanup_temp_files(output_base: &str) {
    // Best effort; a stale temp file is not worth failing the build.
    let _ = fs::remove_file(format!("{output_base}.ll"));
    let _ = fs::remove_file(format!("{output_base}-opt.ll"));
}

fn check_tools() -> Result<()> {
    for tool in REQUIRED_TOOLS {
        let available = Command::new(tool)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);
        if !available {
            bail!("Required tool \"{tool}\" not found. Please install it.");
        }
    }
    Ok(())
}
