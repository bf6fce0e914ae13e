//! Compiler orchestration: lex → parse → generate.
//!
//! The pipeline is single-threaded and one-shot: each call builds its
//! own parser and generator over the caller's diagnostics collector, so
//! no state leaks between compilation runs. The caller owns the
//! collector and can print its entries however it likes.

use crate::ast::Stmt;
use crate::codegen::CodeGenerator;
use crate::diagnostics::Diagnostics;
use crate::error::CoreError;
use crate::lexer::Lexer;
use crate::parser::Parser;

/// Parses a source unit, recording syntax errors in `diagnostics`.
pub fn parse_source(source: &str, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
    let mut parser = Parser::new(Lexer::new(source), diagnostics);
    parser.parse()
}

/// Compiles a source unit to the textual IR module.
///
/// Fails if parsing recorded any diagnostic, and again if code
/// generation did; a module produced alongside codegen diagnostics is
/// invalid and never returned.
pub fn compile_to_ir(source: &str, diagnostics: &mut Diagnostics) -> Result<String, CoreError> {
    let statements = parse_source(source, diagnostics);
    if diagnostics.had_error() {
        return Err(CoreError::ParseFailed {
            errors: diagnostics.error_count(),
        });
    }

    let module = CodeGenerator::new(diagnostics).generate(&statements);
    if diagnostics.had_error() {
        return Err(CoreError::CodegenFailed {
            errors: diagnostics.error_count(),
        });
    }
    Ok(module.to_string())
}
