//! Core compiler pipeline for the Ivy language.
//!
//! The pipeline is roughly:
//!
//!   source .ivy
//!     -> lexer    (tokens)
//!     -> parser   (AST, panic-mode recovery)
//!     -> codegen  (basic-block IR module)
//!
//! The emitted module is textual LLVM-flavored IR meant to be handed to
//! an external optimizer and native backend. Higher-level tools (the
//! CLI) should depend on this crate rather than reimplementing the
//! pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod diagnostics;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;
pub mod ast_printer;

// ---------------------------------------------------------------------
// Back-end: IR, code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod ir;
pub mod codegen;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{compile_to_ir, parse_source};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::CoreError;
