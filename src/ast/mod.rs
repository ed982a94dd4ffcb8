//! Abstract Syntax Tree (AST) Types for the Extended Dialect
//!
//! This module defines the complete AST structure for extended-dialect
//! programs. The design follows the plain Lua grammar plus the directive
//! extensions while being Rust-idiomatic.
//!
//! Architecture:
//!   Input → Lexer → Parser → AST → Emitter → Plain-dialect output

pub mod types;
