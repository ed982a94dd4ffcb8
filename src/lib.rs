//! complua - a source-to-source compiler for an extended Lua dialect
//!
//! This library parses programs in the extended dialect (directives
//! prefixed with `#`: compile-time evaluation, assertions, checked
//! calls, inlining, defers, dynamic name resolution) and emits plain
//! Lua, delegating compile-time evaluation to an external interpreter.

pub mod ast;
pub mod complua;
pub mod emitter;
pub mod eval;
pub mod parser;

pub use ast::types::*;
pub use complua::{Complua, CompluaOptions};
pub use emitter::{CompileError, Emitter, Env};
pub use eval::{Evaluator, ScratchDir};
pub use parser::{parse, Parser, SyntaxError};
