//! Emission pipeline for the extended dialect.
//!
//! The emitter walks the AST recursively, threading a mutable
//! compilation environment through every step. Compile-time directives
//! delegate to the eval module and splice the results back into the
//! output.

pub mod context;
pub mod dependencies;
pub mod emitter;
pub mod errors;

pub use context::{Binding, BindingKind, CheckcallDef, Env, InlineDef};
pub use emitter::Emitter;
pub use errors::CompileError;
