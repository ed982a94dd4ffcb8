//! Compile-Time Evaluation
//!
//! Everything the emitter needs to execute a constructed plain-dialect
//! program during compilation: the scratch-directory resource, the
//! serialiser prelude, the interpreter invocation, and the diagnostic
//! mapping from interpreter errors back to original source positions.

pub mod diagnostics;
pub mod evaluator;
pub mod scratch;
pub mod serializer;

pub use evaluator::{Artifacts, Evaluator};
pub use scratch::ScratchDir;
pub use serializer::{lua_quote, SERIALIZER_PRELUDE};
