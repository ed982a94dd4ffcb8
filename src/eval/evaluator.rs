//! Compile-Time Evaluator
//!
//! Runs a generated plain-dialect program through the external
//! interpreter and collects the artefacts its trailer writes to the
//! scratch directory:
//! - `.{stem}.temp.expr`: byte-dump of a zero-argument function that
//!   returns the evaluated expression
//! - `.{stem}.temp`: the serialised textual form of the value
//! - `.{stem}.temp.type`: the plain-dialect type name of the value
//! - `.{stem}.temp.raw`: the raw bytes, written only for strings
//!
//! Stderr from the interpreter is captured and mapped through the line
//! markers embedded in the program; stdout is propagated.

use std::fs;
use std::process::{Command, Stdio};

use crate::ast::types::Position;
use crate::emitter::errors::CompileError;
use crate::eval::diagnostics;
use crate::eval::scratch::ScratchDir;
use crate::eval::serializer::lua_quote;

/// Artefacts produced by one compile-time evaluation.
#[derive(Debug)]
pub struct Artifacts {
    /// Byte-dump of the zero-argument thunk.
    pub dump: Vec<u8>,
    /// Serialised textual form of the value.
    pub repr: String,
    /// Plain-dialect type name of the value (`type(v)`).
    pub type_name: String,
    /// Raw bytes, present when the value was a string.
    pub raw: Option<Vec<u8>>,
}

/// Owns the interpreter invocation and the scratch-file layout.
pub struct Evaluator<'a> {
    scratch: &'a ScratchDir,
    interpreter: String,
    input_name: String,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        scratch: &'a ScratchDir,
        interpreter: impl Into<String>,
        input_name: impl Into<String>,
    ) -> Self {
        Self {
            scratch,
            interpreter: interpreter.into(),
            input_name: input_name.into(),
        }
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// A source-pointed diagnostic against the input file.
    pub fn diagnostic(&self, pos: Position, message: impl Into<String>) -> CompileError {
        CompileError::at(&self.input_name, pos, message)
    }

    /// The artefact-writing trailer appended to every generated
    /// program. Expects the program to have bound `__eval_fn` to a
    /// zero-argument function returning the evaluated expression.
    pub fn trailer(&self, stem: &str) -> String {
        let dump = self.artifact_literal(stem, ".temp.expr");
        let repr = self.artifact_literal(stem, ".temp");
        let type_name = self.artifact_literal(stem, ".temp.type");
        let raw = self.artifact_literal(stem, ".temp.raw");
        format!(
            "local __eval_out = assert(io.open({dump}, \"wb\"))\n\
             __eval_out:write(string.dump(__eval_fn))\n\
             __eval_out:close()\n\
             local __eval_val = __eval_fn()\n\
             __eval_out = assert(io.open({repr}, \"wb\"))\n\
             __eval_out:write(__repr(__eval_val))\n\
             __eval_out:close()\n\
             __eval_out = assert(io.open({type_name}, \"wb\"))\n\
             __eval_out:write(type(__eval_val))\n\
             __eval_out:close()\n\
             if type(__eval_val) == \"string\" then\n\
             __eval_out = assert(io.open({raw}, \"wb\"))\n\
             __eval_out:write(__eval_val)\n\
             __eval_out:close()\n\
             end\n"
        )
    }

    fn artifact_literal(&self, stem: &str, suffix: &str) -> String {
        let path = self.scratch.file(&format!(".{}{}", stem, suffix));
        lua_quote(&path.to_string_lossy())
    }

    /// Write the program to the scratch directory, run the interpreter
    /// on it, and read the artefacts back.
    pub fn run(&self, program: &str, stem: &str) -> Result<Artifacts, CompileError> {
        let program_path = self.scratch.file(&format!(".{}", stem));
        // Stale artefacts from a previous invocation must not survive
        let _ = fs::remove_file(self.scratch.file(&format!(".{}.temp.raw", stem)));

        fs::write(&program_path, program)?;

        let output = Command::new(&self.interpreter)
            .arg(&program_path)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| CompileError::Spawn {
                command: self.interpreter.clone(),
                source: e,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            return Err(diagnostics::map_interpreter_error(
                &stderr,
                program,
                &self.input_name,
            ));
        }
        if !output.status.success() {
            return Err(CompileError::Interpreter(format!(
                "interpreter exited with {}",
                output.status
            )));
        }

        let dump = fs::read(self.scratch.file(&format!(".{}.temp.expr", stem)))?;
        let repr_bytes = fs::read(self.scratch.file(&format!(".{}.temp", stem)))?;
        let type_name = fs::read_to_string(self.scratch.file(&format!(".{}.temp.type", stem)))?
            .trim()
            .to_string();
        let raw_path = self.scratch.file(&format!(".{}.temp.raw", stem));
        let raw = if raw_path.is_file() {
            Some(fs::read(&raw_path)?)
        } else {
            None
        };

        Ok(Artifacts {
            dump,
            repr: String::from_utf8_lossy(&repr_bytes).into_owned(),
            type_name,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_writes_all_artifacts() {
        let scratch = ScratchDir::create_at(".complua-test-trailer").unwrap();
        let evaluator = Evaluator::new(&scratch, "luajit", "input.clua");
        let trailer = evaluator.trailer("eval");
        assert!(trailer.contains("string.dump(__eval_fn)"));
        assert!(trailer.contains("__repr(__eval_val)"));
        assert!(trailer.contains("type(__eval_val)"));
        assert!(trailer.contains(".eval.temp.expr"));
        assert!(trailer.contains(".eval.temp.type"));
        assert!(trailer.contains(".eval.temp.raw"));
        scratch.cleanup().unwrap();
    }

    #[test]
    fn test_trailer_uses_stem() {
        let scratch = ScratchDir::create_at(".complua-test-stem").unwrap();
        let evaluator = Evaluator::new(&scratch, "luajit", "input.clua");
        let trailer = evaluator.trailer("load");
        assert!(trailer.contains(".load.temp"));
        assert!(!trailer.contains(".eval.temp"));
        scratch.cleanup().unwrap();
    }

    #[test]
    fn test_diagnostic_points_at_input() {
        let scratch = ScratchDir::create_at(".complua-test-diag").unwrap();
        let evaluator = Evaluator::new(&scratch, "luajit", "prog.clua");
        let err = evaluator.diagnostic(Position::new(4, 1), "nope");
        assert_eq!(err.to_string(), "prog.clua:4: nope");
        scratch.cleanup().unwrap();
    }
}
