//! Compiler Facade
//!
//! Main entry point for the compiler. Ties together the parser, the
//! emitter, and the compile-time evaluation harness: scratch directory,
//! interpreter invocation, and diagnostics.

use crate::emitter::{Emitter, Env};
use crate::emitter::errors::CompileError;
use crate::eval::evaluator::Evaluator;
use crate::eval::scratch::ScratchDir;
use crate::parser;

/// Options for creating a compiler instance.
#[derive(Debug, Clone, Default)]
pub struct CompluaOptions {
    /// Expand `#debug` directives instead of discarding them.
    pub debug: bool,
    /// Interpreter command used for compile-time evaluation
    /// (defaults to `luajit`).
    pub interpreter: Option<String>,
    /// Scratch directory name (defaults to the fixed compiler name).
    pub scratch_dir: Option<String>,
}

/// The compiler.
pub struct Complua {
    options: CompluaOptions,
}

impl Complua {
    pub fn new(options: CompluaOptions) -> Self {
        Self { options }
    }

    /// Compile extended-dialect source into a plain-dialect program.
    ///
    /// `input_name` is used in diagnostics. The scratch directory is
    /// created before emission starts and removed on successful
    /// completion; on failure it is left in place for inspection.
    pub fn compile(&self, source: &str, input_name: &str) -> Result<String, CompileError> {
        let source = normalize_source(source);
        let ast = parser::parse(&source).map_err(|e| CompileError::Diagnostic {
            file: input_name.to_string(),
            line: e.line,
            message: e.message,
        })?;

        let scratch = ScratchDir::create_at(
            self.options
                .scratch_dir
                .as_deref()
                .unwrap_or(ScratchDir::DIR_NAME),
        )?;
        let interpreter = self.options.interpreter.as_deref().unwrap_or("luajit");
        let evaluator = Evaluator::new(&scratch, interpreter, input_name);
        let emitter = Emitter::new(&evaluator, self.options.debug);

        let mut env = Env::new();
        let output = emitter.emit_program(&ast, &mut env)?;
        scratch.cleanup()?;
        Ok(output)
    }
}

/// Strip a UTF-8 BOM and blank out a leading `#!` line. The shebang
/// line is kept as an empty line so line numbers stay stable.
fn normalize_source(source: &str) -> String {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    if source.starts_with("#!") {
        match source.find('\n') {
            Some(i) => source[i..].to_string(),
            None => String::new(),
        }
    } else {
        source.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler(scratch: &str) -> Complua {
        Complua::new(CompluaOptions {
            scratch_dir: Some(format!("target/{}", scratch)),
            ..Default::default()
        })
    }

    #[test]
    fn test_compile_plain_program() {
        let output = compiler(".complua-test-plain")
            .compile("local x = 1\nprint(x + 1)", "input.clua")
            .unwrap();
        assert!(output.starts_with("__repr = function"));
        assert!(output.contains("local x = 1"));
        assert!(output.contains("print((x + 1))"));
        assert!(output.contains("--LINE:1"));
    }

    #[test]
    fn test_compile_parse_error_is_diagnostic() {
        let err = compiler(".complua-test-parse-error")
            .compile("local = 1", "bad.clua")
            .unwrap_err();
        match err {
            CompileError::Diagnostic { file, line, .. } => {
                assert_eq!(file, "bad.clua");
                assert_eq!(line, 1);
            }
            other => panic!("expected diagnostic, got {:?}", other),
        }
    }

    #[test]
    fn test_scratch_removed_on_success() {
        compiler(".complua-test-cleanup")
            .compile("local x = 1", "input.clua")
            .unwrap();
        assert!(!std::path::Path::new("target/.complua-test-cleanup").exists());
    }

    #[test]
    fn test_normalize_strips_shebang() {
        let normalized = normalize_source("#!/usr/bin/env complua\nlocal x = 1");
        assert_eq!(normalized, "\nlocal x = 1");
    }

    #[test]
    fn test_normalize_strips_bom() {
        let normalized = normalize_source("\u{feff}local x = 1");
        assert_eq!(normalized, "local x = 1");
    }
}
