//! Compile Errors
//!
//! All compile-time failures are fatal and surface as a single
//! diagnostic line. Interpreter errors that could be mapped through
//! line markers become source-pointed diagnostics; unmappable ones
//! fall back to the raw interpreter output.

use std::io;
use thiserror::Error;

use crate::ast::types::Position;

/// Unified error enum for all compiler errors.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A diagnostic pointed at a position in the original source.
    #[error("{file}:{line}: {message}")]
    Diagnostic {
        file: String,
        line: usize,
        message: String,
    },

    /// Raw interpreter output, used when no line marker could be
    /// recovered from the generated program.
    #[error("{0}")]
    Interpreter(String),

    /// The external interpreter could not be started at all.
    #[error("failed to run interpreter '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CompileError {
    /// Build a source-pointed diagnostic.
    pub fn at(file: impl Into<String>, pos: Position, message: impl Into<String>) -> Self {
        Self::Diagnostic {
            file: file.into(),
            line: pos.line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let err = CompileError::at("input.clua", Position::new(7, 3), "assertion failed!");
        assert_eq!(err.to_string(), "input.clua:7: assertion failed!");
    }

    #[test]
    fn test_raw_interpreter_format() {
        let err = CompileError::Interpreter("luajit: something went wrong".to_string());
        assert_eq!(err.to_string(), "luajit: something went wrong");
    }
}
