//! Parser support types.
//!
//! Syntax errors carry the position they were raised at; the offending
//! lexeme is folded into the message when the error is built, the same
//! way the emitter's `CompileError` keeps context in the message. Hard
//! limits keep pathological inputs from tying the compiler up.

use thiserror::Error;

use crate::parser::lexer::{Token, TokenType};

/// Inputs above this size are rejected before lexing.
pub const SOURCE_SIZE_LIMIT: usize = 1_000_000;

/// Nesting deeper than this aborts the parse instead of overflowing
/// the stack.
pub const NESTING_LIMIT: usize = 200;

/// Check if a token type starts an expression.
pub fn starts_expression(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Number
            | TokenType::Str
            | TokenType::Name
            | TokenType::True
            | TokenType::False
            | TokenType::Nil
            | TokenType::Ellipsis
            | TokenType::Minus
            | TokenType::Not
            | TokenType::Hash
            | TokenType::LParen
            | TokenType::LBrace
            | TokenType::Function
            | TokenType::Do
            | TokenType::DirEval
            | TokenType::DirLoad
            | TokenType::DirRepr
    )
}

/// Check if a token type is an in-place assignment operator.
pub fn is_compound_assign(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::PlusEq
            | TokenType::MinusEq
            | TokenType::StarEq
            | TokenType::SlashEq
            | TokenType::PercentEq
            | TokenType::CaretEq
            | TokenType::ConcatEq
    )
}

/// Error raised when the source cannot be parsed.
#[derive(Debug, Error)]
#[error("{line}:{column}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// Error at a token, with the offending lexeme folded into the
    /// message.
    pub fn at_token(message: impl Into<String>, token: &Token) -> Self {
        let lexeme = if token.token_type == TokenType::Eof {
            "<eof>"
        } else {
            token.value.as_str()
        };
        Self {
            message: format!("{} near '{}'", message.into(), lexeme),
            line: token.line,
            column: token.column,
        }
    }
}
