//! Parser module for the extended dialect.
//!
//! Tokenizes and parses extended-dialect source into the AST.

pub mod lexer;
pub mod parser;
pub mod types;

pub use lexer::{Lexer, LexerError, Token, TokenType};
pub use parser::{parse, parse_expression, Parser};
pub use types::SyntaxError;
