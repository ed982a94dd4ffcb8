//! Lexer for Extended-Dialect Sources
//!
//! The lexer tokenizes input into a stream of tokens that the parser
//! consumes. It handles:
//! - Operators and delimiters (including the in-place assignment forms)
//! - Directive keywords introduced by the `#` sigil
//! - Strings in both quote kinds with backslash escapes
//! - Line and block comments (discarded)
//! - Numbers (decimal, hex, exponents), kept as verbatim lexemes

use std::collections::HashMap;

/// Token types for the extended dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // End of input
    Eof,

    // Literals and identifiers
    Number,
    Str,
    Name,

    // Reserved words
    And,
    Break,
    Do,
    Else,
    Elseif,
    End,
    False,
    For,
    Function,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Return,
    Then,
    True,

    // Directives
    DirEval,     // #eval
    DirAssert,   // #assert
    DirDebug,    // #debug
    DirCheckcall, // #checkcall
    DirLoad,     // #load
    DirRepr,     // #repr
    DirTodo,     // #todo
    DirInline,   // #inline
    DirDefer,    // #defer
    DirUsing,    // #using

    // Operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    Caret,     // ^
    Hash,      // # (length)
    Assign,    // =
    EqEq,      // ==
    NotEq,     // ~=
    Less,      // <
    Greater,   // >
    LessEq,    // <=
    GreaterEq, // >=
    Concat,    // ..
    Ellipsis,  // ...

    // In-place assignment operators
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=
    CaretEq,   // ^=
    ConcatEq,  // ..=

    // Grouping and punctuation
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Semicolon, // ;
    Colon,    // :
    Comma,    // ,
    Dot,      // .
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Number => "NUMBER",
            Self::Str => "STRING",
            Self::Name => "NAME",
            Self::And => "and",
            Self::Break => "break",
            Self::Do => "do",
            Self::Else => "else",
            Self::Elseif => "elseif",
            Self::End => "end",
            Self::False => "false",
            Self::For => "for",
            Self::Function => "function",
            Self::If => "if",
            Self::In => "in",
            Self::Local => "local",
            Self::Nil => "nil",
            Self::Not => "not",
            Self::Or => "or",
            Self::Return => "return",
            Self::Then => "then",
            Self::True => "true",
            Self::DirEval => "#eval",
            Self::DirAssert => "#assert",
            Self::DirDebug => "#debug",
            Self::DirCheckcall => "#checkcall",
            Self::DirLoad => "#load",
            Self::DirRepr => "#repr",
            Self::DirTodo => "#todo",
            Self::DirInline => "#inline",
            Self::DirDefer => "#defer",
            Self::DirUsing => "#using",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Caret => "^",
            Self::Hash => "#",
            Self::Assign => "=",
            Self::EqEq => "==",
            Self::NotEq => "~=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEq => "<=",
            Self::GreaterEq => ">=",
            Self::Concat => "..",
            Self::Ellipsis => "...",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::PercentEq => "%=",
            Self::CaretEq => "^=",
            Self::ConcatEq => "..=",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Dot => ".",
        }
    }
}

/// One token of extended-dialect source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            token_type,
            value: value.into(),
            line,
            column,
        }
    }
}

/// Invalid input at the character level: an unterminated string, an
/// oversized escape, a character no token starts with.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

lazy_static::lazy_static! {
    /// Reserved words in the plain dialect
    static ref RESERVED_WORDS: HashMap<&'static str, TokenType> = {
        let mut m = HashMap::new();
        m.insert("and", TokenType::And);
        m.insert("break", TokenType::Break);
        m.insert("do", TokenType::Do);
        m.insert("else", TokenType::Else);
        m.insert("elseif", TokenType::Elseif);
        m.insert("end", TokenType::End);
        m.insert("false", TokenType::False);
        m.insert("for", TokenType::For);
        m.insert("function", TokenType::Function);
        m.insert("if", TokenType::If);
        m.insert("in", TokenType::In);
        m.insert("local", TokenType::Local);
        m.insert("nil", TokenType::Nil);
        m.insert("not", TokenType::Not);
        m.insert("or", TokenType::Or);
        m.insert("return", TokenType::Return);
        m.insert("then", TokenType::Then);
        m.insert("true", TokenType::True);
        m
    };

    /// Directive keywords, looked up after the `#` sigil
    static ref DIRECTIVES: HashMap<&'static str, TokenType> = {
        let mut m = HashMap::new();
        m.insert("eval", TokenType::DirEval);
        m.insert("assert", TokenType::DirAssert);
        m.insert("debug", TokenType::DirDebug);
        m.insert("checkcall", TokenType::DirCheckcall);
        m.insert("load", TokenType::DirLoad);
        m.insert("repr", TokenType::DirRepr);
        m.insert("todo", TokenType::DirTodo);
        m.insert("inline", TokenType::DirInline);
        m.insert("defer", TokenType::DirDefer);
        m.insert("using", TokenType::DirUsing);
        m
    };
}

/// Three-character operators
const THREE_CHAR_OPS: &[(&str, TokenType)] = &[
    ("...", TokenType::Ellipsis),
    ("..=", TokenType::ConcatEq),
];

/// Two-character operators
const TWO_CHAR_OPS: &[(&str, TokenType)] = &[
    ("==", TokenType::EqEq),
    ("~=", TokenType::NotEq),
    ("<=", TokenType::LessEq),
    (">=", TokenType::GreaterEq),
    ("..", TokenType::Concat),
    ("+=", TokenType::PlusEq),
    ("-=", TokenType::MinusEq),
    ("*=", TokenType::StarEq),
    ("/=", TokenType::SlashEq),
    ("%=", TokenType::PercentEq),
    ("^=", TokenType::CaretEq),
];

/// Single-character operators
fn single_char_op(c: char) -> Option<TokenType> {
    match c {
        '+' => Some(TokenType::Plus),
        '-' => Some(TokenType::Minus),
        '*' => Some(TokenType::Star),
        '/' => Some(TokenType::Slash),
        '%' => Some(TokenType::Percent),
        '^' => Some(TokenType::Caret),
        '=' => Some(TokenType::Assign),
        '<' => Some(TokenType::Less),
        '>' => Some(TokenType::Greater),
        '(' => Some(TokenType::LParen),
        ')' => Some(TokenType::RParen),
        '{' => Some(TokenType::LBrace),
        '}' => Some(TokenType::RBrace),
        '[' => Some(TokenType::LBracket),
        ']' => Some(TokenType::RBracket),
        ';' => Some(TokenType::Semicolon),
        ':' => Some(TokenType::Colon),
        ',' => Some(TokenType::Comma),
        '.' => Some(TokenType::Dot),
        _ => None,
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Character-level scanner over the whole input
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    /// Consume the input and produce the token stream, ending in Eof.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        while self.pos < self.input.len() {
            let c = self.input[self.pos];

            if c == '\n' {
                self.advance();
                continue;
            }
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
                continue;
            }

            // Comments: -- to end of line, or --[[ ... ]]
            if c == '-' && self.peek_at(1) == Some('-') {
                self.skip_comment();
                continue;
            }

            if c == '"' || c == '\'' {
                self.read_string(c)?;
                continue;
            }

            if c.is_ascii_digit() || (c == '.' && self.peek_at(1).map_or(false, |n| n.is_ascii_digit())) {
                self.read_number();
                continue;
            }

            if is_name_start(c) {
                self.read_name();
                continue;
            }

            if c == '#' {
                self.read_hash();
                continue;
            }

            if self.read_operator() {
                continue;
            }

            return Err(LexerError::new(
                format!("unexpected character '{}'", c),
                self.line,
                self.column,
            ));
        }

        self.tokens
            .push(Token::new(TokenType::Eof, "", self.line, self.column));
        Ok(self.tokens)
    }

    fn advance(&mut self) {
        if self.input[self.pos] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn matches(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip_comment(&mut self) {
        // Past the leading "--"
        self.advance();
        self.advance();

        if self.matches("[[") {
            self.advance();
            self.advance();
            while self.pos < self.input.len() && !self.matches("]]") {
                self.advance();
            }
            if self.matches("]]") {
                self.advance();
                self.advance();
            }
        } else {
            while self.pos < self.input.len() && self.input[self.pos] != '\n' {
                self.advance();
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<(), LexerError> {
        let line = self.line;
        let column = self.column;
        self.advance();

        let mut value = String::new();
        loop {
            let Some(c) = self.peek_at(0) else {
                return Err(LexerError::new("unterminated string", line, column));
            };
            if c == quote {
                self.advance();
                break;
            }
            if c == '\n' {
                return Err(LexerError::new("unterminated string", line, column));
            }
            if c == '\\' {
                self.advance();
                let Some(esc) = self.peek_at(0) else {
                    return Err(LexerError::new("unterminated string", line, column));
                };
                match esc {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'a' => value.push('\u{07}'),
                    'b' => value.push('\u{08}'),
                    'f' => value.push('\u{0C}'),
                    'v' => value.push('\u{0B}'),
                    '\n' => value.push('\n'),
                    '0'..='9' => {
                        // Decimal escape, up to three digits
                        let mut code = 0u32;
                        let mut digits = 0;
                        while digits < 3 {
                            match self.peek_at(0) {
                                Some(d) if d.is_ascii_digit() => {
                                    code = code * 10 + d.to_digit(10).unwrap_or(0);
                                    self.advance();
                                    digits += 1;
                                }
                                _ => break,
                            }
                        }
                        if code > 255 {
                            return Err(LexerError::new(
                                "decimal escape too large",
                                line,
                                column,
                            ));
                        }
                        value.push(code as u8 as char);
                        continue;
                    }
                    other => value.push(other),
                }
                self.advance();
                continue;
            }
            value.push(c);
            self.advance();
        }

        self.tokens
            .push(Token::new(TokenType::Str, value, line, column));
        Ok(())
    }

    fn read_number(&mut self) {
        let line = self.line;
        let column = self.column;
        let mut text = String::new();

        if self.peek_at(0) == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            text.push(self.input[self.pos]);
            self.advance();
            text.push(self.input[self.pos]);
            self.advance();
            while let Some(c) = self.peek_at(0) {
                if c.is_ascii_hexdigit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        } else {
            while let Some(c) = self.peek_at(0) {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            // Fractional part, but not the concat operator
            if self.peek_at(0) == Some('.') && self.peek_at(1) != Some('.') {
                text.push('.');
                self.advance();
                while let Some(c) = self.peek_at(0) {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            if matches!(self.peek_at(0), Some('e') | Some('E')) {
                let sign_offset = match self.peek_at(1) {
                    Some('+') | Some('-') => 1,
                    _ => 0,
                };
                if self
                    .peek_at(1 + sign_offset)
                    .map_or(false, |c| c.is_ascii_digit())
                {
                    for _ in 0..=sign_offset {
                        text.push(self.input[self.pos]);
                        self.advance();
                    }
                    while let Some(c) = self.peek_at(0) {
                        if c.is_ascii_digit() {
                            text.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        self.tokens
            .push(Token::new(TokenType::Number, text, line, column));
    }

    fn read_name(&mut self) {
        let line = self.line;
        let column = self.column;
        let mut name = String::new();
        while let Some(c) = self.peek_at(0) {
            if is_name_char(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let token_type = RESERVED_WORDS
            .get(name.as_str())
            .copied()
            .unwrap_or(TokenType::Name);
        self.tokens.push(Token::new(token_type, name, line, column));
    }

    /// `#` starts either a directive keyword or the length operator.
    fn read_hash(&mut self) {
        let line = self.line;
        let column = self.column;

        let mut word = String::new();
        let mut offset = 1;
        while let Some(c) = self.peek_at(offset) {
            if is_name_char(c) {
                word.push(c);
                offset += 1;
            } else {
                break;
            }
        }

        if let Some(&token_type) = DIRECTIVES.get(word.as_str()) {
            for _ in 0..offset {
                self.advance();
            }
            self.tokens.push(Token::new(
                token_type,
                format!("#{}", word),
                line,
                column,
            ));
        } else {
            self.advance();
            self.tokens
                .push(Token::new(TokenType::Hash, "#", line, column));
        }
    }

    fn read_operator(&mut self) -> bool {
        let line = self.line;
        let column = self.column;

        for (text, token_type) in THREE_CHAR_OPS {
            if self.matches(text) {
                for _ in 0..text.len() {
                    self.advance();
                }
                self.tokens.push(Token::new(*token_type, *text, line, column));
                return true;
            }
        }
        for (text, token_type) in TWO_CHAR_OPS {
            if self.matches(text) {
                for _ in 0..text.len() {
                    self.advance();
                }
                self.tokens.push(Token::new(*token_type, *text, line, column));
                return true;
            }
        }
        if let Some(token_type) = self.peek_at(0).and_then(single_char_op) {
            let c = self.input[self.pos];
            self.advance();
            self.tokens
                .push(Token::new(token_type, c.to_string(), line, column));
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_simple_statement() {
        let tokens = Lexer::new("local x = 1").tokenize().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Local);
        assert_eq!(tokens[1].token_type, TokenType::Name);
        assert_eq!(tokens[1].value, "x");
        assert_eq!(tokens[2].token_type, TokenType::Assign);
        assert_eq!(tokens[3].token_type, TokenType::Number);
        assert_eq!(tokens[4].token_type, TokenType::Eof);
    }

    #[test]
    fn test_directive_keywords() {
        assert_eq!(
            types("#eval #assert #inline #defer #using"),
            vec![
                TokenType::DirEval,
                TokenType::DirAssert,
                TokenType::DirInline,
                TokenType::DirDefer,
                TokenType::DirUsing,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_hash_without_directive_is_length() {
        assert_eq!(
            types("#t"),
            vec![TokenType::Hash, TokenType::Name, TokenType::Eof]
        );
    }

    #[test]
    fn test_in_place_operators() {
        assert_eq!(
            types("x += 1 y ..= z"),
            vec![
                TokenType::Name,
                TokenType::PlusEq,
                TokenType::Number,
                TokenType::Name,
                TokenType::ConcatEq,
                TokenType::Name,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = Lexer::new(r#""a\nb" 'c\'d'"#).tokenize().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Str);
        assert_eq!(tokens[0].value, "a\nb");
        assert_eq!(tokens[1].value, "c'd");
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
    }

    #[test]
    fn test_comments_discarded() {
        assert_eq!(
            types("x -- trailing\n--[[ block\ncomment ]] y"),
            vec![TokenType::Name, TokenType::Name, TokenType::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("1 3.14 0xFF 1e10 2e-3").tokenize().unwrap();
        let values: Vec<&str> = tokens[..5].iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["1", "3.14", "0xFF", "1e10", "2e-3"]);
    }

    #[test]
    fn test_concat_vs_number() {
        assert_eq!(
            types("a .. 2"),
            vec![TokenType::Name, TokenType::Concat, TokenType::Number, TokenType::Eof]
        );
    }

    #[test]
    fn test_ellipsis() {
        assert_eq!(types("..."), vec![TokenType::Ellipsis, TokenType::Eof]);
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("local\n  x").tokenize().unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 3);
    }

    #[test]
    fn test_unexpected_character() {
        assert!(Lexer::new("@").tokenize().is_err());
    }
}
