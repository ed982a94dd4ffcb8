//! Recursive Descent Parser for the Extended Dialect
//!
//! Consumes tokens from the lexer and produces an AST. The expression
//! grammar is a precedence ladder, tightest first:
//!
//!   power → unary → multiplicative → additive → relational → equality → and → or
//!
//! with right-associativity only at the power level. Directive
//! expressions outrank unparenthesised binary operands: `#eval a + b`
//! parses as `#eval (a + b)`.

use crate::ast::types::*;
use crate::parser::lexer::{Lexer, Token, TokenType};
use crate::parser::types::{
    is_compound_assign, starts_expression, SyntaxError, NESTING_LIMIT, SOURCE_SIZE_LIMIT,
};

/// Parser over a token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete program.
    pub fn parse(&mut self, input: &str) -> Result<Vec<Stmt>, SyntaxError> {
        self.prime(input)?;
        let stmts = self.parse_block()?;
        self.expect(TokenType::Eof, "end of input")?;
        Ok(stmts)
    }

    /// Parse a source fragment as a single expression (used by `#load`
    /// in expression position).
    pub fn parse_expression_fragment(&mut self, input: &str) -> Result<Expr, SyntaxError> {
        self.prime(input)?;
        let expr = self.parse_expression()?;
        self.expect(TokenType::Eof, "end of input")?;
        Ok(expr)
    }

    fn prime(&mut self, input: &str) -> Result<(), SyntaxError> {
        if input.len() > SOURCE_SIZE_LIMIT {
            return Err(SyntaxError::new("input too large", 1, 1));
        }
        self.tokens = Lexer::new(input)
            .tokenize()
            .map_err(|e| SyntaxError::new(e.message, e.line, e.column))?;
        self.pos = 0;
        self.depth = 0;
        Ok(())
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_type(&self) -> TokenType {
        self.peek().token_type
    }

    fn peek_at(&self, offset: usize) -> TokenType {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.token_type)
            .unwrap_or(TokenType::Eof)
    }

    fn position(&self) -> Position {
        let t = self.peek();
        Position::new(t.line, t.column)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&mut self, token_type: TokenType) -> bool {
        if self.peek_type() == token_type {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType, what: &str) -> Result<Token, SyntaxError> {
        if self.peek_type() == token_type {
            Ok(self.advance())
        } else {
            Err(SyntaxError::at_token(
                format!("expected {}", what),
                self.peek(),
            ))
        }
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > NESTING_LIMIT {
            let t = self.peek();
            return Err(SyntaxError::new("program too deeply nested", t.line, t.column));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn at_block_end(&self) -> bool {
        matches!(
            self.peek_type(),
            TokenType::Eof | TokenType::End | TokenType::Else | TokenType::Elseif
        )
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        loop {
            if self.check(TokenType::Semicolon) {
                continue;
            }
            if self.at_block_end() {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, SyntaxError> {
        let pos = self.position();
        match self.peek_type() {
            TokenType::Local => self.parse_local(pos),
            TokenType::Function => self.parse_function_decl(pos),
            TokenType::If => self.parse_if(pos),
            TokenType::For => self.parse_for(pos),
            TokenType::Return => self.parse_return(pos),
            TokenType::Break => {
                self.advance();
                Ok(Stmt::Break(pos))
            }
            TokenType::Do => {
                self.advance();
                let body = self.parse_block()?;
                self.expect(TokenType::End, "'end'")?;
                Ok(Stmt::Do(DoNode { body, pos }))
            }
            TokenType::DirEval => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Stmt::Eval(DirectiveStmtNode { expr, pos }))
            }
            TokenType::DirAssert => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Stmt::Assert(DirectiveStmtNode { expr, pos }))
            }
            TokenType::DirLoad => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Stmt::Load(DirectiveStmtNode { expr, pos }))
            }
            TokenType::DirDebug => {
                self.advance();
                let format = self.parse_expression()?;
                let mut args = Vec::new();
                while self.check(TokenType::Comma) {
                    args.push(self.parse_expression()?);
                }
                Ok(Stmt::Debug(DebugNode { format, args, pos }))
            }
            TokenType::DirCheckcall => {
                self.advance();
                let name = self.expect(TokenType::Name, "function name")?.value;
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                self.expect(TokenType::End, "'end'")?;
                Ok(Stmt::Checkcall(CheckcallNode { name, params, body, pos }))
            }
            TokenType::DirInline => {
                self.advance();
                self.expect(TokenType::Function, "'function'")?;
                let name = self.expect(TokenType::Name, "function name")?.value;
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                self.expect(TokenType::End, "'end'")?;
                Ok(Stmt::Inline(InlineNode { name, params, body, pos }))
            }
            TokenType::DirDefer => {
                self.advance();
                let stmt = self.parse_statement()?;
                Ok(Stmt::Defer(Box::new(DeferNode { stmt, pos })))
            }
            TokenType::DirUsing => {
                self.advance();
                let prefix = self.parse_expression()?;
                Ok(Stmt::Using(UsingNode { prefix, pos }))
            }
            TokenType::DirTodo => {
                self.advance();
                let message = if self.peek_type() == TokenType::Str {
                    Some(self.advance().value)
                } else {
                    None
                };
                Ok(Stmt::Todo(TodoNode { message, pos }))
            }
            _ => self.parse_expression_statement(pos),
        }
    }

    fn parse_local(&mut self, pos: Position) -> Result<Stmt, SyntaxError> {
        self.advance();
        let name = self.expect(TokenType::Name, "variable name")?.value;
        let value = if self.check(TokenType::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Stmt::Local(LocalNode { name, value, pos }))
    }

    fn parse_function_decl(&mut self, pos: Position) -> Result<Stmt, SyntaxError> {
        self.advance();
        let name = self.expect(TokenType::Name, "function name")?.value;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        self.expect(TokenType::End, "'end'")?;
        Ok(Stmt::FunctionDecl(FunctionDeclNode { name, params, body, pos }))
    }

    fn parse_if(&mut self, pos: Position) -> Result<Stmt, SyntaxError> {
        self.advance();
        let mut clauses = Vec::new();
        let condition = self.parse_expression()?;
        self.expect(TokenType::Then, "'then'")?;
        let body = self.parse_block()?;
        clauses.push(IfClause { condition, body });

        let mut else_body = None;
        loop {
            if self.check(TokenType::Elseif) {
                let condition = self.parse_expression()?;
                self.expect(TokenType::Then, "'then'")?;
                let body = self.parse_block()?;
                clauses.push(IfClause { condition, body });
            } else if self.check(TokenType::Else) {
                else_body = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }
        self.expect(TokenType::End, "'end'")?;
        Ok(Stmt::If(IfNode { clauses, else_body, pos }))
    }

    fn parse_for(&mut self, pos: Position) -> Result<Stmt, SyntaxError> {
        self.advance();
        let first = self.expect(TokenType::Name, "loop variable")?.value;

        if self.check(TokenType::Assign) {
            let start = self.parse_expression()?;
            self.expect(TokenType::Comma, "','")?;
            let stop = self.parse_expression()?;
            let step = if self.check(TokenType::Comma) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect(TokenType::Do, "'do'")?;
            let body = self.parse_block()?;
            self.expect(TokenType::End, "'end'")?;
            return Ok(Stmt::NumericFor(Box::new(NumericForNode {
                variable: first,
                start,
                stop,
                step,
                body,
                pos,
            })));
        }

        let mut names = vec![first];
        while self.check(TokenType::Comma) {
            names.push(self.expect(TokenType::Name, "loop variable")?.value);
        }
        self.expect(TokenType::In, "'in'")?;
        let iterator = self.parse_expression()?;
        self.expect(TokenType::Do, "'do'")?;
        let body = self.parse_block()?;
        self.expect(TokenType::End, "'end'")?;
        Ok(Stmt::GenericFor(Box::new(GenericForNode {
            names,
            iterator,
            body,
            pos,
        })))
    }

    fn parse_return(&mut self, pos: Position) -> Result<Stmt, SyntaxError> {
        self.advance();
        let mut values = Vec::new();
        if starts_expression(self.peek_type()) {
            values.push(self.parse_expression()?);
            while self.check(TokenType::Comma) {
                values.push(self.parse_expression()?);
            }
        }
        Ok(Stmt::Return(ReturnNode { values, pos }))
    }

    /// A statement that begins with an expression: an assignment, an
    /// in-place assignment, or a call.
    fn parse_expression_statement(&mut self, pos: Position) -> Result<Stmt, SyntaxError> {
        let expr = self.parse_suffixed()?;

        if self.peek_type() == TokenType::Assign {
            self.require_assign_target(&expr)?;
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Stmt::Assign(Box::new(AssignNode {
                target: expr,
                value,
                pos,
            })));
        }

        if is_compound_assign(self.peek_type()) {
            self.require_assign_target(&expr)?;
            let operator = match self.advance().token_type {
                TokenType::PlusEq => BinaryOperator::Add,
                TokenType::MinusEq => BinaryOperator::Subtract,
                TokenType::StarEq => BinaryOperator::Multiply,
                TokenType::SlashEq => BinaryOperator::Divide,
                TokenType::PercentEq => BinaryOperator::Modulo,
                TokenType::CaretEq => BinaryOperator::Power,
                _ => BinaryOperator::Concat,
            };
            let value = self.parse_expression()?;
            return Ok(Stmt::CompoundAssign(Box::new(CompoundAssignNode {
                target: expr,
                operator,
                value,
                pos,
            })));
        }

        match expr {
            Expr::Call(_) | Expr::MethodCall(_) => Ok(Stmt::Call(CallStmtNode { call: expr, pos })),
            _ => Err(SyntaxError::at_token(
                "expression cannot stand as a statement",
                self.peek(),
            )),
        }
    }

    fn require_assign_target(&self, expr: &Expr) -> Result<(), SyntaxError> {
        match expr {
            Expr::Identifier(_) | Expr::Property(_) | Expr::Index(_) => Ok(()),
            other => {
                let pos = other.position();
                Err(SyntaxError::new(
                    "cannot assign to this expression",
                    pos.line,
                    pos.column,
                ))
            }
        }
    }

    fn parse_params(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.expect(TokenType::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                if self.peek_type() == TokenType::Ellipsis {
                    self.advance();
                    params.push("...".to_string());
                    break;
                }
                params.push(self.expect(TokenType::Name, "parameter name")?.value);
                if !self.check(TokenType::Comma) {
                    break;
                }
            }
            self.expect(TokenType::RParen, "')'")?;
        }
        Ok(params)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let result = self.parse_or();
        self.leave();
        result
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.peek_type() == TokenType::Or {
            let pos = self.position();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(Box::new(BinaryNode {
                operator: BinaryOperator::Or,
                left,
                right,
                pos,
            }));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_equality()?;
        while self.peek_type() == TokenType::And {
            let pos = self.position();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary(Box::new(BinaryNode {
                operator: BinaryOperator::And,
                left,
                right,
                pos,
            }));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_relational()?;
        loop {
            let operator = match self.peek_type() {
                TokenType::EqEq => BinaryOperator::Equal,
                TokenType::NotEq => BinaryOperator::NotEqual,
                _ => break,
            };
            let pos = self.position();
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary(Box::new(BinaryNode { operator, left, right, pos }));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.peek_type() {
                TokenType::Less => BinaryOperator::Less,
                TokenType::Greater => BinaryOperator::Greater,
                TokenType::LessEq => BinaryOperator::LessEqual,
                TokenType::GreaterEq => BinaryOperator::GreaterEqual,
                _ => break,
            };
            let pos = self.position();
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(Box::new(BinaryNode { operator, left, right, pos }));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek_type() {
                TokenType::Plus => BinaryOperator::Add,
                TokenType::Minus => BinaryOperator::Subtract,
                TokenType::Concat => BinaryOperator::Concat,
                _ => break,
            };
            let pos = self.position();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(Box::new(BinaryNode { operator, left, right, pos }));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek_type() {
                TokenType::Star => BinaryOperator::Multiply,
                TokenType::Slash => BinaryOperator::Divide,
                TokenType::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            let pos = self.position();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(BinaryNode { operator, left, right, pos }));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let operator = match self.peek_type() {
            TokenType::Minus => Some(UnaryOperator::Negate),
            TokenType::Not => Some(UnaryOperator::Not),
            TokenType::Hash => Some(UnaryOperator::Length),
            _ => None,
        };
        if let Some(operator) = operator {
            let pos = self.position();
            self.advance();
            self.enter()?;
            let operand = self.parse_unary();
            self.leave();
            return Ok(Expr::Unary(Box::new(UnaryNode {
                operator,
                operand: operand?,
                pos,
            })));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.parse_suffixed()?;
        if self.peek_type() == TokenType::Caret {
            let pos = self.position();
            self.advance();
            // Right-associative: the exponent re-enters at unary level
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(BinaryNode {
                operator: BinaryOperator::Power,
                left: base,
                right: exponent,
                pos,
            })));
        }
        Ok(base)
    }

    fn parse_suffixed(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_type() {
                TokenType::Dot => {
                    let pos = self.position();
                    self.advance();
                    let name = self.expect(TokenType::Name, "property name")?.value;
                    expr = Expr::Property(Box::new(PropertyNode { object: expr, name, pos }));
                }
                TokenType::LBracket => {
                    let pos = self.position();
                    self.advance();
                    let key = self.parse_expression()?;
                    self.expect(TokenType::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(IndexNode { object: expr, key, pos }));
                }
                TokenType::LParen => {
                    let pos = self.position();
                    let args = self.parse_args()?;
                    expr = Expr::Call(Box::new(CallNode { callee: expr, args, pos }));
                }
                TokenType::Colon => {
                    let pos = self.position();
                    self.advance();
                    let method = self.expect(TokenType::Name, "method name")?.value;
                    let args = self.parse_args()?;
                    expr = Expr::MethodCall(Box::new(MethodCallNode {
                        object: expr,
                        method,
                        args,
                        pos,
                    }));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(TokenType::LParen, "'('")?;
        let mut args = Vec::new();
        if self.check(TokenType::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.check(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen, "')'")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let pos = self.position();
        match self.peek_type() {
            TokenType::Number => {
                let token = self.advance();
                Ok(Expr::Number(NumberNode { text: token.value, pos }))
            }
            TokenType::Str => {
                let token = self.advance();
                Ok(Expr::Str(StringNode { value: token.value, pos }))
            }
            TokenType::True => {
                self.advance();
                Ok(Expr::Bool(BoolNode { value: true, pos }))
            }
            TokenType::False => {
                self.advance();
                Ok(Expr::Bool(BoolNode { value: false, pos }))
            }
            TokenType::Nil => {
                self.advance();
                Ok(Expr::Nil(pos))
            }
            TokenType::Ellipsis => {
                self.advance();
                Ok(Expr::Varargs(pos))
            }
            TokenType::Name => {
                let token = self.advance();
                Ok(Expr::Identifier(IdentifierNode { name: token.value, pos }))
            }
            TokenType::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::RParen, "')'")?;
                Ok(Expr::Paren(Box::new(ParenNode { expr, pos })))
            }
            TokenType::LBrace => self.parse_table(pos),
            TokenType::Function => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                self.expect(TokenType::End, "'end'")?;
                Ok(Expr::Function(FunctionNode { params, body, pos }))
            }
            TokenType::Do => {
                self.advance();
                let body = self.parse_block()?;
                self.expect(TokenType::End, "'end'")?;
                Ok(Expr::DoExpr(DoExprNode { body, pos }))
            }
            TokenType::DirEval => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Expr::Eval(Box::new(DirectiveExprNode { expr, pos })))
            }
            TokenType::DirLoad => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Expr::Load(Box::new(DirectiveExprNode { expr, pos })))
            }
            TokenType::DirRepr => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Expr::Repr(Box::new(DirectiveExprNode { expr, pos })))
            }
            _ => Err(SyntaxError::at_token("unexpected token", self.peek())),
        }
    }

    fn parse_table(&mut self, pos: Position) -> Result<Expr, SyntaxError> {
        self.advance();
        let mut fields = Vec::new();
        loop {
            if self.check(TokenType::RBrace) {
                break;
            }
            if self.peek_type() == TokenType::LBracket {
                self.advance();
                let key = self.parse_expression()?;
                self.expect(TokenType::RBracket, "']'")?;
                self.expect(TokenType::Assign, "'='")?;
                let value = self.parse_expression()?;
                fields.push(Field::Computed { key, value });
            } else if self.peek_type() == TokenType::Name && self.peek_at(1) == TokenType::Assign {
                let name = self.advance().value;
                self.advance();
                let value = self.parse_expression()?;
                fields.push(Field::Named { name, value });
            } else {
                let value = self.parse_expression()?;
                fields.push(Field::Positional { value });
            }
            if !self.check(TokenType::Comma) && !self.check(TokenType::Semicolon) {
                self.expect(TokenType::RBrace, "'}'")?;
                break;
            }
        }
        Ok(Expr::Table(TableNode { fields, pos }))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a complete program.
pub fn parse(input: &str) -> Result<Vec<Stmt>, SyntaxError> {
    Parser::new().parse(input)
}

/// Parse a fragment as an expression.
pub fn parse_expression(input: &str) -> Result<Expr, SyntaxError> {
    Parser::new().parse_expression_fragment(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse("").unwrap().len(), 0);
    }

    #[test]
    fn test_parse_local() {
        let stmts = parse("local x = 1").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Local(n) => {
                assert_eq!(n.name, "x");
                assert!(n.value.is_some());
            }
            other => panic!("expected local, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_ladder() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary(node) => {
                assert_eq!(node.operator, BinaryOperator::Add);
                assert!(matches!(
                    node.right,
                    Expr::Binary(ref mul) if mul.operator == BinaryOperator::Multiply
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_power_right_associative() {
        let expr = parse_expression("2 ^ 3 ^ 2").unwrap();
        match expr {
            Expr::Binary(node) => {
                assert_eq!(node.operator, BinaryOperator::Power);
                assert!(matches!(node.left, Expr::Number(_)));
                assert!(matches!(
                    node.right,
                    Expr::Binary(ref inner) if inner.operator == BinaryOperator::Power
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_directive_swallows_binary_operand() {
        let stmts = parse("local y = #eval 1 + 2").unwrap();
        match &stmts[0] {
            Stmt::Local(n) => match n.value.as_ref().unwrap() {
                Expr::Eval(node) => {
                    assert!(matches!(node.expr, Expr::Binary(_)));
                }
                other => panic!("expected eval, got {:?}", other),
            },
            other => panic!("expected local, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_decl() {
        let stmts = parse("function add(a, b) return a + b end").unwrap();
        match &stmts[0] {
            Stmt::FunctionDecl(n) => {
                assert_eq!(n.name, "add");
                assert_eq!(n.params, vec!["a", "b"]);
                assert_eq!(n.body.len(), 1);
            }
            other => panic!("expected function decl, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_elseif_else() {
        let stmts = parse("if a then f() elseif b then g() else h() end").unwrap();
        match &stmts[0] {
            Stmt::If(n) => {
                assert_eq!(n.clauses.len(), 2);
                assert!(n.else_body.is_some());
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_numeric_for() {
        let stmts = parse("for i = 1, 10, 2 do f(i) end").unwrap();
        match &stmts[0] {
            Stmt::NumericFor(n) => {
                assert_eq!(n.variable, "i");
                assert!(n.step.is_some());
            }
            other => panic!("expected numeric for, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_generic_for() {
        let stmts = parse("for k, v in pairs(t) do f(k, v) end").unwrap();
        match &stmts[0] {
            Stmt::GenericFor(n) => {
                assert_eq!(n.names, vec!["k", "v"]);
            }
            other => panic!("expected generic for, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_compound_assign() {
        let stmts = parse("x += 1").unwrap();
        match &stmts[0] {
            Stmt::CompoundAssign(n) => {
                assert_eq!(n.operator, BinaryOperator::Add);
            }
            other => panic!("expected compound assign, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_method_call_statement() {
        let stmts = parse("obj:write(1)").unwrap();
        assert!(matches!(&stmts[0], Stmt::Call(n) if matches!(n.call, Expr::MethodCall(_))));
    }

    #[test]
    fn test_parse_table_fields() {
        let expr = parse_expression("{1, a = 2, [k] = 3}").unwrap();
        match expr {
            Expr::Table(node) => {
                assert_eq!(node.fields.len(), 3);
                assert!(matches!(node.fields[0], Field::Positional { .. }));
                assert!(matches!(node.fields[1], Field::Named { .. }));
                assert!(matches!(node.fields[2], Field::Computed { .. }));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inline_directive() {
        let stmts = parse("#inline function sq(x) return x * x end").unwrap();
        match &stmts[0] {
            Stmt::Inline(n) => {
                assert_eq!(n.name, "sq");
                assert_eq!(n.params, vec!["x"]);
            }
            other => panic!("expected inline, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_defer_directive() {
        let stmts = parse("#defer print(x)").unwrap();
        match &stmts[0] {
            Stmt::Defer(n) => {
                assert!(matches!(n.stmt, Stmt::Call(_)));
            }
            other => panic!("expected defer, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_checkcall_directive() {
        let stmts = parse("#checkcall f(...) assert(true) end").unwrap();
        match &stmts[0] {
            Stmt::Checkcall(n) => {
                assert_eq!(n.name, "f");
                assert_eq!(n.params, vec!["..."]);
                assert_eq!(n.body.len(), 1);
            }
            other => panic!("expected checkcall, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_todo_directive() {
        let stmts = parse("#todo \"later\"").unwrap();
        match &stmts[0] {
            Stmt::Todo(n) => assert_eq!(n.message.as_deref(), Some("later")),
            other => panic!("expected todo, got {:?}", other),
        }
    }

    #[test]
    fn test_positions_recorded() {
        let stmts = parse("\n\nlocal x = 1").unwrap();
        assert_eq!(stmts[0].position().line, 3);
    }

    #[test]
    fn test_assignment_to_call_rejected() {
        assert!(parse("f() = 1").is_err());
    }

    #[test]
    fn test_do_as_expression() {
        let stmts = parse("local x = do return 1 end").unwrap();
        match &stmts[0] {
            Stmt::Local(n) => assert!(matches!(n.value, Some(Expr::DoExpr(_)))),
            other => panic!("expected local, got {:?}", other),
        }
    }

    #[test]
    fn test_length_operator() {
        let expr = parse_expression("#t + 1").unwrap();
        match expr {
            Expr::Binary(node) => {
                assert!(matches!(
                    node.left,
                    Expr::Unary(ref u) if u.operator == UnaryOperator::Length
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }
}
