//! AST node types for the extended dialect.
//!
//! Every node carries the source position it was parsed at, so that
//! compile-time diagnostics and line markers can point back at the
//! original file. The tree is immutable after parsing; the emitter only
//! performs local rebuilds (in-place assignment desugaring, inline
//! parameter substitution) on structural copies.

// =============================================================================
// BASE TYPES
// =============================================================================

/// Position information for error reporting and line mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// =============================================================================
// OPERATORS
// =============================================================================

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate, // -
    Not,    // not
    Length, // #
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "not",
            Self::Length => "#",
        }
    }
}

/// Binary operators. One node shape serves every precedence level; the
/// operator itself carries the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,        // ==
    NotEqual,     // ~=
    Less,         // <
    Greater,      // >
    LessEqual,    // <=
    GreaterEqual, // >=
    Add,          // +
    Subtract,     // -
    Concat,       // ..
    Multiply,     // *
    Divide,       // /
    Modulo,       // %
    Power,        // ^
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Equal => "==",
            Self::NotEqual => "~=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Concat => "..",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
        }
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

/// Union of all expression kinds, including the directives that may
/// appear in expression position.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(NumberNode),
    Str(StringNode),
    Bool(BoolNode),
    Nil(Position),
    Varargs(Position),
    Identifier(IdentifierNode),
    Unary(Box<UnaryNode>),
    Binary(Box<BinaryNode>),
    Property(Box<PropertyNode>),
    Index(Box<IndexNode>),
    Call(Box<CallNode>),
    MethodCall(Box<MethodCallNode>),
    Paren(Box<ParenNode>),
    Table(TableNode),
    Function(FunctionNode),
    /// `#eval expr` in expression position
    Eval(Box<DirectiveExprNode>),
    /// `#load expr` in expression position
    Load(Box<DirectiveExprNode>),
    /// `#repr expr`
    Repr(Box<DirectiveExprNode>),
    /// `do ... end` as an expression
    DoExpr(DoExprNode),
}

impl Expr {
    /// Source position of the expression.
    pub fn position(&self) -> Position {
        match self {
            Expr::Number(n) => n.pos,
            Expr::Str(n) => n.pos,
            Expr::Bool(n) => n.pos,
            Expr::Nil(pos) | Expr::Varargs(pos) => *pos,
            Expr::Identifier(n) => n.pos,
            Expr::Unary(n) => n.pos,
            Expr::Binary(n) => n.pos,
            Expr::Property(n) => n.pos,
            Expr::Index(n) => n.pos,
            Expr::Call(n) => n.pos,
            Expr::MethodCall(n) => n.pos,
            Expr::Paren(n) => n.pos,
            Expr::Table(n) => n.pos,
            Expr::Function(n) => n.pos,
            Expr::Eval(n) | Expr::Load(n) | Expr::Repr(n) => n.pos,
            Expr::DoExpr(n) => n.pos,
        }
    }
}

/// Numeric literal. The original lexeme is kept verbatim so emission
/// never reformats a number.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberNode {
    pub text: String,
    pub pos: Position,
}

/// String literal with escapes already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StringNode {
    pub value: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolNode {
    pub value: bool,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierNode {
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryNode {
    pub operator: UnaryOperator,
    pub operand: Expr,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub operator: BinaryOperator,
    pub left: Expr,
    pub right: Expr,
    pub pos: Position,
}

/// Property access: `object.name`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub object: Expr,
    pub name: String,
    pub pos: Position,
}

/// Index access: `object[key]`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexNode {
    pub object: Expr,
    pub key: Expr,
    pub pos: Position,
}

/// Function call: `callee(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct CallNode {
    pub callee: Expr,
    pub args: Vec<Expr>,
    pub pos: Position,
}

/// Method call: `object:method(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallNode {
    pub object: Expr,
    pub method: String,
    pub args: Vec<Expr>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenNode {
    pub expr: Expr,
    pub pos: Position,
}

/// Table constructor: `{ fields }`
#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    pub fields: Vec<Field>,
    pub pos: Position,
}

/// Table constructor fields
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// `value`
    Positional { value: Expr },
    /// `name = value`
    Named { name: String, value: Expr },
    /// `[key] = value`
    Computed { key: Expr, value: Expr },
}

/// Function literal: `function(params) body end`. A trailing `...`
/// parameter is stored as a literal `"..."` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// Shared node for `#eval`, `#load` and `#repr` in expression position.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveExprNode {
    pub expr: Expr,
    pub pos: Position,
}

/// `do ... end` used as an expression
#[derive(Debug, Clone, PartialEq)]
pub struct DoExprNode {
    pub body: Vec<Stmt>,
    pub pos: Position,
}

// =============================================================================
// STATEMENTS
// =============================================================================

/// Union of all statement kinds, including directive statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Local(LocalNode),
    Assign(Box<AssignNode>),
    CompoundAssign(Box<CompoundAssignNode>),
    FunctionDecl(FunctionDeclNode),
    /// Expression-statement call or method-call statement
    Call(CallStmtNode),
    If(IfNode),
    NumericFor(Box<NumericForNode>),
    GenericFor(Box<GenericForNode>),
    Return(ReturnNode),
    Break(Position),
    Do(DoNode),
    /// `#eval expr`
    Eval(DirectiveStmtNode),
    /// `#assert expr`
    Assert(DirectiveStmtNode),
    /// `#load expr`
    Load(DirectiveStmtNode),
    /// `#debug msg, args...`
    Debug(DebugNode),
    /// `#checkcall name(params) body end`
    Checkcall(CheckcallNode),
    /// `#inline function name(params) body end`
    Inline(InlineNode),
    /// `#defer stmt`
    Defer(Box<DeferNode>),
    /// `#using prefix`
    Using(UsingNode),
    /// `#todo [msg]`
    Todo(TodoNode),
}

impl Stmt {
    /// Source position of the statement.
    pub fn position(&self) -> Position {
        match self {
            Stmt::Local(n) => n.pos,
            Stmt::Assign(n) => n.pos,
            Stmt::CompoundAssign(n) => n.pos,
            Stmt::FunctionDecl(n) => n.pos,
            Stmt::Call(n) => n.pos,
            Stmt::If(n) => n.pos,
            Stmt::NumericFor(n) => n.pos,
            Stmt::GenericFor(n) => n.pos,
            Stmt::Return(n) => n.pos,
            Stmt::Break(pos) => *pos,
            Stmt::Do(n) => n.pos,
            Stmt::Eval(n) | Stmt::Assert(n) | Stmt::Load(n) => n.pos,
            Stmt::Debug(n) => n.pos,
            Stmt::Checkcall(n) => n.pos,
            Stmt::Inline(n) => n.pos,
            Stmt::Defer(n) => n.pos,
            Stmt::Using(n) => n.pos,
            Stmt::Todo(n) => n.pos,
        }
    }
}

/// Variable declaration: `local name = value`
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNode {
    pub name: String,
    pub value: Option<Expr>,
    pub pos: Position,
}

/// Assignment: `target = value` where target is an identifier, property
/// access or index access.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignNode {
    pub target: Expr,
    pub value: Expr,
    pub pos: Position,
}

/// In-place assignment: `target op= value`
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundAssignNode {
    pub target: Expr,
    pub operator: BinaryOperator,
    pub value: Expr,
    pub pos: Position,
}

/// Function declaration: `function name(params) body end`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclNode {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// A call (or method call) in statement position.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStmtNode {
    pub call: Expr,
    pub pos: Position,
}

/// if-elseif-else statement
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<Stmt>>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

/// Numeric range for: `for var = start, end [, step] do body end`
#[derive(Debug, Clone, PartialEq)]
pub struct NumericForNode {
    pub variable: String,
    pub start: Expr,
    pub stop: Expr,
    pub step: Option<Expr>,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// Iterator for: `for names in iterator do body end`
#[derive(Debug, Clone, PartialEq)]
pub struct GenericForNode {
    pub names: Vec<String>,
    pub iterator: Expr,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// Return statement with zero or more values.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnNode {
    pub values: Vec<Expr>,
    pub pos: Position,
}

/// do-block statement
#[derive(Debug, Clone, PartialEq)]
pub struct DoNode {
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// Shared node for `#eval`, `#assert` and `#load` in statement position.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveStmtNode {
    pub expr: Expr,
    pub pos: Position,
}

/// `#debug msg, args...`
#[derive(Debug, Clone, PartialEq)]
pub struct DebugNode {
    pub format: Expr,
    pub args: Vec<Expr>,
    pub pos: Position,
}

/// `#checkcall name(params) body end`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckcallNode {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// `#inline function name(params) body end`
#[derive(Debug, Clone, PartialEq)]
pub struct InlineNode {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// `#defer stmt`
#[derive(Debug, Clone, PartialEq)]
pub struct DeferNode {
    pub stmt: Stmt,
    pub pos: Position,
}

/// `#using prefix`
#[derive(Debug, Clone, PartialEq)]
pub struct UsingNode {
    pub prefix: Expr,
    pub pos: Position,
}

/// `#todo [msg]`
#[derive(Debug, Clone, PartialEq)]
pub struct TodoNode {
    pub message: Option<String>,
    pub pos: Position,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_operator_strings() {
        assert_eq!(BinaryOperator::Concat.as_str(), "..");
        assert_eq!(BinaryOperator::NotEqual.as_str(), "~=");
        assert_eq!(BinaryOperator::Power.as_str(), "^");
    }

    #[test]
    fn test_expr_position() {
        let expr = Expr::Identifier(IdentifierNode {
            name: "x".to_string(),
            pos: Position::new(3, 7),
        });
        assert_eq!(expr.position(), Position::new(3, 7));
    }

    #[test]
    fn test_stmt_position() {
        let stmt = Stmt::Break(Position::new(12, 1));
        assert_eq!(stmt.position().line, 12);
    }
}
