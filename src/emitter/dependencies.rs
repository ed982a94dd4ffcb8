//! Dependency Tracker
//!
//! For any AST node, produce the transitive definitions of every
//! identifier referenced in it, in declaration order, as indices into
//! the environment's binding log. The replay makes each identifier
//! defined in a generated compile-time program.
//!
//! Each entry's own dependencies are resolved against the log prefix
//! that preceded it, which keeps self-referencing reassignments
//! (`x = x + 1`) and recursive functions from looping. Entries are
//! emitted once even when referenced repeatedly.

use crate::ast::types::*;
use crate::emitter::context::Env;

/// Collect the replay chain for an expression. Active `#using`
/// prefixes are replayed too: the emitted reference chains read them.
pub fn collect_expr(expr: &Expr, env: &Env) -> Vec<usize> {
    let mut names = Vec::new();
    for prefix in &env.usings {
        expr_references(prefix, &mut names);
    }
    expr_references(expr, &mut names);
    let mut out = Vec::new();
    for name in names {
        resolve(&name, env.bindings.len(), env, &mut out);
    }
    out
}

/// Append every log entry for `name` below `limit`, each preceded by
/// its own dependency chain.
fn resolve(name: &str, limit: usize, env: &Env, out: &mut Vec<usize>) {
    for index in 0..limit.min(env.bindings.len()) {
        let binding = &env.bindings[index];
        if binding.name != name || out.contains(&index) {
            continue;
        }
        let mut inner = Vec::new();
        stmt_references(&binding.stmt, &mut inner);
        for dep in inner {
            resolve(&dep, index, env, out);
        }
        if !out.contains(&index) {
            out.push(index);
        }
    }
}

/// Record the identifiers an expression reads, in source order.
pub fn expr_references(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Identifier(n) => out.push(n.name.clone()),
        Expr::Unary(n) => expr_references(&n.operand, out),
        Expr::Binary(n) => {
            expr_references(&n.left, out);
            expr_references(&n.right, out);
        }
        Expr::Property(n) => expr_references(&n.object, out),
        Expr::Index(n) => {
            expr_references(&n.object, out);
            expr_references(&n.key, out);
        }
        Expr::Call(n) => {
            expr_references(&n.callee, out);
            for arg in &n.args {
                expr_references(arg, out);
            }
        }
        Expr::MethodCall(n) => {
            expr_references(&n.object, out);
            for arg in &n.args {
                expr_references(arg, out);
            }
        }
        Expr::Paren(n) => expr_references(&n.expr, out),
        Expr::Table(n) => {
            for field in &n.fields {
                match field {
                    Field::Positional { value } | Field::Named { value, .. } => {
                        expr_references(value, out);
                    }
                    Field::Computed { key, value } => {
                        expr_references(key, out);
                        expr_references(value, out);
                    }
                }
            }
        }
        Expr::Function(n) => {
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Expr::Eval(n) | Expr::Load(n) | Expr::Repr(n) => expr_references(&n.expr, out),
        Expr::DoExpr(n) => {
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Nil(_) | Expr::Varargs(_) => {}
    }
}

/// Record the identifiers a statement reads. Declared names are not
/// references; reassignment targets count as reads only for in-place
/// forms, which read their own left-hand side.
pub fn stmt_references(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Local(n) => {
            if let Some(value) = &n.value {
                expr_references(value, out);
            }
        }
        Stmt::Assign(n) => {
            // An identifier target is a write, not a read; property and
            // index targets still read their object chain.
            match &n.target {
                Expr::Identifier(_) => {}
                other => expr_references(other, out),
            }
            expr_references(&n.value, out);
        }
        Stmt::CompoundAssign(n) => {
            expr_references(&n.target, out);
            expr_references(&n.value, out);
        }
        Stmt::FunctionDecl(n) => {
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Stmt::Call(n) => expr_references(&n.call, out),
        Stmt::If(n) => {
            for clause in &n.clauses {
                expr_references(&clause.condition, out);
                for stmt in &clause.body {
                    stmt_references(stmt, out);
                }
            }
            if let Some(body) = &n.else_body {
                for stmt in body {
                    stmt_references(stmt, out);
                }
            }
        }
        Stmt::NumericFor(n) => {
            expr_references(&n.start, out);
            expr_references(&n.stop, out);
            if let Some(step) = &n.step {
                expr_references(step, out);
            }
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Stmt::GenericFor(n) => {
            expr_references(&n.iterator, out);
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Stmt::Return(n) => {
            for value in &n.values {
                expr_references(value, out);
            }
        }
        Stmt::Do(n) => {
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Stmt::Eval(n) | Stmt::Assert(n) | Stmt::Load(n) => expr_references(&n.expr, out),
        Stmt::Debug(n) => {
            expr_references(&n.format, out);
            for arg in &n.args {
                expr_references(arg, out);
            }
        }
        Stmt::Checkcall(n) => {
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Stmt::Inline(n) => {
            for stmt in &n.body {
                stmt_references(stmt, out);
            }
        }
        Stmt::Defer(n) => stmt_references(&n.stmt, out),
        Stmt::Using(n) => expr_references(&n.prefix, out),
        Stmt::Break(_) | Stmt::Todo(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::context::{BindingKind, Env};
    use crate::parser::parse;

    /// Build an environment from source by logging every top-level
    /// declaration and assignment.
    fn env_from(source: &str) -> Env {
        let mut env = Env::new();
        for stmt in parse(source).unwrap() {
            match &stmt {
                Stmt::Local(n) => {
                    let name = n.name.clone();
                    env.declare(&name, BindingKind::Local, stmt.clone());
                }
                Stmt::FunctionDecl(n) => {
                    let name = n.name.clone();
                    env.declare(&name, BindingKind::Function, stmt.clone());
                }
                Stmt::Assign(n) => {
                    if let Expr::Identifier(id) = &n.target {
                        let name = id.name.clone();
                        env.declare(&name, BindingKind::Assign, stmt.clone());
                    }
                }
                _ => {}
            }
        }
        env
    }

    fn chain(env: &Env, expr_source: &str) -> Vec<usize> {
        let expr = crate::parser::parse_expression(expr_source).unwrap();
        collect_expr(&expr, env)
    }

    #[test]
    fn test_single_dependency() {
        let env = env_from("local a = 1");
        assert_eq!(chain(&env, "a + 1"), vec![0]);
    }

    #[test]
    fn test_transitive_in_declaration_order() {
        let env = env_from("local a = 1\nlocal b = a + 1\nlocal c = b * 2");
        assert_eq!(chain(&env, "c"), vec![0, 1, 2]);
    }

    #[test]
    fn test_reassignment_replays_definition_then_assignment() {
        let env = env_from("local x = 1\nx = 2");
        assert_eq!(chain(&env, "x"), vec![0, 1]);
    }

    #[test]
    fn test_self_reference_terminates() {
        let env = env_from("local x = 1\nx = x + 1");
        assert_eq!(chain(&env, "x"), vec![0, 1]);
    }

    #[test]
    fn test_recursive_function() {
        let env = env_from("function fib(n) if n < 2 then return n end return fib(n - 1) + fib(n - 2) end");
        assert_eq!(chain(&env, "fib(10)"), vec![0]);
    }

    #[test]
    fn test_duplicate_references_emitted_once() {
        let env = env_from("local a = 1\nlocal b = a + a");
        assert_eq!(chain(&env, "b + a"), vec![0, 1]);
    }

    #[test]
    fn test_unresolved_reference_is_skipped() {
        let env = env_from("local a = 1");
        assert_eq!(chain(&env, "print(z)"), Vec::<usize>::new());
    }

    #[test]
    fn test_function_body_references() {
        let env = env_from("local base = 10\nfunction scale(v) return v * base end");
        assert_eq!(chain(&env, "scale(2)"), vec![0, 1]);
    }
}
