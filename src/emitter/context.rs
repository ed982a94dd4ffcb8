//! Compilation Context
//!
//! The mutable environment threaded through every emit step. Scope
//! entry points (function body, do-block, do-as-expression) snapshot
//! the cloneable buckets (bindings, defer queue, using stack) and
//! restore them on exit. The inline and checked-call registries are
//! scope-global and flat: a name stays registered until a binding with
//! the same name is introduced.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::types::{Expr, Stmt};

/// How a name entered the binding log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `local name = ...`
    Local,
    /// `function name(...) ... end`
    Function,
    /// Reassignment of an existing name
    Assign,
}

/// One entry in the ordered binding log. Declarations and reassignments
/// share the log, tagged by kind, so a dependency replay walks a single
/// insertion-ordered sequence.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub stmt: Stmt,
}

/// A registered `#inline` definition.
#[derive(Debug, Clone)]
pub struct InlineDef {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// A registered `#checkcall` validator.
#[derive(Debug, Clone)]
pub struct CheckcallDef {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// Snapshot for a do-block or do-as-expression scope.
#[derive(Debug, Clone, Copy)]
pub struct BlockScope {
    pub bindings: usize,
    pub defers: usize,
    pub usings: usize,
}

/// Snapshot for a function-body scope. A function body is a fresh
/// defer domain: the enclosing queue is parked and restored on exit.
#[derive(Debug, Clone)]
pub struct FunctionScope {
    pub bindings: usize,
    pub usings: usize,
    pub saved_defers: Vec<Stmt>,
}

/// The compilation environment.
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// Ordered (name, defining statement) log: declarations and
    /// reassignments in insertion order.
    pub bindings: Vec<Binding>,
    /// Statements hoisted to run at the exit of the enclosing scope.
    pub defers: Vec<Stmt>,
    /// Namespace prefixes introduced by `#using`, innermost last.
    pub usings: Vec<Expr>,
    /// Registered `#inline` functions.
    pub inlines: IndexMap<String, InlineDef>,
    /// Registered `#checkcall` validators.
    pub checkcalls: IndexMap<String, CheckcallDef>,
    /// Inline-parameter substitution, active only during expansion.
    pub substitutions: HashMap<String, Expr>,
    /// Whether emitted statements carry `--LINE:<n>` markers.
    pub line_info: bool,
}

impl Env {
    pub fn new() -> Self {
        Self {
            line_info: true,
            ..Default::default()
        }
    }

    /// Record a declaration or reassignment. Introducing a binding
    /// deregisters any inline or checked call of the same name; a
    /// fresh `local` also shadows an active parameter substitution.
    pub fn declare(&mut self, name: &str, kind: BindingKind, stmt: Stmt) {
        self.inlines.shift_remove(name);
        self.checkcalls.shift_remove(name);
        if kind != BindingKind::Assign {
            self.substitutions.remove(name);
        }
        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            stmt,
        });
    }

    pub fn enter_block(&mut self) -> BlockScope {
        BlockScope {
            bindings: self.bindings.len(),
            defers: self.defers.len(),
            usings: self.usings.len(),
        }
    }

    pub fn exit_block(&mut self, scope: BlockScope) {
        self.bindings.truncate(scope.bindings);
        self.defers.truncate(scope.defers);
        self.usings.truncate(scope.usings);
    }

    pub fn enter_function(&mut self) -> FunctionScope {
        FunctionScope {
            bindings: self.bindings.len(),
            usings: self.usings.len(),
            saved_defers: std::mem::take(&mut self.defers),
        }
    }

    pub fn exit_function(&mut self, scope: FunctionScope) {
        self.bindings.truncate(scope.bindings);
        self.usings.truncate(scope.usings);
        self.defers = scope.saved_defers;
    }
}
