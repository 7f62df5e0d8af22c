//! Compiled rules and the arena that owns them.
//!
//! Symbols refer to programs by [`ProgramId`]. Removing a program leaves a
//! tombstone in its slot, so stale handles still held by an in-flight
//! cascade resolve to nothing instead of to a different program.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::{
    ast::Expr,
    parser::{ParseError, parse_program},
    value::Value,
};

/// Stable handle to a program slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(usize);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A rule compiled from source, with its static dependency set.
#[derive(Debug)]
pub struct Program {
    key: String,
    source: String,
    ast: Rc<Expr>,
    dependencies: BTreeSet<String>,
    last_result: Option<Value>,
}

impl Program {
    /// Parses `source`; nothing is created if it does not compile.
    pub fn compile(key: impl Into<String>, source: impl Into<String>) -> Result<Self, ParseError> {
        let source = source.into();
        let ast = parse_program(&source)?;
        let dependencies = ast.dependencies();

        Ok(Program {
            key: key.into(),
            source,
            ast: Rc::new(ast),
            dependencies,
            last_result: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Shared handle to the tree, so it can be evaluated while the arena is
    /// borrowed mutably by the cascade.
    pub fn ast(&self) -> Rc<Expr> {
        Rc::clone(&self.ast)
    }

    /// Symbol names and glob patterns the program reacts to.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Value of the most recent successful run.
    pub fn last_result(&self) -> Option<&Value> {
        self.last_result.as_ref()
    }

    pub(crate) fn record_result(&mut self, value: Value) {
        self.last_result = Some(value);
    }
}

/// Owner of every program, addressed by [`ProgramId`].
#[derive(Debug, Default)]
pub struct ProgramArena {
    slots: Vec<Option<Program>>,
}

impl ProgramArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, program: Program) -> ProgramId {
        self.slots.push(Some(program));
        ProgramId(self.slots.len() - 1)
    }

    pub fn get(&self, id: ProgramId) -> Option<&Program> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ProgramId) -> Option<&mut Program> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Tombstones the slot and hands back the program.
    pub fn remove(&mut self, id: ProgramId) -> Option<Program> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }
}
