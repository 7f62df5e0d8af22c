use crate::{program::ProgramId, value::Value};

/// Name of the symbol that always holds the name of the last changed symbol.
pub const LAST_CHANGED: &str = "%";

/// A named reactive cell.
///
/// The cascade itself lives in [`Context::set`](crate::Context::set); a
/// symbol only stores its value and the programs observing it.
#[derive(Debug, Clone)]
pub struct Symbol {
    name: String,
    value: Option<Value>,
    observers: Vec<ProgramId>,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol {
            name: name.into(),
            value: None,
            observers: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value, `None` until first set.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Stores `value` unless it equals the current one. Returns whether the
    /// symbol changed.
    pub fn replace(&mut self, value: Value) -> bool {
        if self.value.as_ref() == Some(&value) {
            return false;
        }
        self.value = Some(value);
        true
    }

    /// Observers in subscription order.
    pub fn observers(&self) -> &[ProgramId] {
        &self.observers
    }

    /// Subscribes a program; subscribing twice has no effect.
    pub fn observe(&mut self, program: ProgramId) {
        if !self.observers.contains(&program) {
            self.observers.push(program);
        }
    }

    pub fn unobserve(&mut self, program: ProgramId) {
        self.observers.retain(|id| *id != program);
    }
}
