//! Pattern triggers tried against raw data lines.
//!
//! Triggers are tried in registration order and the first match wins. A
//! match yields the capture bindings and the program to run; applying them
//! is left to the [`Context`](crate::Context), which owns the symbols.

use regex::Regex;

use crate::{program::ProgramId, value::Value};

/// A compiled pattern and the program it fires.
#[derive(Debug, Clone)]
pub struct Trigger {
    regex: Regex,
    program: ProgramId,
}

impl Trigger {
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerMatch {
    /// Symbol bindings in the order they are applied: positional groups as
    /// `.0`, `.1`, ... first, then named groups.
    pub bindings: Vec<(String, Value)>,
    pub program: ProgramId,
}

#[derive(Debug, Clone, Default)]
pub struct RegexDispatcher {
    triggers: Vec<Trigger>,
}

impl RegexDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `pattern` and appends it to the trial order.
    pub fn add(&mut self, pattern: &str, program: ProgramId) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.triggers.push(Trigger { regex, program });
        Ok(())
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Finds the first trigger matching `line` and collects its captures.
    ///
    /// Groups that did not participate in the match are not bound. Captured
    /// text that looks like a number is bound as a number.
    pub fn match_line(&self, line: &str) -> Option<TriggerMatch> {
        self.triggers.iter().find_map(|trigger| {
            let caps = trigger.regex.captures(line)?;

            let mut bindings: Vec<(String, Value)> = caps
                .iter()
                .enumerate()
                .filter_map(|(i, group)| {
                    group.map(|m| (format!(".{}", i), Value::parse_scalar(m.as_str())))
                })
                .collect();

            for name in trigger.regex.capture_names().flatten() {
                if let Some(m) = caps.name(name) {
                    bindings.push((name.to_string(), Value::parse_scalar(m.as_str())));
                }
            }

            Some(TriggerMatch {
                bindings,
                program: trigger.program,
            })
        })
    }
}
