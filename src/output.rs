//! Where rule output goes, and JSON renderings of a context.
//!
//! Rules write through the sink installed on the [`Context`]; by default that
//! is stdout. [`snapshot_json`] renders the symbol table and the registered
//! programs for dumps and for embedding hosts.
//!
//! # Examples
//!
//! ```
//! use loglang::Context;
//! use loglang::output::snapshot_json;
//!
//! let mut ctx = Context::new();
//! ctx.feed("cpu.0 12");
//! ctx.feed(":hot cpu.0 > 10");
//!
//! let snapshot = snapshot_json(&ctx);
//! assert_eq!(snapshot["symbols"]["cpu.0"], 12);
//! assert_eq!(snapshot["programs"]["hot"]["source"], "cpu.0 > 10");
//! ```

use serde_json::{Map, json};

use crate::{context::Context, symbol::LAST_CHANGED, value::Value};

/// Receives one line of rule output at a time.
pub type OutputSink = Box<dyn FnMut(&str)>;

/// Sink printing each line to stdout.
pub fn console() -> OutputSink {
    Box::new(|line| println!("{}", line))
}

/// Converts a value to JSON. Non-finite doubles become `null`.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Double(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
    }
}

/// Renders every set symbol and every registered program.
///
/// Symbols appear under `symbols` by name, `%` excluded. Programs appear
/// under `programs` by key with their source, dependencies and last result.
pub fn snapshot_json(ctx: &Context) -> serde_json::Value {
    let symbols: Map<String, serde_json::Value> = ctx
        .symbols()
        .filter(|symbol| symbol.name() != LAST_CHANGED)
        .filter_map(|symbol| {
            symbol
                .value()
                .map(|value| (symbol.name().to_string(), value_to_json(value)))
        })
        .collect();

    let programs: Map<String, serde_json::Value> = ctx
        .program_keys()
        .into_iter()
        .filter_map(|key| ctx.program(key).map(|program| (key, program)))
        .map(|(key, program)| {
            (
                key.to_string(),
                json!({
                    "source": program.source(),
                    "dependencies": program.dependencies(),
                    "last_result": program.last_result().map(value_to_json),
                }),
            )
        })
        .collect();

    json!({ "symbols": symbols, "programs": programs })
}

/// Renders the symbol table as `name value` lines, sorted by name.
pub fn dump_lines(ctx: &Context) -> Vec<String> {
    ctx.symbols()
        .filter(|symbol| symbol.name() != LAST_CHANGED)
        .filter_map(|symbol| {
            symbol
                .value()
                .map(|value| format!("{} {}", symbol.name(), value))
        })
        .collect()
}
