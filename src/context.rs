//! The reactive engine.
//!
//! A [`Context`] owns every symbol, every compiled program and the indexes
//! that connect them. Data enters through [`Context::feed`]; each real change
//! of a symbol runs the programs observing it, synchronously and in
//! subscription order, and those programs may change further symbols.
//!
//! ## Line protocol
//!
//! | Line | Meaning |
//! |---|---|
//! | `key value` | set `key`; `value` is a number when it looks like one |
//! | `:key expr` | define (or replace) the program `key` |
//! | `:key` | remove the program `key` |
//! | `/pattern/expr` | run `expr` on every data line matching `pattern` |
//!
//! Anything after `#` is a comment. Blank lines are ignored.

use std::collections::{BTreeMap, HashMap, btree_map::Entry};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::{
    builtins,
    config::Config,
    dispatcher::RegexDispatcher,
    evaluator::{EvalError, eval},
    glob::{glob_match, is_glob},
    output::{self, OutputSink},
    parser::ParseError,
    program::{Program, ProgramArena, ProgramId},
    symbol::{LAST_CHANGED, Symbol},
    value::Value,
};

/// A native function callable from rules.
pub type NativeFunction = Rc<dyn Fn(&mut Context, &[Value]) -> Result<Value, EvalError>>;

/// Errors raised while registering or removing programs and triggers.
#[derive(Debug, Error)]
pub enum DefineError {
    #[error("error compiling `{code}`: {error}")]
    Parse {
        code: String,
        #[source]
        error: ParseError,
    },

    #[error("invalid trigger pattern `{pattern}`: {error}")]
    Regex {
        pattern: String,
        #[source]
        error: regex::Error,
    },

    #[error("malformed trigger `{0}`, expected /pattern/expression")]
    MalformedTrigger(String),

    #[error("program definition without a key")]
    EmptyKey,

    #[error("no program registered under `{0}`")]
    UnknownProgram(String),

    #[error("definitions are not accepted from data feeds: `{0}`")]
    Untrusted(String),
}

pub struct Context {
    symbols: BTreeMap<String, Symbol>,
    programs: ProgramArena,
    registry: HashMap<String, ProgramId>,
    /// Glob dependencies, so symbols created later get subscribed too.
    glob_dependencies: Vec<(String, ProgramId)>,
    functions: HashMap<String, NativeFunction>,
    dispatcher: RegexDispatcher,
    output: OutputSink,
    config: Config,
    depth: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut ctx = Context {
            symbols: BTreeMap::new(),
            programs: ProgramArena::new(),
            registry: HashMap::new(),
            glob_dependencies: vec![],
            functions: HashMap::new(),
            dispatcher: RegexDispatcher::new(),
            output: output::console(),
            config,
            depth: 0,
        };
        if ctx.config.builtins {
            builtins::register(&mut ctx);
        }
        ctx
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the output sink used by [`Context::output`].
    pub fn set_output(&mut self, sink: impl FnMut(&str) + 'static) {
        self.output = Box::new(sink);
    }

    pub fn output(&mut self, text: &str) {
        (self.output)(text);
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        function: impl Fn(&mut Context, &[Value]) -> Result<Value, EvalError> + 'static,
    ) {
        self.functions.insert(name.into(), Rc::new(function));
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let function = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        function(self, args)
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    /// Returns the symbol `key`, creating it on first reference.
    ///
    /// A new symbol is subscribed to every program whose glob dependency
    /// matches its name, so wildcard rules registered earlier see it.
    pub fn get_value(&mut self, key: &str) -> &mut Symbol {
        match self.symbols.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut symbol = Symbol::new(key);
                for (pattern, program) in &self.glob_dependencies {
                    if glob_match(key, pattern) {
                        symbol.observe(*program);
                    }
                }
                trace!(symbol = key, observers = symbol.observers().len(), "created symbol");
                entry.insert(symbol)
            }
        }
    }

    pub fn symbol(&self, key: &str) -> Option<&Symbol> {
        self.symbols.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.symbols.get(key).and_then(Symbol::value)
    }

    /// All symbols, sorted by name.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Sets `key` and runs the cascade.
    ///
    /// Setting a value equal to the current one does nothing. Otherwise the
    /// symbol `%` is set to `key` first, then every observer of `key` runs
    /// in subscription order. Changes to `%` itself never run programs.
    pub fn set(&mut self, key: &str, value: Value) {
        let symbol = self.get_value(key);
        if !symbol.replace(value) {
            return;
        }
        trace!(symbol = key, value = ?symbol.value(), "symbol changed");
        if key == LAST_CHANGED {
            return;
        }
        let observers = symbol.observers().to_vec();

        self.set(LAST_CHANGED, Value::String(key.to_string()));

        for id in observers {
            self.notify(id);
        }
    }

    /// Values of every set symbol matching `pattern`, in name order.
    pub fn get_glob_values(&self, pattern: &str) -> Value {
        Value::List(
            self.symboltable_filter(pattern)
                .into_iter()
                .filter_map(|symbol| symbol.value().cloned())
                .collect(),
        )
    }

    /// Set symbols whose name matches `pattern`, in name order.
    pub fn symboltable_filter(&self, pattern: &str) -> Vec<&Symbol> {
        self.symbols
            .values()
            .filter(|symbol| symbol.value().is_some() && glob_match(symbol.name(), pattern))
            .collect()
    }

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    pub fn program(&self, key: &str) -> Option<&Program> {
        self.registry.get(key).and_then(|id| self.programs.get(*id))
    }

    /// Keys of the registered programs, sorted.
    pub fn program_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Compiles `source` and subscribes it under `key`, replacing any
    /// program already registered there.
    pub fn define_program(&mut self, key: &str, source: &str) -> Result<ProgramId, DefineError> {
        if key.is_empty() {
            return Err(DefineError::EmptyKey);
        }
        let program = Program::compile(key, source).map_err(|error| DefineError::Parse {
            code: source.to_string(),
            error,
        })?;

        if self.registry.contains_key(key) {
            self.remove_program(key)?;
        }

        let dependencies = program.dependencies().clone();
        let id = self.programs.insert(program);
        self.registry.insert(key.to_string(), id);

        for dependency in &dependencies {
            if is_glob(dependency) {
                for symbol in self.symbols.values_mut() {
                    if glob_match(symbol.name(), dependency) {
                        symbol.observe(id);
                    }
                }
                self.glob_dependencies.push((dependency.clone(), id));
            } else {
                self.get_value(dependency).observe(id);
            }
        }

        debug!(program = key, %id, ?dependencies, "defined program");
        Ok(id)
    }

    /// Unsubscribes and drops the program registered under `key`.
    pub fn remove_program(&mut self, key: &str) -> Result<(), DefineError> {
        let id = self
            .registry
            .remove(key)
            .ok_or_else(|| DefineError::UnknownProgram(key.to_string()))?;

        if let Some(program) = self.programs.remove(id) {
            for dependency in program.dependencies() {
                if is_glob(dependency) {
                    for symbol in self.symbols.values_mut() {
                        if glob_match(symbol.name(), dependency) {
                            symbol.unobserve(id);
                        }
                    }
                } else if let Some(symbol) = self.symbols.get_mut(dependency) {
                    symbol.unobserve(id);
                }
            }
        }
        self.glob_dependencies.retain(|(_, program)| *program != id);

        debug!(program = key, %id, "removed program");
        Ok(())
    }

    /// Compiles `source` as an anonymous program fired by lines matching
    /// `pattern`.
    pub fn define_trigger(&mut self, pattern: &str, source: &str) -> Result<ProgramId, DefineError> {
        let program =
            Program::compile(format!("/{}/", pattern), source).map_err(|error| DefineError::Parse {
                code: source.to_string(),
                error,
            })?;

        let id = self.programs.insert(program);
        if let Err(error) = self.dispatcher.add(pattern, id) {
            self.programs.remove(id);
            return Err(DefineError::Regex {
                pattern: pattern.to_string(),
                error,
            });
        }

        debug!(pattern, %id, "defined trigger");
        Ok(id)
    }

    pub fn dispatcher(&self) -> &RegexDispatcher {
        &self.dispatcher
    }

    /// Evaluates a program once and records its result.
    ///
    /// Refused with [`EvalError::CascadeDepthExceeded`] when too many runs
    /// are already nested. A removed program evaluates to the neutral value.
    pub fn run_program(&mut self, id: ProgramId) -> Result<Value, EvalError> {
        let Some(program) = self.programs.get(id) else {
            return Ok(Value::neutral());
        };
        if let Some(limit) = self.config.max_cascade_depth
            && self.depth >= limit
        {
            return Err(EvalError::CascadeDepthExceeded(limit));
        }

        let ast = program.ast();
        trace!(program = program.key(), depth = self.depth, "running program");

        self.depth += 1;
        let result = eval(&ast, self);
        self.depth -= 1;

        let value = result?;
        if let Some(program) = self.programs.get_mut(id) {
            program.record_result(value.clone());
        }
        Ok(value)
    }

    /// Runs an observer; failures are logged and do not stop the cascade.
    fn notify(&mut self, id: ProgramId) {
        if let Err(err) = self.run_program(id) {
            let key = self.programs.get(id).map(Program::key).unwrap_or_default();
            error!(program = key, error = %err, "error running program");
        }
    }

    // ------------------------------------------------------------------
    // Feeding
    // ------------------------------------------------------------------

    /// Processes one line of the full protocol, definitions included.
    ///
    /// A definition that fails to compile is logged and skipped; the context
    /// is left as it was.
    pub fn feed(&mut self, line: &str) {
        if let Err(err) = self.try_feed(line) {
            warn!(line = clean_line(line), error = %err, "definition rejected");
        }
    }

    /// Like [`Context::feed`], but hands a rejected definition back to the
    /// caller instead of logging it.
    pub fn try_feed(&mut self, line: &str) -> Result<(), DefineError> {
        let line = clean_line(line);
        if line.is_empty() {
            return Ok(());
        }

        if let Some(definition) = line.strip_prefix(':') {
            self.feed_definition(definition)
        } else if let Some(trigger) = line.strip_prefix('/') {
            self.feed_trigger(trigger)
        } else {
            self.feed_line(line);
            Ok(())
        }
    }

    /// Processes one line from an untrusted source: data only.
    pub fn feed_data(&mut self, line: &str) {
        let line = clean_line(line);
        if line.is_empty() {
            return;
        }
        if line.starts_with([':', '/']) {
            let err = DefineError::Untrusted(line.to_string());
            warn!(line, error = %err, "definition rejected");
            return;
        }
        self.feed_line(line);
    }

    fn feed_definition(&mut self, definition: &str) -> Result<(), DefineError> {
        match definition.split_once(char::is_whitespace) {
            Some((key, source)) if !source.trim().is_empty() => {
                self.define_program(key, source.trim()).map(|_| ())
            }
            Some((key, _)) => self.remove_program(key),
            None => self.remove_program(definition),
        }
    }

    fn feed_trigger(&mut self, body: &str) -> Result<(), DefineError> {
        match split_trigger(body) {
            Some((pattern, source)) if !pattern.is_empty() && !source.trim().is_empty() => {
                self.define_trigger(pattern, source.trim()).map(|_| ())
            }
            _ => Err(DefineError::MalformedTrigger(format!("/{}", body))),
        }
    }

    /// A data line: regex triggers first, then `key value`.
    fn feed_line(&mut self, line: &str) {
        if let Some(found) = self.dispatcher.match_line(line) {
            for (name, value) in found.bindings {
                self.set(&name, value);
            }
            self.notify(found.program);
            return;
        }

        match line.split_once(char::is_whitespace) {
            Some((key, value)) => self.set(key, Value::parse_scalar(value.trim())),
            None => warn!(line, "data line without a value ignored"),
        }
    }
}

/// Strips a trailing `#` comment and surrounding whitespace.
fn clean_line(line: &str) -> &str {
    let line = match line.find('#') {
        Some(comment) => &line[..comment],
        None => line,
    };
    line.trim()
}

/// Splits `pattern/expression` at the first `/` not escaped by a backslash.
fn split_trigger(body: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, ch) in body.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '/' => return Some((&body[..i], &body[i + 1..])),
            _ => {}
        }
    }
    None
}

#[test]
fn test_clean_line() {
    assert_eq!(clean_line("  cpu.0 5  # load"), "cpu.0 5");
    assert_eq!(clean_line("# only a comment"), "");
    assert_eq!(clean_line(""), "");
}

#[test]
fn test_split_trigger() {
    assert_eq!(
        split_trigger(r"GET (\d+)/hits = .1"),
        Some((r"GET (\d+)", "hits = .1"))
    );
    assert_eq!(
        split_trigger(r"a\/b/x = 1"),
        Some((r"a\/b", "x = 1"))
    );
    assert_eq!(split_trigger("no terminator"), None);
}
