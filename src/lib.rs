//! A small reactive rule language for key/value telemetry.
//!
//! Lines of `key value` data update named symbols. Rules are expressions
//! registered under a key; whenever a symbol a rule reads changes, the rule
//! runs again, and its assignments may trigger further rules.
//!
//! ```
//! use loglang::{Context, Value};
//!
//! let mut ctx = Context::new();
//! ctx.feed(":alert a > 10");
//! ctx.feed("a 11");
//! assert_eq!(ctx.program("alert").unwrap().last_result(), Some(&Value::Bool(true)));
//! ```

pub mod ast;
pub mod builtins;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod evaluator;
pub mod glob;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod program;
pub mod symbol;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, Token, TokenKind};
pub use config::Config;
pub use context::{Context, DefineError, NativeFunction};
pub use dispatcher::{RegexDispatcher, TriggerMatch};
pub use evaluator::EvalError;
pub use glob::glob_match;
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
pub use program::{Program, ProgramId};
pub use symbol::Symbol;
pub use value::Value;
