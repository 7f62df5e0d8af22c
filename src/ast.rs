//! # Loglang - Abstract Syntax Tree
//!
//! This module defines the tokens and the expression tree of the rule
//! language. A rule is registered once and re-evaluated whenever one of the
//! symbols it reads changes.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (constants, references, operations,
//!   special forms)
//! - **[operators]** - Binary operators (comparison, arithmetic, logical)
//!
//! ## Quick Start
//!
//! ```text
//! :alert edge_if cpu.0 > 90 then print("cpu.*") else 0
//! ```
//!
//! Registers a rule under the key `alert` that depends on `cpu.0` and prints
//! every `cpu.*` symbol each time the load crosses 90 upwards.
//!
//! ## Core Concepts
//!
//! ### Dependencies
//!
//! Every symbol read by a rule is a dependency, computed once from the tree
//! shape ([`Expr::dependencies`]). Assignment targets are not dependencies.
//! The stateful forms only depend on their condition, so their branches can
//! read other symbols without triggering the rule.
//!
//! ### Glob references
//!
//! A variable containing `*` or `?` (`cpu.*`, `disk?`) reads every matching
//! symbol and evaluates to a list. As a dependency it also subscribes the
//! rule to symbols created after it was registered.
//!
//! ### Stateful forms
//!
//! - `edge_if C then A else B` fires `A` or `B` only when `C` flips.
//! - `at X do Y` fires `Y` only when the value of `X` changes.
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use operators::BinOp;
pub use tokens::{Token, TokenKind};
