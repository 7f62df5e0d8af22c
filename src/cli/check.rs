//! Compile a rule expression and optionally evaluate it against data lines

use super::CliError;
use crate::{Context, Lexer, Parser, evaluator::eval, output::value_to_json};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The rule expression to check
    pub expression: String,
    /// Data lines (`key value`) fed to a fresh context before evaluating
    pub data: Vec<String>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid {
        /// Parenthesized rendering of the parsed tree
        tree: String,
        /// Symbols and patterns the rule would observe
        dependencies: Vec<String>,
    },
    /// Expression evaluated successfully
    Success(serde_json::Value),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let lexer = Lexer::new(&options.expression);
    let expr = Parser::new(lexer).parse()?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid {
            tree: expr.describe(),
            dependencies: expr.dependencies().into_iter().collect(),
        });
    }

    let mut ctx = Context::new();
    for line in &options.data {
        ctx.feed_data(line);
    }
    let value = eval(&expr, &mut ctx)?;
    Ok(CheckResult::Success(value_to_json(&value)))
}
