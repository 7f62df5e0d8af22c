//! Load rule files, then stream data lines through a context

use std::fs;
use std::io::BufRead;
use std::path::PathBuf;

use tracing::debug;

use super::CliError;
use crate::{Config, Context};

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Rule files, read in order before any input
    pub rules: Vec<PathBuf>,
    /// Accept definitions from the input stream as well as data
    pub trust_input: bool,
    pub config: Config,
}

/// Builds a context from the rule files and feeds it every input line.
///
/// Rule files are trusted and must define cleanly; the first bad line
/// aborts with its location. Input lines are data only unless
/// `trust_input` is set, and bad input lines are logged and skipped.
pub fn execute_run(options: &RunOptions, input: impl BufRead) -> Result<Context, CliError> {
    let mut ctx = Context::with_config(options.config.clone());

    for path in &options.rules {
        let source = fs::read_to_string(path)?;
        for (i, line) in source.lines().enumerate() {
            ctx.try_feed(line).map_err(|error| CliError::Define {
                path: path.clone(),
                line: i + 1,
                error,
            })?;
        }
        debug!(path = %path.display(), "loaded rule file");
    }

    for line in input.lines() {
        let line = line?;
        if options.trust_input {
            ctx.feed(&line);
        } else {
            ctx.feed_data(&line);
        }
    }

    Ok(ctx)
}
