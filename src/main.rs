use clap::{Parser as ClapParser, Subcommand};
use loglang::cli::{self, CheckOptions, CheckResult, CliError, RunOptions};
use loglang::{Config, output};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(ClapParser)]
#[command(name = "loglang")]
#[command(about = "loglang - reactive rules over key/value telemetry lines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load rule files, then feed stdin line by line
    Run {
        /// Rule files (`:key expr`, `/regex/expr` and data lines)
        rules: Vec<PathBuf>,

        /// Maximum number of nested rule runs in one cascade
        #[arg(long, default_value_t = Config::DEFAULT_MAX_CASCADE_DEPTH)]
        max_depth: usize,

        /// Disable the cascade depth limit
        #[arg(long, conflicts_with = "max_depth")]
        unlimited_depth: bool,

        /// Do not register the builtin functions
        #[arg(long)]
        no_builtins: bool,

        /// Accept rule definitions from stdin (implied when stdin is a terminal)
        #[arg(long)]
        trust_stdin: bool,

        /// Print the symbol table when input ends
        #[arg(long)]
        dump: bool,

        /// Print symbols and rules as JSON when input ends
        #[arg(long)]
        json: bool,
    },

    /// Validate a rule expression, or evaluate it against data lines
    Check {
        /// The rule expression
        expression: String,

        /// Data line fed before evaluating (repeatable), e.g. `--data "a 4"`
        #[arg(short, long)]
        data: Vec<String>,

        /// Only validate syntax and show the parsed tree
        #[arg(long)]
        syntax_only: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            rules,
            max_depth,
            unlimited_depth,
            no_builtins,
            trust_stdin,
            dump,
            json,
        } => {
            let config = Config::default()
                .with_max_cascade_depth((!unlimited_depth).then_some(max_depth))
                .with_builtins(!no_builtins);
            let options = RunOptions {
                rules,
                trust_input: trust_stdin || atty::is(atty::Stream::Stdin),
                config,
            };
            run(&options, dump, json)
        }
        Commands::Check {
            expression,
            data,
            syntax_only,
            pretty,
        } => check(expression, data, syntax_only, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(options: &RunOptions, dump: bool, json: bool) -> Result<(), CliError> {
    let ctx = cli::execute_run(options, io::stdin().lock())?;

    if dump {
        for line in output::dump_lines(&ctx) {
            println!("{}", line);
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&output::snapshot_json(&ctx))?);
    }
    Ok(())
}

fn check(
    expression: String,
    data: Vec<String>,
    syntax_only: bool,
    pretty: bool,
) -> Result<(), CliError> {
    let options = CheckOptions {
        expression,
        data,
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid { tree, dependencies } => {
            println!("Syntax is valid");
            println!("tree: {}", tree);
            println!("dependencies: {}", dependencies.join(", "));
        }
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
