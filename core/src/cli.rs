use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::interpreter::executor::Val;
use crate::interpreter::parser;
use crate::interpreter::runner::Runner;

#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "Stepwise - a line-stepping workflow script interpreter", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script and print its final globals as JSON
    Run {
        /// Script to run
        file: PathBuf,

        /// Seed a global before the run (value parsed as JSON, else a string)
        #[arg(short = 'i', long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,

        /// Print every step marker
        #[arg(long)]
        trace: bool,

        /// Print the visible variables before this line runs
        #[arg(short = 'b', long = "break", value_name = "LINE")]
        breakpoints: Vec<usize>,

        /// Directory searched for included modules
        #[arg(long)]
        include_dir: Option<PathBuf>,

        /// JSON file of canned remote call responses
        #[arg(long)]
        mock: Option<PathBuf>,

        /// Seconds between retry attempts
        #[arg(long)]
        retry_delay: Option<f64>,
    },

    /// Lex, parse and link a script without running it
    Check {
        /// Script to check
        file: PathBuf,
    },

    /// Print the parsed program as JSON
    Ast {
        /// Script to parse
        file: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

/// Internal function that handles CLI commands
fn run_cli_with_args(cli: Cli) -> Result<()> {
    let mut builder = Config::builder().config_path(cli.config.map(PathBuf::from));
    if let Commands::Run {
        include_dir,
        mock,
        retry_delay,
        ..
    } = &cli.command
    {
        builder = builder
            .include_dir(include_dir.clone())
            .mock_file(mock.clone())
            .retry_delay_secs(*retry_delay);
    }

    // Load and validate configuration before executing any command
    let config = builder.build().context("Failed to load configuration")?;
    init_tracing(&config.log.level);

    match cli.command {
        Commands::Run {
            file,
            inputs,
            trace,
            breakpoints,
            ..
        } => {
            let runner = Runner::from_file(&file, &config)?;
            let inputs = parse_inputs(&inputs)?;

            if trace || !breakpoints.is_empty() {
                run_stepping(&runner, inputs, trace, &breakpoints)?;
            } else {
                let report = runner.run(inputs)?;
                tracing::debug!(execution_id = %report.execution_id, steps = report.steps, "run complete");
                let globals = Val::Obj(report.globals).to_json();
                println!("{}", serde_json::to_string_pretty(&globals)?);
            }
        }

        Commands::Check { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read script {}", file.display()))?;
            let functions = check_source(&file.display().to_string(), &source)?;
            println!("✓ {} ({} function(s))", file.display(), functions);
        }

        Commands::Ast { file } => {
            let runner = Runner::from_file(&file, &config)?;
            println!("{}", serde_json::to_string_pretty(runner.program())?);
        }
    }

    Ok(())
}

/// Drive the program marker by marker for `--trace` and `--break`
fn run_stepping(
    runner: &Runner,
    inputs: HashMap<String, Val>,
    trace: bool,
    breakpoints: &[usize],
) -> Result<()> {
    let mut scope = runner.new_scope(inputs);
    let mut vm = runner.steps(&mut scope);

    while let Some(item) = vm.next() {
        let marker = item?;
        if trace {
            match &marker.value {
                Some(value) => eprintln!(
                    "[{:>4}] -> {:<4} {}",
                    marker.line,
                    marker.next_line,
                    value.to_json()
                ),
                None => eprintln!("[{:>4}] -> {}", marker.line, marker.next_line),
            }
        }
        if breakpoints.contains(&marker.next_line) {
            let visible: std::collections::BTreeMap<_, _> = vm.scope.visible().into_iter().collect();
            eprintln!("break at line {}:", marker.next_line);
            eprintln!("{}", serde_json::to_string_pretty(&Val::Obj(visible).to_json())?);
        }
    }
    drop(vm);

    let globals = Val::Obj(scope.globals().clone().into_iter().collect()).to_json();
    println!("{}", serde_json::to_string_pretty(&globals)?);
    Ok(())
}

/// Print every error in the source; succeeds with the number of functions
/// declared when there are none
fn check_source(name: &str, source: &str) -> Result<usize> {
    let errors = parser::check(name, source);
    if !errors.is_empty() {
        for err in &errors {
            eprintln!("{}: {}", name, err);
        }
        bail!("{} error(s) in {}", errors.len(), name);
    }
    let program = parser::load(name, source)?;
    Ok(program.symbols.names().count())
}

fn parse_inputs(raw: &[String]) -> Result<HashMap<String, Val>> {
    raw.iter().map(|item| parse_input(item)).collect()
}

/// `KEY=VALUE`, where VALUE is JSON or else taken as a plain string
fn parse_input(raw: &str) -> Result<(String, Val)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid input '{}': expected KEY=VALUE", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid input '{}': empty key", raw);
    }
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(json) => Val::from_json(&json),
        Err(_) => Val::Str(value.to_string()),
    };
    Ok((key.to_string(), value))
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    // Log to stderr so stdout stays clean for JSON output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_json_and_string() {
        assert_eq!(parse_input("n=3").unwrap(), ("n".to_string(), Val::Int(3)));
        assert_eq!(
            parse_input("flags=[true, false]").unwrap(),
            (
                "flags".to_string(),
                Val::List(vec![Val::Bool(true), Val::Bool(false)])
            )
        );
        assert_eq!(
            parse_input("name=acme corp").unwrap(),
            ("name".to_string(), Val::Str("acme corp".to_string()))
        );
        assert_eq!(
            parse_input("expr=a=b").unwrap(),
            ("expr".to_string(), Val::Str("a=b".to_string()))
        );
    }

    #[test]
    fn test_check_source_counts_every_error() {
        let err = check_source("flow.wf", "x = ;\ny = (;\nz = 1;").unwrap_err();
        assert_eq!(err.to_string(), "2 error(s) in flow.wf");

        let functions = check_source("flow.wf", "function f() {}\nfunction g(a) {}").unwrap();
        assert_eq!(functions, 2);
    }

    #[test]
    fn test_parse_input_rejects_missing_key() {
        assert!(parse_input("novalue").is_err());
        assert!(parse_input("=1").is_err());
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "stepwise", "run", "flow.wf", "-i", "a=1", "--input", "b=x", "--trace", "--break",
            "4", "-b", "9", "--retry-delay", "0.5", "--config", "ci.toml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("ci.toml"));
        match cli.command {
            Commands::Run {
                file,
                inputs,
                trace,
                breakpoints,
                retry_delay,
                mock,
                ..
            } => {
                assert_eq!(file, PathBuf::from("flow.wf"));
                assert_eq!(inputs, vec!["a=1".to_string(), "b=x".to_string()]);
                assert!(trace);
                assert_eq!(breakpoints, vec![4, 9]);
                assert_eq!(retry_delay, Some(0.5));
                assert_eq!(mock, None);
            }
            _ => panic!("expected run"),
        }
    }
}
