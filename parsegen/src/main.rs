//! LLM-driven statement parser synthesizer.
//!
//! `parsegen <TARGET>` generates a Python parser for the target statement
//! format, validates it empirically against `data/<TARGET>/result.csv`, and
//! retries with error feedback until the output matches or the attempt
//! budget runs out.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use parsegen::io::completion::{OpenAiCompletions, require_api_key};
use parsegen::io::config::load_config;
use parsegen::io::paths::TargetPaths;
use parsegen::io::sandbox::PythonSandbox;
use parsegen::looping::{SessionStop, run_session};
use parsegen::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "parsegen",
    version,
    about = "Synthesizes statement parsers through an LLM feedback loop"
)]
struct Cli {
    /// Target statement format (e.g. `icici`); keys all conventional paths.
    target: String,

    /// Project root containing `data/` and `custom_parsers/`.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file path (defaults to `parsegen.toml` under the root).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let paths = TargetPaths::new(&cli.root, &cli.target);
    let config_path = cli.config.unwrap_or_else(|| paths.config_path.clone());
    let config = load_config(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;

    // The credential is resolved once, up front: a missing key aborts before
    // any attempt is made. Leaf components never touch the environment.
    let api_key = require_api_key(std::env::var("OPENAI_API_KEY").ok())?;
    let client = OpenAiCompletions::new(
        &config.api_base,
        &config.model,
        &api_key,
        Duration::from_secs(config.completion_timeout_secs),
    )?;
    let sandbox = PythonSandbox::new(&config.python);

    println!("target: {}", cli.target);
    let max_attempts = config.max_attempts;
    let outcome = run_session(&client, &sandbox, &paths, &config, |report| {
        if report.passed {
            println!(
                "attempt {}/{max_attempts}: candidate matched the reference table",
                report.attempt
            );
        } else {
            let reason = report.error.as_deref().unwrap_or("unknown failure");
            println!(
                "attempt {}/{max_attempts}: failed: {}",
                report.attempt,
                first_line(reason)
            );
        }
    })?;

    match outcome.stop {
        SessionStop::Success { parser_path } => {
            println!(
                "success after {} attempt(s): parser written to {}",
                outcome.attempts,
                parser_path.display()
            );
            Ok(exit_codes::OK)
        }
        SessionStop::Exhausted { last_error } => {
            println!("gave up after {max_attempts} attempts; last error:\n{last_error}");
            Ok(exit_codes::EXHAUSTED)
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
