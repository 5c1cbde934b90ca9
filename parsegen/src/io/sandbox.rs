//! Isolated execution of generated candidates.
//!
//! The [`Sandbox`] trait decouples validation from the interpreter backend.
//! Candidates never run inside this process: [`PythonSandbox`] pipes fixed
//! driver programs into a separate interpreter, and results come back through
//! a serialized CSV file rather than shared memory. Tests use scripted
//! sandboxes that never spawn processes.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::run_command_with_timeout;

/// Driver that reads candidate source from stdin and checks it parses.
const SYNTAX_DRIVER: &str = include_str!("py/check_syntax.py");
/// Driver that loads the candidate file, calls `parse(document)` and writes
/// the resulting frame to a CSV path.
const RUN_DRIVER: &str = include_str!("py/run_parser.py");

/// Capture limit for the syntax gate; a parse error is a few lines.
const SYNTAX_OUTPUT_LIMIT: usize = 10_000;

/// Parameters for one candidate execution.
#[derive(Debug, Clone)]
pub struct RunParserRequest {
    /// Persisted candidate source.
    pub parser_path: PathBuf,
    /// Document handed to the candidate's `parse` entry point.
    pub document_path: PathBuf,
    /// Where the candidate's output table must be written.
    pub output_path: PathBuf,
    /// Maximum time to wait for the execution to complete.
    pub timeout: Duration,
    /// Truncate captured interpreter output beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Abstraction over candidate execution backends.
pub trait Sandbox {
    /// Check that `source` is plausibly well-formed candidate source.
    fn check_syntax(&self, source: &str, timeout: Duration) -> Result<()>;

    /// Run the candidate's `parse` entry point against the document. Must
    /// write a CSV table to `request.output_path` on success.
    fn run_parser(&self, request: &RunParserRequest) -> Result<()>;
}

/// Sandbox that runs candidates under a separate interpreter process.
pub struct PythonSandbox {
    python: String,
}

impl PythonSandbox {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl Sandbox for PythonSandbox {
    #[instrument(skip_all, fields(source_bytes = source.len()))]
    fn check_syntax(&self, source: &str, timeout: Duration) -> Result<()> {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-c").arg(SYNTAX_DRIVER);
        let output =
            run_command_with_timeout(cmd, Some(source.as_bytes()), timeout, SYNTAX_OUTPUT_LIMIT)
                .context("run syntax check")?;
        if output.timed_out {
            return Err(anyhow!("syntax check timed out after {timeout:?}"));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "candidate source does not parse: {}",
                output.stderr_text()
            ));
        }
        debug!("candidate source parses");
        Ok(())
    }

    #[instrument(skip_all, fields(
        parser = %request.parser_path.display(),
        timeout_secs = request.timeout.as_secs(),
    ))]
    fn run_parser(&self, request: &RunParserRequest) -> Result<()> {
        if let Some(parent) = request.output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir {}", parent.display()))?;
        }

        let mut cmd = Command::new(&self.python);
        cmd.arg("-")
            .arg(&request.parser_path)
            .arg(&request.document_path)
            .arg(&request.output_path);
        let output = run_command_with_timeout(
            cmd,
            Some(RUN_DRIVER.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )
        .context("run candidate")?;

        if output.timed_out {
            return Err(anyhow!(
                "candidate execution timed out after {:?}",
                request.timeout
            ));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "candidate execution failed:\n{}",
                output.stderr_text()
            ));
        }
        if !request.output_path.exists() {
            return Err(anyhow!(
                "candidate produced no output at {}",
                request.output_path.display()
            ));
        }
        debug!("candidate execution completed");
        Ok(())
    }
}
