//! Bounded generate→validate session loop.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::state::{ResultStatus, RunState};
use crate::core::table::Table;
use crate::generate::Generator;
use crate::io::attempt_log::{AttemptMeta, AttemptPaths, write_attempt};
use crate::io::completion::CompletionClient;
use crate::io::config::AgentConfig;
use crate::io::paths::TargetPaths;
use crate::io::sandbox::Sandbox;
use crate::validate::test_candidate;

/// Reason the session loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStop {
    /// A candidate matched the reference table.
    Success { parser_path: PathBuf },
    /// The attempt budget was consumed without a passing candidate.
    Exhausted { last_error: String },
}

/// Summary of one synthesis session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub target: String,
    /// Attempt counter after the loop ended: the number of the passing
    /// attempt on success, `max_attempts + 1` on exhaustion.
    pub attempts: u32,
    pub stop: SessionStop,
}

/// Progress for one completed attempt, surfaced via the `on_attempt` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub attempt: u32,
    pub passed: bool,
    pub error: Option<String>,
}

/// Run one synthesis session: generate a candidate, gate it on syntax,
/// validate it against the reference table, and retry with error feedback
/// until it passes or `config.max_attempts` is exhausted.
///
/// Per-attempt errors are converted into state and fed forward; nothing
/// recoverable escapes the loop.
#[instrument(skip_all, fields(target = %paths.target))]
pub fn run_session<C: CompletionClient, S: Sandbox, F: FnMut(&AttemptReport)>(
    client: &C,
    sandbox: &S,
    paths: &TargetPaths,
    config: &AgentConfig,
    mut on_attempt: F,
) -> Result<SessionOutcome> {
    let mut state = RunState::new(
        paths.target.clone(),
        paths.document_path.clone(),
        paths.reference_path.clone(),
    );
    inspect_inputs(paths);

    let generator = Generator::new(client);
    loop {
        let attempt = state.attempt;
        let started = Instant::now();

        generate_candidate(&generator, sandbox, config, &mut state);
        if state.attempt == attempt {
            // Generation completed; a transport error would already have
            // consumed the attempt.
            test_candidate(sandbox, paths, config, &mut state);
        }

        let passed = state.status == ResultStatus::Success;
        let report = AttemptReport {
            attempt,
            passed,
            error: if passed { None } else { state.last_error.clone() },
        };
        log_attempt(paths, &report, started.elapsed());
        on_attempt(&report);

        if passed {
            return Ok(SessionOutcome {
                target: paths.target.clone(),
                attempts: state.attempt,
                stop: SessionStop::Success {
                    parser_path: paths.parser_path.clone(),
                },
            });
        }
        if state.attempt > config.max_attempts {
            let last_error = state
                .last_error
                .clone()
                .unwrap_or_else(|| "unknown failure".to_string());
            return Ok(SessionOutcome {
                target: paths.target.clone(),
                attempts: state.attempt,
                stop: SessionStop::Exhausted { last_error },
            });
        }
    }
}

/// Generate a candidate and pass it through the syntax gate, regenerating
/// with the parse error as feedback up to `config.max_syntax_rejects` times.
/// Gate rejections never consume an attempt; a completion failure consumes
/// the attempt exactly like a validation failure.
fn generate_candidate<C: CompletionClient, S: Sandbox>(
    generator: &Generator<'_, C>,
    sandbox: &S,
    config: &AgentConfig,
    state: &mut RunState,
) {
    let mut rejects = 0u32;
    loop {
        if let Err(err) = generator.generate(state) {
            state.record_failure(format!("{err:#}"));
            return;
        }
        match sandbox.check_syntax(
            &state.generated_code,
            Duration::from_secs(config.exec_timeout_secs),
        ) {
            Ok(()) => return,
            Err(err) if rejects < config.max_syntax_rejects => {
                rejects += 1;
                let message = format!("{err:#}");
                warn!(rejects, error = %message, "syntax gate rejected candidate, regenerating");
                state.last_error = Some(message);
            }
            Err(err) => {
                // Gate budget spent: let validation surface the failure and
                // consume the attempt.
                debug!(error = %format!("{err:#}"), "syntax gate budget spent");
                state.last_error = Some(format!("{err:#}"));
                return;
            }
        }
    }
}

/// Pre-loop look at the inputs. Purely informational.
fn inspect_inputs(paths: &TargetPaths) {
    match Table::load(&paths.reference_path) {
        Ok(reference) => info!(
            columns = ?reference.header,
            rows = reference.rows.len(),
            "reference table loaded"
        ),
        Err(err) => warn!(error = %format!("{err:#}"), "could not inspect reference table"),
    }
    match fs::metadata(&paths.document_path) {
        Ok(meta) => info!(bytes = meta.len(), "statement document found"),
        Err(err) => warn!(error = %err, "could not inspect statement document"),
    }
}

/// Best-effort attempt logging; a failed write never aborts the session.
fn log_attempt(paths: &TargetPaths, report: &AttemptReport, duration: Duration) {
    let attempt_paths = AttemptPaths::new(paths, report.attempt);
    let meta = AttemptMeta {
        target: paths.target.clone(),
        attempt: report.attempt,
        passed: report.passed,
        duration_ms: duration.as_millis() as u64,
        error: report.error.clone(),
    };
    if let Err(err) = write_attempt(&attempt_paths, &meta) {
        warn!(error = %format!("{err:#}"), "could not write attempt log");
    }
}
