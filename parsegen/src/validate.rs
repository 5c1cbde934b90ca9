//! Candidate validation against the reference table.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::state::RunState;
use crate::core::table::{Table, diff_lenient, diff_strict};
use crate::io::attempt_log::AttemptPaths;
use crate::io::config::AgentConfig;
use crate::io::paths::TargetPaths;
use crate::io::sandbox::{RunParserRequest, Sandbox};

/// Persist the current candidate, execute it, and judge its output against
/// the reference table. Mutates `state` in place and never propagates:
/// every failure along the way — persisting, executing, loading, comparing —
/// is captured uniformly as a failed attempt.
#[instrument(skip_all, fields(target = %state.target, attempt = state.attempt))]
pub fn test_candidate<S: Sandbox>(
    sandbox: &S,
    paths: &TargetPaths,
    config: &AgentConfig,
    state: &mut RunState,
) {
    let attempt_paths = AttemptPaths::new(paths, state.attempt);
    match run_validation(sandbox, paths, config, &attempt_paths, state) {
        Ok(()) => {
            info!("candidate matched the reference table");
            state.record_success();
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "validation failed");
            state.record_failure(message);
        }
    }
}

fn run_validation<S: Sandbox>(
    sandbox: &S,
    paths: &TargetPaths,
    config: &AgentConfig,
    attempt_paths: &AttemptPaths,
    state: &RunState,
) -> Result<()> {
    persist_candidate(&paths.parser_path, &state.generated_code)?;

    sandbox.run_parser(&RunParserRequest {
        parser_path: paths.parser_path.clone(),
        document_path: state.document_path.clone(),
        output_path: attempt_paths.output_path.clone(),
        timeout: Duration::from_secs(config.exec_timeout_secs),
        output_limit_bytes: config.output_limit_bytes,
    })?;

    let result = Table::load(&attempt_paths.output_path).context("load candidate output")?;
    let reference = Table::load(&state.reference_path).context("load reference table")?;

    match diff_strict(&result, &reference) {
        None => Ok(()),
        Some(strict_diff) => match diff_lenient(&result, &reference) {
            None => {
                debug!(diff = %strict_diff, "strict comparison failed, accepted ignoring column types");
                Ok(())
            }
            Some(lenient_diff) => Err(anyhow!("output differs from reference: {lenient_diff}")),
        },
    }
}

fn persist_candidate(path: &Path, code: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("parser path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    fs::write(path, code).with_context(|| format!("write candidate {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::ResultStatus;
    use crate::test_support::{REFERENCE_CSV, ScriptedRun, ScriptedSandbox, TestWorkspace};

    fn ready_state(workspace: &TestWorkspace, code: &str) -> RunState {
        let paths = workspace.paths();
        let mut state = RunState::new(
            paths.target.clone(),
            paths.document_path.clone(),
            paths.reference_path.clone(),
        );
        state.generated_code = code.to_string();
        state
    }

    #[test]
    fn matching_output_records_success_without_consuming_attempt() {
        let workspace = TestWorkspace::new("icici", REFERENCE_CSV).expect("workspace");
        let sandbox = ScriptedSandbox::new(vec![ScriptedRun::WritesCsv(REFERENCE_CSV.to_string())]);
        let mut state = ready_state(&workspace, "def parse(path):\n    pass\n");

        test_candidate(&sandbox, &workspace.paths(), &AgentConfig::default(), &mut state);
        assert_eq!(state.status, ResultStatus::Success);
        assert_eq!(state.attempt, 1);
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn execution_failure_is_recorded_and_consumes_one_attempt() {
        let workspace = TestWorkspace::new("icici", REFERENCE_CSV).expect("workspace");
        let sandbox = ScriptedSandbox::new(vec![ScriptedRun::Fails(
            "candidate execution failed:\nKeyError: 'Balance'".to_string(),
        )]);
        let mut state = ready_state(&workspace, "def parse(path):\n    pass\n");

        test_candidate(&sandbox, &workspace.paths(), &AgentConfig::default(), &mut state);
        assert_eq!(state.status, ResultStatus::Failed);
        assert_eq!(state.attempt, 2);
        assert!(state.last_error.as_deref().unwrap().contains("KeyError"));
    }

    /// Re-validating identical failing code replaces the error text and
    /// consumes exactly one attempt per call.
    #[test]
    fn repeated_failures_replace_error_and_step_attempt() {
        let workspace = TestWorkspace::new("icici", REFERENCE_CSV).expect("workspace");
        let sandbox = ScriptedSandbox::new(vec![
            ScriptedRun::Fails("first failure".to_string()),
            ScriptedRun::Fails("second failure".to_string()),
        ]);
        let mut state = ready_state(&workspace, "def parse(path):\n    pass\n");
        let paths = workspace.paths();
        let config = AgentConfig::default();

        test_candidate(&sandbox, &paths, &config, &mut state);
        assert_eq!(state.attempt, 2);
        assert_eq!(state.last_error.as_deref(), Some("first failure"));

        test_candidate(&sandbox, &paths, &config, &mut state);
        assert_eq!(state.attempt, 3);
        assert_eq!(state.last_error.as_deref(), Some("second failure"));
    }

    /// The on-disk candidate always equals the code under test.
    #[test]
    fn persists_candidate_before_execution() {
        let workspace = TestWorkspace::new("icici", REFERENCE_CSV).expect("workspace");
        let sandbox = ScriptedSandbox::new(vec![ScriptedRun::Fails("boom".to_string())]);
        let code = "def parse(path):\n    raise ValueError\n";
        let mut state = ready_state(&workspace, code);
        let paths = workspace.paths();

        test_candidate(&sandbox, &paths, &AgentConfig::default(), &mut state);
        let on_disk = fs::read_to_string(&paths.parser_path).expect("read candidate");
        assert_eq!(on_disk, code);
    }

    #[test]
    fn value_equal_type_different_output_passes_via_fallback() {
        let reference = "Debit Amt,Description\n100.0,salary\nn/a,transfer\n";
        let result = "Debit Amt,Description\n100,salary\nn/a,transfer\n";
        let workspace = TestWorkspace::new("icici", reference).expect("workspace");
        let sandbox = ScriptedSandbox::new(vec![ScriptedRun::WritesCsv(result.to_string())]);
        let mut state = ready_state(&workspace, "def parse(path):\n    pass\n");

        test_candidate(&sandbox, &workspace.paths(), &AgentConfig::default(), &mut state);
        assert_eq!(state.status, ResultStatus::Success);
    }

    #[test]
    fn column_order_difference_fails() {
        let result = "Description,Date,Debit Amt,Credit Amt,Balance\nx,y,,1.0,2.0\n";
        let workspace = TestWorkspace::new("icici", REFERENCE_CSV).expect("workspace");
        let sandbox = ScriptedSandbox::new(vec![ScriptedRun::WritesCsv(result.to_string())]);
        let mut state = ready_state(&workspace, "def parse(path):\n    pass\n");

        test_candidate(&sandbox, &workspace.paths(), &AgentConfig::default(), &mut state);
        assert_eq!(state.status, ResultStatus::Failed);
        assert!(state.last_error.as_deref().unwrap().contains("column mismatch"));
    }
}
