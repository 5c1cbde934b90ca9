//! Test-only scripted backends and workspace scaffolding.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::io::completion::CompletionClient;
use crate::io::paths::TargetPaths;
use crate::io::sandbox::{RunParserRequest, Sandbox};

/// Reference table used by most scenario tests: the five-column statement
/// schema with missing-value cells in the amount columns.
pub const REFERENCE_CSV: &str = "\
Date,Description,Debit Amt,Credit Amt,Balance
01-08-2024,Salary Credit XYZ Pvt Ltd,,1935.3,6864.58
02-08-2024,IMPS UPI Payment Amazon,3886.08,,2978.5
";

/// A syntactically trivial candidate body for scripted completions.
pub fn plain_candidate() -> String {
    "def parse(pdf_path):\n    return None\n".to_string()
}

/// Scripted reply for one completion call.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail with this error message.
    Fail(String),
}

/// Completion client that replays scripted replies and records every prompt
/// it receives.
#[derive(Debug, Default)]
pub struct ScriptedCompletions {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletions {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl CompletionClient for ScriptedCompletions {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        match self.replies.lock().expect("replies lock").pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted completions exhausted")),
        }
    }
}

/// Scripted behavior for one candidate execution.
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    /// Write the given CSV to the requested output path and succeed.
    WritesCsv(String),
    /// Fail with the given error message.
    Fails(String),
}

/// Sandbox that never spawns processes. Syntax checks pass unless scripted
/// otherwise; executions replay [`ScriptedRun`] entries in order.
#[derive(Debug, Default)]
pub struct ScriptedSandbox {
    syntax: Mutex<VecDeque<Result<(), String>>>,
    runs: Mutex<VecDeque<ScriptedRun>>,
}

impl ScriptedSandbox {
    pub fn new(runs: Vec<ScriptedRun>) -> Self {
        Self {
            syntax: Mutex::new(VecDeque::new()),
            runs: Mutex::new(runs.into()),
        }
    }

    /// Like [`ScriptedSandbox::new`], with scripted syntax-gate verdicts
    /// consumed one per check (an empty queue passes).
    pub fn with_syntax(syntax: Vec<Result<(), String>>, runs: Vec<ScriptedRun>) -> Self {
        Self {
            syntax: Mutex::new(syntax.into()),
            runs: Mutex::new(runs.into()),
        }
    }
}

impl Sandbox for ScriptedSandbox {
    fn check_syntax(&self, _source: &str, _timeout: Duration) -> Result<()> {
        match self.syntax.lock().expect("syntax lock").pop_front() {
            Some(Err(message)) => Err(anyhow!(message)),
            _ => Ok(()),
        }
    }

    fn run_parser(&self, request: &RunParserRequest) -> Result<()> {
        match self.runs.lock().expect("runs lock").pop_front() {
            Some(ScriptedRun::WritesCsv(csv)) => {
                if let Some(parent) = request.output_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&request.output_path, csv)?;
                Ok(())
            }
            Some(ScriptedRun::Fails(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted runs exhausted")),
        }
    }
}

/// Temp project root seeded with the conventional data layout for a target.
pub struct TestWorkspace {
    temp: tempfile::TempDir,
    target: String,
}

impl TestWorkspace {
    pub fn new(target: &str, reference_csv: &str) -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let paths = TargetPaths::new(temp.path(), target);
        let data_dir = paths
            .document_path
            .parent()
            .ok_or_else(|| anyhow!("document path missing parent"))?;
        fs::create_dir_all(data_dir)?;
        fs::write(&paths.document_path, b"%PDF-1.4 test document")?;
        fs::write(&paths.reference_path, reference_csv)?;
        Ok(Self {
            temp,
            target: target.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> TargetPaths {
        TargetPaths::new(self.temp.path(), &self.target)
    }
}
