//! Attempt artifacts under `.parsegen/<target>/attempts/`.
//!
//! These are observability logs (metadata, captured errors, candidate
//! output tables). The candidate source itself is never copied here; it
//! lives only at its single conventional path, overwritten per attempt.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::io::paths::TargetPaths;

#[derive(Debug, Clone, Serialize)]
pub struct AttemptMeta {
    pub target: String,
    pub attempt: u32,
    pub passed: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AttemptPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub error_log_path: PathBuf,
    pub output_path: PathBuf,
}

impl AttemptPaths {
    pub fn new(paths: &TargetPaths, attempt: u32) -> Self {
        let dir = paths.attempts_dir.join(attempt.to_string());
        Self {
            meta_path: dir.join("meta.json"),
            error_log_path: dir.join("error.log"),
            output_path: dir.join("output.csv"),
            dir,
        }
    }
}

/// Write attempt metadata, and the captured error when one exists.
pub fn write_attempt(paths: &AttemptPaths, meta: &AttemptMeta) -> Result<()> {
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create attempt dir {}", paths.dir.display()))?;
    write_json(&paths.meta_path, meta)?;
    if let Some(error) = &meta.error {
        fs::write(&paths.error_log_path, format!("{error}\n"))
            .with_context(|| format!("write {}", paths.error_log_path.display()))?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
