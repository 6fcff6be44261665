//! Markdown report output.
//!
//! Wraps a rendered tree in a fenced `shell` block and writes it to
//! `repo-structure.md`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name of the written report.
pub const REPORT_FILE_NAME: &str = "repo-structure.md";

/// Errors that can occur while writing the report.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Wrap a rendered tree in a Markdown code fence.
pub fn wrap_markdown(tree: &str) -> String {
    format!("```shell\n{}\n```", tree)
}

/// Write the report for `tree` into `dir`, returning the file path.
pub fn write_report(dir: &Path, tree: &str) -> Result<PathBuf, OutputError> {
    let path = dir.join(REPORT_FILE_NAME);
    std::fs::write(&path, wrap_markdown(tree)).map_err(|source| OutputError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
