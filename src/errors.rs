//! Error types for rsg.

use std::path::PathBuf;

use crate::exclude::ExcludeError;
use crate::output::OutputError;
use crate::walker::WalkError;

/// Top-level error type for rsg operations.
#[derive(Debug, thiserror::Error)]
pub enum RsgError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("exclusion error: {0}")]
    Exclude(#[from] ExcludeError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Map an error to its exit code.
pub fn exit_code(error: &RsgError) -> i32 {
    match error {
        RsgError::PathNotFound(_) => 3,
        RsgError::NotADirectory(_) => 4,
        RsgError::Io(_) => 1,
        RsgError::Walk(WalkError::PermissionDenied { .. }) => 4,
        RsgError::Walk(_) => 2,
        RsgError::Exclude(_) => 5,
        RsgError::Output(_) => 6,
    }
}
