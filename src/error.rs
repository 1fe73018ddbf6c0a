//! Error types for laradock-cli.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LaradockError>;

#[derive(Error, Debug)]
pub enum LaradockError {
    #[error("Environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("{key} is not set in {}", .path.display())]
    MissingKey { key: String, path: PathBuf },

    #[error("{0} is not set in the shared .env")]
    MissingSharedKey(&'static str),

    #[error("No env template found in {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("Cannot write {0} to an env file")]
    Unstringifiable(String),

    #[error("Not inside a project (searched upwards from {})", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("Env hook {} failed: {reason}", .path.display())]
    Hook { path: PathBuf, reason: String },

    #[error("Checksum mismatch for {asset}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    #[error("docker-compose exited with code {0}")]
    Compose(i32),

    /// A child was stopped by the user's Ctrl-C.
    #[error("Interrupted.")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {}: {source}", .path.display())]
    EnvParse {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

impl LaradockError {
    /// Process exit code for this error. Compose failures surface the
    /// orchestration tool's own code; a user interrupt is a clean exit.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaradockError::Compose(code) => *code,
            LaradockError::Interrupted => 0,
            _ => 1,
        }
    }
}

/// Exit code for an error bubbling out of the dispatcher.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<LaradockError>()
        .map(LaradockError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_failure_keeps_its_code() {
        let err = anyhow::Error::new(LaradockError::Compose(17));
        assert_eq!(exit_code_for(&err), 17);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err = anyhow::Error::new(LaradockError::TemplateMissing(PathBuf::from("/x")));
        assert_eq!(exit_code_for(&err), 1);
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn interrupt_is_a_clean_exit() {
        let err = anyhow::Error::new(LaradockError::Interrupted);
        assert_eq!(exit_code_for(&err), 0);
        assert_eq!(err.to_string(), "Interrupted.");
    }
}
