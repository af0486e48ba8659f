use std::path::PathBuf;
use thiserror::Error;

/// Failures of the merge pass
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Failed to clear merge output {}: {source:#}", path.display())]
    ClearOutput {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to enumerate {}: {source:#}", path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to copy {} to {}: {source:#}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "Merged file {} would be written by both {} and {}",
        destination.display(),
        first.display(),
        second.display()
    )]
    Collision {
        destination: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Copy task aborted: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Copy limiter closed before all copies were scheduled")]
    LimiterClosed,
}
