use std::path::PathBuf;

/// Failures of the durable progress file.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("failed to read progress file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("progress file {path:?} is not a valid item map")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize progress")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write progress file {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
