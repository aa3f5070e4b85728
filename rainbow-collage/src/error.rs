use crate::color::ReduceError;
use crate::merge::MergeError;

/// Everything that can stop a collage build. All variants are terminal.
#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    #[error("invalid image at entry {index}: {source}")]
    InvalidImage {
        index: usize,
        #[source]
        source: ReduceError,
    },

    #[error("grid {width}x{height} does not match {entries} entries")]
    GridSizeMismatch {
        width: u32,
        height: u32,
        entries: usize,
    },

    #[error("grid dimensions must be positive, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },

    #[error("color worker for entry {index} failed: {source}")]
    Worker {
        index: usize,
        #[source]
        source: tokio::task::JoinError,
    },

    /// Merge collaborator failure, passed through untouched.
    #[error(transparent)]
    Merge(#[from] MergeError),
}
