//! Discovery run errors

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::github::ApiError;

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Conditions that end a discovery run early
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The search stream failed beyond what the retry policy allows
    #[error("search failed: {0}")]
    Search(#[source] ApiError),

    /// A non-recoverable failure while validating a candidate
    #[error("fatal error while validating {candidate}: {source}")]
    Fatal {
        candidate: String,
        #[source]
        source: ApiError,
    },

    #[error("checkpoint failed: {0}")]
    Checkpoint(#[from] CheckpointError),
}
