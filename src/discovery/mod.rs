//! Candidate discovery and validation
//!
//! [`DiscoveryLoop`] walks the search stream and runs every candidate through
//! the [`CandidateValidator`] criteria chain, with [`RateGate`] guarding the
//! request quota and [`PageSampler`] bounding the cost of commit counting.
//! Accepted candidates go straight to the
//! [`CheckpointStore`](crate::checkpoint::CheckpointStore).

pub mod criteria;
pub mod error;
pub mod pipeline;
pub mod rate_gate;
pub mod retry;
pub mod sampler;
pub mod validator;

pub use criteria::{CriteriaError, ValidationCriteria};
pub use error::{DiscoveryError, DiscoveryResult};
pub use pipeline::{DiscoveryLoop, DiscoveryReport, StopReason, DEFAULT_TARGET_COUNT};
pub use rate_gate::RateGate;
pub use retry::{RetryBudget, RetryDecision, RetryPolicy};
pub use sampler::{PageSampler, PageSource};
pub use validator::{CandidateValidator, Rejection, Verdict};
