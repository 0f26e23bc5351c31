//! Candidate probing and ranking.

pub mod ranking;
pub mod scheduler;
pub mod speed;

use async_trait::async_trait;

use crate::Result;
use crate::domain::CandidateRecord;

pub use ranking::{rank_measurements, resolution_score};
pub use scheduler::{PROBE_CONCURRENCY, ProbeScheduler};
pub use speed::SpeedRanker;

/// A reachable candidate with its measured response time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measured {
    pub record: CandidateRecord,
    pub response_time_ms: u64,
}

/// Measures a channel's candidates and orders the reachable ones.
#[async_trait]
pub trait Ranker: Send + Sync {
    /// Returns the reachable candidates, best first. Unreachable candidates
    /// are left out; an empty result means nothing answered.
    async fn rank(&self, candidates: &[CandidateRecord]) -> Result<Vec<Measured>>;
}
