//! Bounded-concurrency probe stage.
//!
//! One task per channel, at most [`PROBE_CONCURRENCY`] of them ranking at the
//! same time. Results are collected by the calling task and rebuilt in the
//! input order, so the ranked set does not depend on completion order.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{Measured, Ranker};
use crate::domain::{CandidateRecord, CandidateSet, ChannelKey};
use crate::pipeline::progress::{SharedReporter, StageProgress, format_eta};
use crate::{Error, Result};

/// Maximum probe tasks in flight.
pub const PROBE_CONCURRENCY: usize = 10;

pub struct ProbeScheduler {
    ranker: Arc<dyn Ranker>,
    concurrency: usize,
}

impl ProbeScheduler {
    pub fn new(ranker: Arc<dyn Ranker>) -> Self {
        Self::with_concurrency(ranker, PROBE_CONCURRENCY)
    }

    pub fn with_concurrency(ranker: Arc<dyn Ranker>, concurrency: usize) -> Self {
        Self {
            ranker,
            concurrency: concurrency.max(1),
        }
    }

    /// Probe every channel in `candidates` and return the ranked set.
    ///
    /// A channel whose ranking fails is logged and left out of the result.
    pub async fn run(
        &self,
        candidates: CandidateSet,
        reporter: SharedReporter,
        token: &CancellationToken,
    ) -> Result<CandidateSet> {
        let total = candidates.len();
        reporter.report(&format!("Sorting, {total} channels in total"), 0, false);
        if total == 0 {
            reporter.report("Sorting, 0 channels remaining", 100, false);
            return Ok(CandidateSet::new());
        }

        info!(channels = total, concurrency = self.concurrency, "Starting probe stage");

        let progress = StageProgress::new(total, reporter);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut order = Vec::with_capacity(total);
        let mut tasks = JoinSet::new();

        for (key, records) in candidates {
            order.push(key.clone());
            let ranker = self.ranker.clone();
            let semaphore = semaphore.clone();
            let token = token.clone();

            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled),
                    outcome = probe_channel(ranker, semaphore, &records) => outcome,
                };
                (key, outcome)
            });
        }

        let mut ranked: HashMap<ChannelKey, Vec<CandidateRecord>> = HashMap::with_capacity(total);
        loop {
            let joined = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tasks.shutdown().await;
                    return Err(Error::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            match joined {
                None => break,
                Some(Ok((_, Err(Error::Cancelled)))) => {
                    tasks.shutdown().await;
                    return Err(Error::Cancelled);
                }
                Some(Ok((key, Ok(measured)))) => {
                    debug!(channel = %key, reachable = measured.len(), "Channel ranked");
                    for m in &measured {
                        info!(
                            channel = %key.name,
                            url = %m.record.url,
                            date = m.record.observed_date.as_deref().unwrap_or("-"),
                            resolution = m.record.resolution.as_deref().unwrap_or("-"),
                            response_time_ms = m.response_time_ms,
                            "Ranked candidate"
                        );
                    }
                    ranked.insert(key, measured.into_iter().map(|m| m.record).collect());
                }
                Some(Ok((key, Err(e)))) => {
                    error!(channel = %key, error = %e, "Failed to rank channel");
                }
                Some(Err(e)) => {
                    error!(error = %e, "Probe task failed");
                }
            }

            progress.advance(|s| {
                format!(
                    "Sorting, {} channels remaining, estimated time left: {}",
                    s.remaining(),
                    format_eta(s.eta())
                )
            });
        }

        let mut result = CandidateSet::new();
        for key in order {
            if let Some(records) = ranked.remove(&key) {
                result.replace(key, records);
            }
        }
        Ok(result)
    }
}

async fn probe_channel(
    ranker: Arc<dyn Ranker>,
    semaphore: Arc<Semaphore>,
    records: &[CandidateRecord],
) -> Result<Vec<Measured>> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| Error::Other(format!("Semaphore error: {}", e)))?;
    ranker.rank(records).await
}
