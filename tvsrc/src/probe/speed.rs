//! HTTP response-time ranker.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;

use super::{Measured, Ranker, rank_measurements};
use crate::Result;
use crate::domain::CandidateRecord;

/// Ranks candidates by time to first body byte.
///
/// Every candidate of a channel is probed at once. Only http(s) candidates can
/// be measured; other schemes, error statuses and timeouts count as
/// unreachable.
pub struct SpeedRanker {
    client: reqwest::Client,
    timeout: Duration,
}

impl SpeedRanker {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Response time in milliseconds, or `None` when unreachable.
    pub async fn measure(&self, url: &str) -> Option<u64> {
        let lower = url.to_ascii_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return None;
        }

        let started = Instant::now();
        let probe = async {
            let mut response = self.client.get(url).send().await?.error_for_status()?;
            response.chunk().await?;
            Ok::<_, reqwest::Error>(())
        };

        match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(())) => Some(started.elapsed().as_millis() as u64),
            Ok(Err(e)) => {
                debug!(url = %url, error = %e, "Probe failed");
                None
            }
            Err(_) => {
                debug!(url = %url, "Probe timed out");
                None
            }
        }
    }
}

#[async_trait]
impl Ranker for SpeedRanker {
    async fn rank(&self, candidates: &[CandidateRecord]) -> Result<Vec<Measured>> {
        let times = join_all(candidates.iter().map(|c| self.measure(&c.url))).await;

        let measured = candidates
            .iter()
            .zip(times)
            .filter_map(|(record, time)| {
                time.map(|response_time_ms| Measured {
                    record: record.clone(),
                    response_time_ms,
                })
            })
            .collect();

        Ok(rank_measurements(measured))
    }
}
