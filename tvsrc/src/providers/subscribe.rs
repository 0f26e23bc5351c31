//! Subscription-list provider.
//!
//! Fetches every configured subscription list and parses either the
//! `name,url` text format or M3U playlists. A list that cannot be fetched is
//! logged and skipped.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::{Provider, ProviderResult};
use crate::domain::catalog::GENRE_MARKER;
use crate::domain::{CandidateRecord, normalize_channel_name};
use crate::pipeline::progress::{SharedReporter, StageProgress, format_eta};
use crate::Result;

/// Subscription lists fetched at the same time.
const FETCH_CONCURRENCY: usize = 4;

pub struct SubscribeProvider {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl SubscribeProvider {
    pub fn new(client: reqwest::Client, urls: Vec<String>) -> Self {
        Self { client, urls }
    }

    async fn fetch_list(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Fetch and parse one list; a failed list yields no entries.
    async fn fetch_one(&self, url: &str, stage: &StageProgress) -> Vec<(String, String)> {
        let entries = match self.fetch_list(url).await {
            Ok(body) => {
                let entries = parse_subscription(&body);
                debug!(url = %url, entries = entries.len(), "Fetched subscription");
                entries
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch subscription");
                Vec::new()
            }
        };
        stage.advance(|s| {
            format!(
                "Fetching subscriptions, {} remaining, estimated time left: {}",
                s.remaining(),
                format_eta(s.eta())
            )
        });
        entries
    }
}

#[async_trait]
impl Provider for SubscribeProvider {
    async fn fetch(
        &self,
        progress: SharedReporter,
        _channel_names: Arc<[String]>,
    ) -> Result<ProviderResult> {
        let progress = StageProgress::new(self.urls.len(), progress);
        let stage = &progress;

        // `buffered` keeps list order, so merging below is deterministic.
        let lists: Vec<Vec<(String, String)>> = stream::iter(self.urls.iter().cloned())
            .map(|url| async move { self.fetch_one(&url, stage).await })
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await;

        Ok(merge_entries(lists.into_iter().flatten()))
    }
}

/// Group `(name, url)` entries by normalized name, dropping repeated URLs.
pub fn merge_entries(entries: impl IntoIterator<Item = (String, String)>) -> ProviderResult {
    let mut result = ProviderResult::new();
    for (name, url) in entries {
        let records = result.entry(normalize_channel_name(&name)).or_default();
        if !records.iter().any(|r| r.url == url) {
            records.push(CandidateRecord::fallback(url));
        }
    }
    result
}

/// Parse a subscription body into `(channel name, url)` pairs.
pub fn parse_subscription(body: &str) -> Vec<(String, String)> {
    if body.contains("#EXTINF") {
        parse_m3u(body)
    } else {
        parse_txt(body)
    }
}

fn parse_txt(body: &str) -> Vec<(String, String)> {
    body.lines()
        .filter_map(|line| {
            let (name, url) = line.trim().split_once(',')?;
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || url.is_empty() || url == GENRE_MARKER {
                return None;
            }
            Some((name.to_string(), url.to_string()))
        })
        .collect()
}

fn parse_m3u(body: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut pending: Option<String> = None;

    for line in body.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(info) = line.strip_prefix("#EXTINF") {
            pending = info
                .rsplit_once(',')
                .map(|(_, name)| name.trim().to_string())
                .filter(|name| !name.is_empty());
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        if let Some(name) = pending.take() {
            entries.push((name, line.to_string()));
        }
    }

    entries
}
