//! Discovery providers.
//!
//! A provider returns candidate URLs keyed by normalized channel name. The
//! provider set runs every enabled provider concurrently and fails the whole
//! fetch as soon as one provider fails.

pub mod subscribe;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::UpdateConfig;
use crate::domain::CandidateRecord;
use crate::pipeline::progress::SharedReporter;
use crate::{Error, Result};

pub use subscribe::SubscribeProvider;

/// Candidates keyed by normalized channel name.
pub type ProviderResult = HashMap<String, Vec<CandidateRecord>>;

/// The discovery mechanisms, in merge priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    /// Subscription lists.
    Subscribe,
    /// Multicast / search-engine discovery.
    Multicast,
    /// Free-text online search.
    OnlineSearch,
}

impl ProviderKind {
    /// Merge priority order.
    pub const PRIORITY: [ProviderKind; 3] = [
        ProviderKind::Subscribe,
        ProviderKind::Multicast,
        ProviderKind::OnlineSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Subscribe => "subscribe",
            ProviderKind::Multicast => "multicast",
            ProviderKind::OnlineSearch => "online_search",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which providers take part in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnabledProviders {
    pub subscribe: bool,
    pub multicast: bool,
    pub online_search: bool,
}

impl EnabledProviders {
    pub fn from_config(config: &UpdateConfig) -> Self {
        Self {
            subscribe: config.open_subscribe,
            multicast: config.open_multicast,
            online_search: config.open_online_search,
        }
    }

    pub fn is_enabled(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Subscribe => self.subscribe,
            ProviderKind::Multicast => self.multicast,
            ProviderKind::OnlineSearch => self.online_search,
        }
    }

    /// Enabled kinds in priority order.
    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        ProviderKind::PRIORITY
            .into_iter()
            .filter(move |kind| self.is_enabled(*kind))
    }
}

/// A discovery backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Fetch candidates for the catalog's channels.
    ///
    /// `channel_names` are the catalog names in catalog order; providers that
    /// discover everything at once may ignore them.
    async fn fetch(
        &self,
        progress: SharedReporter,
        channel_names: Arc<[String]>,
    ) -> Result<ProviderResult>;
}

/// Results of every provider that ran.
pub type ProviderOutputs = HashMap<ProviderKind, ProviderResult>;

/// Registered provider backends.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn Provider>) -> Self {
        self.register(kind, provider);
        self
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn Provider>) {
        self.providers.insert(kind, provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).cloned()
    }

    /// Fail when an enabled kind has no backend.
    pub fn check(&self, enabled: EnabledProviders) -> Result<()> {
        for kind in enabled.kinds() {
            if !self.providers.contains_key(&kind) {
                return Err(Error::config(format!(
                    "provider '{kind}' is enabled but no backend is available"
                )));
            }
        }
        Ok(())
    }

    /// Run every enabled provider concurrently and wait for all of them.
    ///
    /// The first failure aborts the remaining providers and is returned.
    pub async fn fetch_all(
        &self,
        enabled: EnabledProviders,
        progress: SharedReporter,
        channel_names: Arc<[String]>,
        token: &CancellationToken,
    ) -> Result<ProviderOutputs> {
        self.check(enabled)?;

        let mut tasks = JoinSet::new();
        for kind in enabled.kinds() {
            let Some(provider) = self.get(kind) else {
                continue;
            };
            let progress = progress.clone();
            let names = channel_names.clone();
            debug!(provider = %kind, "Starting provider");
            tasks.spawn(async move { (kind, provider.fetch(progress, names).await) });
        }

        let mut outputs = ProviderOutputs::new();
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
                Some(Ok((kind, Ok(result)))) => {
                    info!(
                        provider = %kind,
                        channels = result.len(),
                        "Provider finished"
                    );
                    outputs.insert(kind, result);
                }
                Some(Ok((kind, Err(e)))) => {
                    tasks.shutdown().await;
                    if e.is_cancelled() {
                        return Err(e);
                    }
                    error!(provider = %kind, error = %e, "Provider failed");
                    return Err(match e {
                        Error::Provider { .. } => e,
                        other => Error::provider(kind.as_str(), other.to_string()),
                    });
                }
                Some(Err(e)) => {
                    tasks.shutdown().await;
                    error!(error = %e, "Provider task failed");
                    return Err(e.into());
                }
            }
        }

        Ok(outputs)
    }
}
