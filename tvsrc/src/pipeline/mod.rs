//! Update pipeline.
//!
//! A run goes through these stages, in order:
//!
//! ```text
//! providers ──▶ aggregate ──▶ probe (optional) ──▶ write ──▶ publish
//! ```
//!
//! Every stage observes the run's [`CancellationToken`]. A cancelled run
//! removes the working result and leaves the final files untouched.

pub mod aggregator;
pub mod progress;
pub mod publisher;
pub mod writer;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::UpdateConfig;
use crate::domain::ChannelCatalog;
use crate::logging::LogGuard;
use crate::probe::{ProbeScheduler, Ranker};
use crate::providers::{EnabledProviders, ProviderSet};
use crate::utils::fs::remove_file_quietly;
use crate::utils::url::UrlValidator;
use crate::{Error, Result};

pub use aggregator::aggregate;
pub use progress::{
    ChannelReporter, NoopReporter, ProgressReporter, ProgressUpdate, SharedReporter,
    StageProgress, noop_reporter,
};
pub use publisher::{Publisher, RunPaths};
pub use writer::ResultWriter;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The result was published to `final_file`.
    Completed { final_file: PathBuf },
    /// The run was stopped before publishing.
    Cancelled,
}

/// Stops a running pipeline from another task.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    token: CancellationToken,
}

impl PipelineHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// One update run over a channel catalog.
pub struct UpdatePipeline {
    config: UpdateConfig,
    paths: RunPaths,
    catalog: ChannelCatalog,
    providers: ProviderSet,
    ranker: Arc<dyn Ranker>,
    validator: Arc<dyn UrlValidator>,
    reporter: SharedReporter,
    token: CancellationToken,
    log_guard: Option<LogGuard>,
}

impl UpdatePipeline {
    pub fn new(
        config: UpdateConfig,
        catalog: ChannelCatalog,
        providers: ProviderSet,
        ranker: Arc<dyn Ranker>,
        validator: Arc<dyn UrlValidator>,
    ) -> Self {
        let paths = RunPaths::from_config(&config);
        Self {
            config,
            paths,
            catalog,
            providers,
            ranker,
            validator,
            reporter: noop_reporter(),
            token: CancellationToken::new(),
            log_guard: None,
        }
    }

    pub fn with_paths(mut self, paths: RunPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Hand over the run log so it is flushed and published with the result.
    pub fn with_log_guard(mut self, guard: LogGuard) -> Self {
        self.log_guard = Some(guard);
        self
    }

    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            token: self.token.clone(),
        }
    }

    /// Request cancellation of the run.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Run every stage and publish the result.
    pub async fn run(mut self) -> Result<RunOutcome> {
        self.config.validate()?;

        match self.run_stages().await {
            Ok(()) => {
                let final_file = self.paths.final_result.clone();
                self.reporter.report(
                    &format!(
                        "Update completed, please check the {} file",
                        final_file.display()
                    ),
                    100,
                    true,
                );
                Ok(RunOutcome::Completed { final_file })
            }
            Err(Error::Cancelled) => {
                warn!("Update cancelled");
                remove_file_quietly(&self.paths.working_result).await;
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    async fn run_stages(&mut self) -> Result<()> {
        let enabled = EnabledProviders::from_config(&self.config);
        self.providers.check(enabled)?;
        info!(
            channels = self.catalog.channel_count(),
            sort = self.config.open_sort,
            "Starting update"
        );

        let names: Arc<[String]> = Arc::from(self.catalog.channel_names());
        let outputs = self
            .providers
            .fetch_all(enabled, self.reporter.clone(), names, &self.token)
            .await?;

        let mut candidates = aggregate(&self.catalog, enabled, &outputs, self.validator.as_ref());

        if self.config.open_sort {
            candidates = ProbeScheduler::new(self.ranker.clone())
                .run(candidates, self.reporter.clone(), &self.token)
                .await?;
        }

        ResultWriter::new(&self.paths.working_result, self.config.urls_limit)
            .write(&self.catalog, &candidates, self.reporter.clone(), &self.token)
            .await?;

        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        info!(final_file = %self.paths.final_result.display(), "Update finished");
        if let Some(guard) = self.log_guard.take() {
            guard.close();
        }
        Publisher::new(self.paths.clone()).publish().await?;
        Ok(())
    }
}
