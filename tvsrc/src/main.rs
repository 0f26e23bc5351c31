mod console;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use tvsrc::config::UpdateConfig;
use tvsrc::domain::load_catalog;
use tvsrc::logging::{LoggingOptions, init_logging};
use tvsrc::pipeline::{RunOutcome, RunPaths, UpdatePipeline};
use tvsrc::probe::SpeedRanker;
use tvsrc::providers::{ProviderKind, ProviderSet, SubscribeProvider};
use tvsrc::utils::http_client::build_client;
use tvsrc::utils::url::PatternValidator;

use crate::console::ConsoleReporter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    match run().await {
        Ok(RunOutcome::Completed { final_file }) => {
            println!(
                "Update completed! Please check the {} file!",
                final_file.display()
            );
        }
        Ok(RunOutcome::Cancelled) => {
            println!("Update cancelled!");
        }
        Err(e) => {
            error!("Update failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<RunOutcome> {
    let config = UpdateConfig::load().context("Failed to load configuration")?;
    let paths = RunPaths::from_config(&config);

    let log_guard = init_logging(&LoggingOptions {
        working_log: paths.working_log.clone(),
        max_bytes: config.log_max_bytes,
        max_backups: config.log_backups,
    })
    .context("Failed to initialize logging")?;

    info!(
        source = %config.source_file.display(),
        user_config = config.user_config,
        "Loaded configuration"
    );

    let catalog = load_catalog(&config.source_file)
        .await
        .with_context(|| format!("Failed to load catalog {}", config.source_file.display()))?;

    let client = build_client(config.proxy.as_deref(), config.probe_timeout())
        .context("Failed to build HTTP client")?;
    let providers = ProviderSet::new().with_provider(
        ProviderKind::Subscribe,
        Arc::new(SubscribeProvider::new(
            client.clone(),
            config.subscribe_urls.clone(),
        )),
    );
    let ranker = Arc::new(SpeedRanker::new(client, config.probe_timeout()));
    let validator = Arc::new(PatternValidator::new(config.url_keywords_blacklist.clone())?);
    let reporter = Arc::new(ConsoleReporter::new());

    let pipeline = UpdatePipeline::new(config, catalog, providers, ranker, validator)
        .with_paths(paths)
        .with_reporter(reporter.clone())
        .with_log_guard(log_guard);

    let handle = pipeline.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });

    let outcome = pipeline.run().await;
    reporter.abandon();
    Ok(outcome?)
}
