//! End-to-end tests for the update pipeline.
//!
//! Providers and the ranker are replaced by in-memory fakes; every run writes
//! into its own temporary directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use tvsrc::config::UpdateConfig;
use tvsrc::domain::{CandidateRecord, ChannelCatalog};
use tvsrc::pipeline::{ProgressReporter, RunOutcome, RunPaths, SharedReporter, UpdatePipeline};
use tvsrc::probe::{Measured, Ranker, rank_measurements};
use tvsrc::providers::{Provider, ProviderKind, ProviderResult, ProviderSet};
use tvsrc::utils::url::PatternValidator;
use tvsrc::{Error, Result};

struct FixedProvider(ProviderResult);

#[async_trait]
impl Provider for FixedProvider {
    async fn fetch(&self, _: SharedReporter, _: Arc<[String]>) -> Result<ProviderResult> {
        Ok(self.0.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    async fn fetch(&self, _: SharedReporter, _: Arc<[String]>) -> Result<ProviderResult> {
        Err(Error::provider("subscribe", "upstream unavailable"))
    }
}

/// Response times by URL; unknown URLs are unreachable.
struct CannedRanker(HashMap<String, u64>);

#[async_trait]
impl Ranker for CannedRanker {
    async fn rank(&self, candidates: &[CandidateRecord]) -> Result<Vec<Measured>> {
        let measured = candidates
            .iter()
            .filter_map(|record| {
                self.0.get(&record.url).map(|ms| Measured {
                    record: record.clone(),
                    response_time_ms: *ms,
                })
            })
            .collect();
        Ok(rank_measurements(measured))
    }
}

/// Signals its first call and then never returns.
struct StallingRanker(Arc<Notify>);

#[async_trait]
impl Ranker for StallingRanker {
    async fn rank(&self, _: &[CandidateRecord]) -> Result<Vec<Measured>> {
        self.0.notify_one();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct Recording(Mutex<Vec<(String, u8, bool)>>);

impl ProgressReporter for Recording {
    fn report(&self, message: &str, percent: u8, done: bool) {
        self.0.lock().push((message.to_string(), percent, done));
    }
}

fn news_catalog() -> ChannelCatalog {
    ChannelCatalog::parse("News,#genre#\nCNN,rtmp://old1\n").unwrap()
}

fn subscribe_result(entries: &[(&str, &str, &str)]) -> ProviderResult {
    let mut result = ProviderResult::new();
    for (name, url, resolution) in entries {
        result.entry(name.to_string()).or_default().push(CandidateRecord::new(
            *url,
            None,
            Some(resolution.to_string()),
        ));
    }
    result
}

fn canned(times: &[(&str, u64)]) -> Arc<CannedRanker> {
    Arc::new(CannedRanker(
        times.iter().map(|(url, ms)| (url.to_string(), *ms)).collect(),
    ))
}

fn subscribe_only(result: ProviderResult) -> ProviderSet {
    ProviderSet::new().with_provider(ProviderKind::Subscribe, Arc::new(FixedProvider(result)))
}

fn pipeline(
    dir: &Path,
    config: UpdateConfig,
    catalog: ChannelCatalog,
    providers: ProviderSet,
    ranker: Arc<dyn Ranker>,
) -> UpdatePipeline {
    let paths = RunPaths::in_dir(dir, &config);
    let validator = Arc::new(PatternValidator::new(Vec::new()).unwrap());
    UpdatePipeline::new(config, catalog, providers, ranker, validator).with_paths(paths)
}

#[tokio::test]
async fn test_ranked_candidates_are_published() {
    let dir = tempfile::tempdir().unwrap();
    let providers = subscribe_only(subscribe_result(&[
        ("cnn", "http://a", "1080p"),
        ("cnn", "http://b", "720p"),
    ]));
    let ranker = canned(&[("http://a", 50), ("http://b", 30)]);

    let outcome = pipeline(dir.path(), UpdateConfig::default(), news_catalog(), providers, ranker)
        .run()
        .await
        .unwrap();

    let final_file = dir.path().join("result.txt");
    assert_eq!(outcome, RunOutcome::Completed { final_file: final_file.clone() });
    assert_eq!(
        std::fs::read_to_string(&final_file).unwrap(),
        "News,#genre#\nCNN,http://a\nCNN,http://b\n"
    );
    assert!(!dir.path().join("result_new.txt").exists());
}

#[tokio::test]
async fn test_invalid_urls_never_reach_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let providers = subscribe_only(subscribe_result(&[
        ("cnn", "not a url", "1080p"),
        ("cnn", "http://b", "720p"),
    ]));
    let config = UpdateConfig {
        open_sort: false,
        ..Default::default()
    };

    pipeline(dir.path(), config, news_catalog(), providers, canned(&[]))
        .run()
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("result.txt")).unwrap(),
        "News,#genre#\nCNN,http://b\n"
    );
}

#[tokio::test]
async fn test_catalog_fallback_without_provider_urls() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = ChannelCatalog::parse(
        "News,#genre#\nCNN,rtmp://old1\nCNN,rtmp://old2\nSports,#genre#\nESPN\n",
    )
    .unwrap();
    let config = UpdateConfig {
        open_sort: false,
        ..Default::default()
    };

    pipeline(dir.path(), config, catalog, subscribe_only(ProviderResult::new()), canned(&[]))
        .run()
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("result.txt")).unwrap(),
        "News,#genre#\nCNN,rtmp://old1\nCNN,rtmp://old2\nSports,#genre#\n"
    );
}

#[tokio::test]
async fn test_unreachable_channel_is_left_empty() {
    let dir = tempfile::tempdir().unwrap();
    let providers = subscribe_only(subscribe_result(&[("cnn", "http://down", "1080p")]));

    pipeline(dir.path(), UpdateConfig::default(), news_catalog(), providers, canned(&[]))
        .run()
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("result.txt")).unwrap(),
        "News,#genre#\n"
    );
}

#[tokio::test]
async fn test_identical_inputs_give_identical_files() {
    let catalog_text = "News,#genre#\nCNN,rtmp://old1\nBBC,rtmp://bbc\nSports,#genre#\nESPN\n";
    let entries = [
        ("cnn", "http://a", "1080p"),
        ("cnn", "http://b", "1080p"),
        ("espn", "http://e", "720p"),
        ("espn", "http://f", "1920x1080"),
    ];
    let times = [("http://a", 40), ("http://b", 20), ("http://e", 5), ("http://f", 90)];

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().unwrap();
        pipeline(
            dir.path(),
            UpdateConfig::default(),
            ChannelCatalog::parse(catalog_text).unwrap(),
            subscribe_only(subscribe_result(&entries)),
            canned(&times),
        )
        .run()
        .await
        .unwrap();
        outputs.push(std::fs::read(dir.path().join("result.txt")).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(
        String::from_utf8(outputs[0].clone()).unwrap(),
        "News,#genre#\nCNN,http://b\nCNN,http://a\nSports,#genre#\nESPN,http://f\nESPN,http://e\n"
    );
}

#[tokio::test]
async fn test_progress_is_monotonic_and_finishes_once() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = ChannelCatalog::parse(
        "News,#genre#\nCNN,rtmp://old1\nBBC,rtmp://bbc\nCCTV1,rtmp://cctv\n",
    )
    .unwrap();
    let providers = subscribe_only(subscribe_result(&[
        ("cnn", "http://a", "1080p"),
        ("bbc", "http://b", "720p"),
        ("cctv1", "http://c", "576p"),
    ]));
    let ranker = canned(&[("http://a", 1), ("http://b", 2), ("http://c", 3)]);
    let recording = Arc::new(Recording::default());

    pipeline(dir.path(), UpdateConfig::default(), catalog, providers, ranker)
        .with_reporter(recording.clone())
        .run()
        .await
        .unwrap();

    let events = recording.0.lock().clone();
    for stage in ["Sorting", "Writing"] {
        let percents: Vec<u8> = events
            .iter()
            .filter(|(message, _, _)| message.starts_with(stage))
            .map(|(_, percent, _)| *percent)
            .collect();
        assert!(!percents.is_empty(), "no events for {stage}");
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{stage}: {percents:?}");
        assert_eq!(percents.last(), Some(&100));
    }

    let done: Vec<_> = events.iter().filter(|(_, _, done)| *done).collect();
    assert_eq!(done.len(), 1);
    let (message, percent, _) = events.last().unwrap();
    assert!(*percent == 100 && message.contains("result.txt"));
}

#[tokio::test]
async fn test_cancel_keeps_previous_result() {
    let dir = tempfile::tempdir().unwrap();
    let final_file = dir.path().join("result.txt");
    std::fs::write(&final_file, "News,#genre#\nCNN,http://previous\n").unwrap();

    let started = Arc::new(Notify::new());
    let providers = subscribe_only(subscribe_result(&[("cnn", "http://a", "1080p")]));
    let pipeline = pipeline(
        dir.path(),
        UpdateConfig::default(),
        news_catalog(),
        providers,
        Arc::new(StallingRanker(started.clone())),
    );

    let handle = pipeline.handle();
    tokio::spawn(async move {
        started.notified().await;
        handle.stop();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("cancelled run did not finish")
        .unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(
        std::fs::read_to_string(&final_file).unwrap(),
        "News,#genre#\nCNN,http://previous\n"
    );
    assert!(!dir.path().join("result_new.txt").exists());
}

#[tokio::test]
async fn test_stop_before_run_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let providers = subscribe_only(subscribe_result(&[("cnn", "http://a", "1080p")]));
    let pipeline = pipeline(
        dir.path(),
        UpdateConfig::default(),
        news_catalog(),
        providers,
        canned(&[("http://a", 10)]),
    );

    pipeline.stop();
    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(!dir.path().join("result.txt").exists());
    assert!(!dir.path().join("result_new.txt").exists());
}

#[tokio::test]
async fn test_provider_failure_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let final_file = dir.path().join("result.txt");
    std::fs::write(&final_file, "untouched").unwrap();
    let providers =
        ProviderSet::new().with_provider(ProviderKind::Subscribe, Arc::new(FailingProvider));

    let err = pipeline(dir.path(), UpdateConfig::default(), news_catalog(), providers, canned(&[]))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { .. }));
    assert_eq!(std::fs::read_to_string(&final_file).unwrap(), "untouched");
}

#[tokio::test]
async fn test_enabled_provider_without_backend_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = UpdateConfig {
        open_multicast: true,
        ..Default::default()
    };

    let err = pipeline(
        dir.path(),
        config,
        news_catalog(),
        subscribe_only(ProviderResult::new()),
        canned(&[]),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
    assert!(!dir.path().join("result.txt").exists());
}
