//! Tests for `RunService` orchestration.

use std::time::Duration;

use feedle_core::{
    AppError, FetchConfig, FetchConfigDetail, FetchJob, RunConfig, RunPlan, RunService,
    SourceKind, SourceRegistry, YouTubeOptions,
};
use uuid::Uuid;

use crate::integration::common::{
    MockRecordStore, MockSourceClient, RecordingReporter, sample_record, sample_records,
};

fn reddit_job(name: &str) -> FetchJob {
    FetchJob::new(name, FetchConfig::reddit(Some(name)))
}

fn youtube_job(channel: &str) -> FetchJob {
    FetchJob::new(
        channel,
        FetchConfig::new(FetchConfigDetail::YouTube(YouTubeOptions {
            channel_id: Some(channel.to_string()),
            ..Default::default()
        })),
    )
}

fn youtube_records(n: usize) -> Vec<feedle_core::NormalizedRecord> {
    (0..n)
        .map(|i| {
            let mut record = sample_record(&format!("yt{}", i), &format!("https://yt/{}", i));
            record.source = "youtube".to_string();
            record
        })
        .collect()
}

#[tokio::test]
async fn test_run_all_sources_when_none_selected() {
    // Arrange
    let store = MockRecordStore::new();
    let reddit = MockSourceClient::new(SourceKind::Reddit, sample_records(2));
    let youtube = MockSourceClient::new(SourceKind::YouTube, youtube_records(3));
    let registry = SourceRegistry::new()
        .with(reddit.clone())
        .with(youtube.clone());
    let service = RunService::new(store.clone(), registry);
    let plan = RunPlan::new(vec![], vec![reddit_job("rust"), youtube_job("UC123")]);

    // Act
    let summary = service.run(&plan).await.unwrap();

    // Assert
    assert_eq!(summary.total_jobs(), 2);
    assert_eq!(summary.successful_count(), 2);
    assert_eq!(summary.total_fetched(), 5);
    assert_eq!(summary.total_saved(), 5);
    assert_eq!(reddit.calls(), 1);
    assert_eq!(youtube.calls(), 1);
    assert_eq!(store.len(), 5);
    assert!(!summary.cancelled);
}

#[tokio::test]
async fn test_run_only_selected_source() {
    let reddit = MockSourceClient::new(SourceKind::Reddit, sample_records(2));
    let youtube = MockSourceClient::new(SourceKind::YouTube, youtube_records(3));
    let registry = SourceRegistry::new()
        .with(reddit.clone())
        .with(youtube.clone());
    let service = RunService::new(MockRecordStore::new(), registry);
    let plan = RunPlan::new(
        vec!["youtube".to_string()],
        vec![reddit_job("rust"), youtube_job("UC123")],
    );

    let summary = service.run(&plan).await.unwrap();

    assert_eq!(summary.total_jobs(), 1);
    assert_eq!(summary.results[0].source, SourceKind::YouTube);
    assert_eq!(reddit.calls(), 0);
}

#[tokio::test]
async fn test_unknown_source_name_fails_before_any_fetch() {
    let reddit = MockSourceClient::new(SourceKind::Reddit, sample_records(2));
    let service = RunService::new(
        MockRecordStore::new(),
        SourceRegistry::new().with(reddit.clone()),
    );
    let plan = RunPlan::new(
        vec!["reddit".to_string(), "friendster".to_string()],
        vec![reddit_job("rust")],
    );

    let err = service.run(&plan).await.unwrap_err();

    assert!(matches!(err, AppError::UnsupportedSource(_)));
    assert_eq!(reddit.calls(), 0);
}

#[tokio::test]
async fn test_unregistered_selected_source_fails_alone() {
    // Arrange
    let store = MockRecordStore::new();
    let reddit = MockSourceClient::new(SourceKind::Reddit, sample_records(2));
    let service = RunService::new(store.clone(), SourceRegistry::new().with(reddit.clone()));
    let plan = RunPlan::new(
        vec!["reddit".to_string(), "youtube".to_string()],
        vec![reddit_job("rust")],
    );

    // Act
    let summary = service.run(&plan).await.unwrap();

    // Assert
    assert_eq!(reddit.calls(), 1);
    assert_eq!(store.len(), 2);
    assert_eq!(summary.total_jobs(), 2);
    assert!(summary.results[0].success);
    let youtube = &summary.results[1];
    assert_eq!(youtube.source, SourceKind::YouTube);
    assert!(!youtube.success);
    assert_eq!(youtube.error.as_deref(), Some("Unsupported source: youtube"));
}

#[tokio::test]
async fn test_job_for_unregistered_source_is_reported() {
    // Arrange
    let reddit = MockSourceClient::new(SourceKind::Reddit, sample_records(1));
    let service = RunService::new(
        MockRecordStore::new(),
        SourceRegistry::new().with(reddit.clone()),
    );
    let plan = RunPlan::new(vec![], vec![reddit_job("rust"), youtube_job("talks")]);

    // Act
    let summary = service.run(&plan).await.unwrap();

    // Assert
    let names: Vec<&str> = summary.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["rust", "talks"]);
    assert_eq!(summary.successful_count(), 1);
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.failed_sources(), vec![SourceKind::YouTube]);
    assert_eq!(
        summary.results[1].error.as_deref(),
        Some("Unsupported source: youtube")
    );
    assert_eq!(reddit.calls(), 1);
}

#[tokio::test]
async fn test_failed_source_does_not_stop_others() {
    // Arrange
    let store = MockRecordStore::new();
    let registry = SourceRegistry::new()
        .with(MockSourceClient::failing(SourceKind::Reddit, "boom"))
        .with(MockSourceClient::new(SourceKind::YouTube, youtube_records(2)));
    let service = RunService::new(store.clone(), registry);
    let plan = RunPlan::new(vec![], vec![reddit_job("rust"), youtube_job("UC123")]);

    // Act
    let summary = service.run(&plan).await.unwrap();

    // Assert
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.successful_count(), 1);
    assert_eq!(summary.failed_sources(), vec![SourceKind::Reddit]);
    let failed = &summary.results[0];
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().starts_with("failed to fetch:"));
    assert!(failed.error.as_deref().unwrap().contains("boom"));
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_invalid_config_fails_job() {
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(1));
    let service = RunService::new(MockRecordStore::new(), SourceRegistry::new().with(client));
    let plan = RunPlan::new(vec![], vec![FetchJob::new("empty", FetchConfig::reddit(None))]);

    let summary = service.run(&plan).await.unwrap();

    assert_eq!(summary.failed_count(), 1);
    assert!(
        summary.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("keywords or a channel")
    );
}

#[tokio::test]
async fn test_selected_source_without_job_is_a_failure() {
    let registry = SourceRegistry::new()
        .with(MockSourceClient::new(SourceKind::Reddit, sample_records(1)))
        .with(MockSourceClient::new(SourceKind::YouTube, youtube_records(1)));
    let service = RunService::new(MockRecordStore::new(), registry);
    let plan = RunPlan::new(vec![], vec![reddit_job("rust")]);

    let summary = service.run(&plan).await.unwrap();

    assert_eq!(summary.total_jobs(), 2);
    let youtube = &summary.results[1];
    assert_eq!(youtube.source, SourceKind::YouTube);
    assert!(!youtube.success);
    assert_eq!(
        youtube.error.as_deref(),
        Some("no fetch configuration for source 'youtube'")
    );
}

#[tokio::test]
async fn test_dry_run_previews_without_writing() {
    // Arrange
    let store = MockRecordStore::new();
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(5));
    let service = RunService::with_config(
        store.clone(),
        SourceRegistry::new().with(client),
        RunConfig::default().with_dry_run(),
    );
    let reporter = RecordingReporter::new();
    let plan = RunPlan::new(vec![], vec![reddit_job("rust")]);

    // Act
    let summary = service.run_with_progress(&plan, &reporter).await.unwrap();

    // Assert
    assert_eq!(store.len(), 0);
    assert!(store.batch_sizes().is_empty());
    assert_eq!(store.existence_checks(), 0);
    let result = summary.results[0].result.as_ref().unwrap();
    assert_eq!(result.total, 5);
    assert_eq!(result.saved, 0);
    assert_eq!(result.skipped, 5);
    assert_eq!(
        reporter.previews(),
        vec![
            "preview:[1] Post p0",
            "preview:[2] Post p1",
            "preview:[3] Post p2"
        ]
    );
}

#[tokio::test]
async fn test_job_config_id_is_stamped_on_records() {
    let store = MockRecordStore::new();
    let config_id = Uuid::new_v4();
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(2));
    let service = RunService::new(store.clone(), SourceRegistry::new().with(client));
    let plan = RunPlan::new(
        vec![],
        vec![reddit_job("rust").with_config_id(Some(config_id))],
    );

    let summary = service.run(&plan).await.unwrap();

    assert_eq!(summary.results[0].config_id, Some(config_id));
    assert!(store.stored().iter().all(|r| r.config_id == Some(config_id)));
}

#[tokio::test]
async fn test_second_run_reports_duplicates() {
    let store = MockRecordStore::new();
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(4));
    let service = RunService::new(store.clone(), SourceRegistry::new().with(client));
    let plan = RunPlan::new(vec![], vec![reddit_job("rust")]);

    service.run(&plan).await.unwrap();
    let second = service.run(&plan).await.unwrap();

    assert_eq!(second.total_saved(), 0);
    assert_eq!(second.total_duplicates(), 4);
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_concurrent_run_keeps_plan_order() {
    // Arrange: first job is slower than the second
    let slow = MockSourceClient::new(SourceKind::Reddit, sample_records(1))
        .with_delay(Duration::from_millis(100));
    let fast = MockSourceClient::new(SourceKind::YouTube, youtube_records(1));
    let registry = SourceRegistry::new().with(slow).with(fast);
    let service = RunService::with_config(
        MockRecordStore::new(),
        registry,
        RunConfig::default().with_concurrency(2),
    );
    let plan = RunPlan::new(vec![], vec![reddit_job("rust"), youtube_job("UC123")]);

    // Act
    let summary = service.run(&plan).await.unwrap();

    // Assert
    let names: Vec<_> = summary.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["rust", "UC123"]);
    assert_eq!(summary.successful_count(), 2);
}

#[tokio::test]
async fn test_progress_events_are_emitted_in_order() {
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(2));
    let service = RunService::new(MockRecordStore::new(), SourceRegistry::new().with(client));
    let reporter = RecordingReporter::new();
    let plan = RunPlan::new(vec![], vec![reddit_job("rust")]);

    service.run_with_progress(&plan, &reporter).await.unwrap();

    assert_eq!(
        reporter.events(),
        vec![
            "run_started:1",
            "job_started:rust",
            "job_fetched:rust:2",
            "job_completed:rust",
            "run_completed"
        ]
    );
}
