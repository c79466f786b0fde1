//! Integration tests for cancellation support in RunService.

use std::time::Duration;

use feedle_core::{FetchConfig, FetchJob, RunPlan, RunService, SourceKind, SourceRegistry};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::integration::common::{
    MockRecordStore, MockSourceClient, RecordingReporter, sample_records,
};

fn plan() -> RunPlan {
    RunPlan::new(
        vec![],
        vec![FetchJob::new("rust", FetchConfig::reddit(Some("rust")))],
    )
}

#[tokio::test]
async fn test_cancellation_before_start() {
    // Arrange
    let store = MockRecordStore::new();
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(3));
    let service = RunService::new(store.clone(), SourceRegistry::new().with(client.clone()));
    let reporter = RecordingReporter::new();

    let token = CancellationToken::new();
    token.cancel(); // Cancel immediately

    // Act
    let summary = service
        .run_with_progress_cancellable(&plan(), &reporter, token)
        .await
        .unwrap();

    // Assert
    assert!(summary.cancelled, "Summary should be marked cancelled");
    assert_eq!(summary.total_jobs(), 0);
    assert_eq!(client.calls(), 0);
    assert_eq!(store.len(), 0);
    assert_eq!(
        reporter.events().last().map(String::as_str),
        Some("run_cancelled:0")
    );
}

#[tokio::test]
async fn test_cancellation_during_fetch_discards_partial_results() {
    // Arrange
    let store = MockRecordStore::new();
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(5))
        .with_delay(Duration::from_secs(5));
    let service = RunService::new(store.clone(), SourceRegistry::new().with(client.clone()));
    let token = CancellationToken::new();

    // Act: spawn the run and cancel while the fetch is waiting
    let token_clone = token.clone();
    let handle = tokio::spawn(async move { service.run_cancellable(&plan(), token_clone).await });

    sleep(Duration::from_millis(50)).await;
    token.cancel();

    let summary = handle.await.unwrap().unwrap();

    // Assert
    assert!(summary.cancelled);
    assert_eq!(client.calls(), 1);
    assert_eq!(summary.failed_count(), 1);
    assert!(
        summary.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("cancelled")
    );
    assert_eq!(store.len(), 0, "Partial results must not be persisted");
}

#[tokio::test]
async fn test_uncancelled_token_runs_to_completion() {
    let store = MockRecordStore::new();
    let client = MockSourceClient::new(SourceKind::Reddit, sample_records(3));
    let service = RunService::new(store.clone(), SourceRegistry::new().with(client));

    let summary = service
        .run_cancellable(&plan(), CancellationToken::new())
        .await
        .unwrap();

    assert!(!summary.cancelled);
    assert_eq!(summary.total_saved(), 3);
}
