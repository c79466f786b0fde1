//! Test utilities and mock implementations for integration tests.
//!
//! Provides in-memory implementations of the core traits for testing
//! `DataService` and `RunService` in isolation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use feedle_core::progress::{ProgressReporter, RunEvent};
use feedle_core::traits::{RecordStore, SourceClient};
use feedle_core::{AppError, FetchConfig, FetchError, NormalizedRecord, SourceKind};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// =============================================================================
// Sample data
// =============================================================================

/// Creates a Reddit-like record with a URL and native id.
pub fn sample_record(native_id: &str, url: &str) -> NormalizedRecord {
    let mut record = NormalizedRecord::new("reddit", format!("Post {}", native_id));
    record.id = Some(Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("reddit:{}", native_id).as_bytes(),
    ));
    record.source_item_id = Some(native_id.to_string());
    record.url = Some(url.to_string());
    record
}

/// Creates `n` distinct records named `p0..pN`.
pub fn sample_records(n: usize) -> Vec<NormalizedRecord> {
    (0..n)
        .map(|i| sample_record(&format!("p{}", i), &format!("https://x/{}", i)))
        .collect()
}

// =============================================================================
// MockRecordStore
// =============================================================================

/// In-memory record store with injectable failures.
#[derive(Clone, Default)]
pub struct MockRecordStore {
    records: Arc<Mutex<Vec<NormalizedRecord>>>,
    /// 1-based `create_batch` call numbers that fail.
    failing_batches: Arc<Mutex<HashSet<usize>>>,
    failing_urls: Arc<Mutex<HashSet<String>>>,
    failing_native_ids: Arc<Mutex<HashSet<String>>>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    existence_checks: Arc<AtomicUsize>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    pub fn with_records(records: Vec<NormalizedRecord>) -> Self {
        let store = Self::new();
        store.records.lock().unwrap().extend(records);
        store
    }

    pub fn fail_batch(&self, call_number: usize) {
        self.failing_batches.lock().unwrap().insert(call_number);
    }

    pub fn fail_url_check(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn fail_native_id_check(&self, native_id: &str) {
        self.failing_native_ids
            .lock()
            .unwrap()
            .insert(native_id.to_string());
    }

    pub fn stored(&self) -> Vec<NormalizedRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Sizes of every `create_batch` call, in call order, failed ones included.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn existence_checks(&self) -> usize {
        self.existence_checks.load(Ordering::SeqCst)
    }
}

impl RecordStore for MockRecordStore {
    async fn create(&self, record: &NormalizedRecord) -> Result<(), AppError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn create_batch(&self, records: &[NormalizedRecord]) -> Result<(), AppError> {
        let call_number = {
            let mut sizes = self.batch_sizes.lock().unwrap();
            sizes.push(records.len());
            sizes.len()
        };
        if self.failing_batches.lock().unwrap().contains(&call_number) {
            return Err(AppError::Generic("simulated batch failure".to_string()));
        }
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn exists_by_url(&self, url: &str) -> Result<bool, AppError> {
        self.existence_checks.fetch_add(1, Ordering::SeqCst);
        if self.failing_urls.lock().unwrap().contains(url) {
            return Err(AppError::NetworkError("store unreachable".to_string()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.url.as_deref() == Some(url)))
    }

    async fn exists_by_native_id(&self, source: &str, native_id: &str) -> Result<bool, AppError> {
        self.existence_checks.fetch_add(1, Ordering::SeqCst);
        if self.failing_native_ids.lock().unwrap().contains(native_id) {
            return Err(AppError::NetworkError("store unreachable".to_string()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.source == source && r.source_item_id.as_deref() == Some(native_id)))
    }

    async fn count(&self, config_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.config_id == Some(config_id))
            .count() as i64)
    }

    async fn list_since(
        &self,
        config_id: Uuid,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        let mut matching: Vec<NormalizedRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.config_id == Some(config_id))
            .filter(|r| r.fetched_at.is_some_and(|t| t >= since))
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.fetched_at);
        if let Some(limit) = limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn list_recent(
        &self,
        config_id: Uuid,
        limit: usize,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        let mut matching: Vec<NormalizedRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.config_id == Some(config_id))
            .cloned()
            .collect();
        matching.sort_by_key(|r| std::cmp::Reverse(r.fetched_at));
        matching.truncate(limit);
        Ok(matching)
    }
}

// =============================================================================
// MockSourceClient
// =============================================================================

/// Source client returning canned records.
#[derive(Clone)]
pub struct MockSourceClient {
    kind: SourceKind,
    records: Vec<NormalizedRecord>,
    fail_with: Option<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    configs: Arc<Mutex<Vec<FetchConfig>>>,
}

impl MockSourceClient {
    pub fn new(kind: SourceKind, records: Vec<NormalizedRecord>) -> Self {
        Self {
            kind,
            records,
            fail_with: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            configs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every fetch fails with a network error carrying `message`.
    pub fn failing(kind: SourceKind, message: &str) -> Self {
        let mut client = Self::new(kind, Vec::new());
        client.fail_with = Some(message.to_string());
        client
    }

    /// Waits `delay` before answering; cancellation during the wait returns
    /// the first record as a partial result.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn configs(&self) -> Vec<FetchConfig> {
        self.configs.lock().unwrap().clone()
    }
}

impl SourceClient for MockSourceClient {
    fn source(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(
        &self,
        config: &FetchConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<NormalizedRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config.clone());
        config.validate()?;

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    let partial = self.records.iter().take(1).cloned().collect();
                    return Err(FetchError::new(AppError::Cancelled, partial));
                }
            }
        }

        if let Some(message) = &self.fail_with {
            return Err(AppError::NetworkError(message.clone()).into());
        }

        Ok(self.records.clone())
    }
}

// =============================================================================
// RecordingReporter
// =============================================================================

/// Progress reporter that keeps a short description of every event.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn previews(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with("preview"))
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: RunEvent<'_>) {
        let line = match event {
            RunEvent::RunStarted { total_jobs, .. } => format!("run_started:{}", total_jobs),
            RunEvent::JobStarted { name, .. } => format!("job_started:{}", name),
            RunEvent::JobFetched { name, count } => format!("job_fetched:{}:{}", name, count),
            RunEvent::RecordPreview {
                position, record, ..
            } => format!("preview:[{}] {}", position, record.title),
            RunEvent::JobCompleted { name, .. } => format!("job_completed:{}", name),
            RunEvent::JobFailed { name, error, .. } => format!("job_failed:{}:{}", name, error),
            RunEvent::RunCancelled { completed_jobs, .. } => {
                format!("run_cancelled:{}", completed_jobs)
            }
            RunEvent::RunCompleted { .. } => "run_completed".to_string(),
        };
        self.events.lock().unwrap().push(line);
    }
}
