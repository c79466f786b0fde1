//! Persistence service for fetched records.
//!
//! [`DataService`] is the single entry point for writing and reading
//! records. Saving routes records through the [`DuplicateFilter`] and then
//! the [`BatchWriter`], and folds both outcomes into one [`SaveResult`].
//!
//! # Example
//!
//! ```ignore
//! use feedle_core::{DataService, SaveOptions};
//!
//! let service = DataService::new(repo);
//! let result = service.save(records, &SaveOptions::default()).await;
//! println!("{}", result.summary());
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::batch::BatchWriter;
use crate::config::SaveOptions;
use crate::dedup::DuplicateFilter;
use crate::error::AppError;
use crate::models::{DataStats, NormalizedRecord};
use crate::summary::SaveResult;
use crate::traits::RecordStore;

/// Service for persisting and querying fetched records.
///
/// # Type Parameters
///
/// * `S` - Record store implementation (e.g., `RecordRepository`)
#[derive(Clone)]
pub struct DataService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> DataService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deduplicates and persists `records`.
    ///
    /// Never fails as a whole: duplicate-check failures and batch write
    /// failures are reported in [`SaveResult::errors`].
    pub async fn save(&self, mut records: Vec<NormalizedRecord>, opts: &SaveOptions) -> SaveResult {
        if records.is_empty() {
            return SaveResult::default();
        }

        let mut result = SaveResult::new(records.len());
        let now = Utc::now();
        for record in &mut records {
            if record.config_id.is_none() {
                record.config_id = opts.config_id;
            }
            if record.fetched_at.is_none() {
                record.fetched_at = Some(now);
            }
        }

        let filtered = DuplicateFilter::new(&self.store, opts.skip_duplicates_by_url)
            .filter(records)
            .await;
        result.duplicates = filtered.duplicates;
        result.errors.extend(filtered.errors);

        if !filtered.accepted.is_empty() {
            let written = BatchWriter::new(&self.store, opts.effective_batch_size())
                .write(&filtered.accepted)
                .await;
            result.saved = written.saved;
            result.errors.extend(written.errors);
        }

        result.finalize();

        tracing::info!(
            total = result.total,
            saved = result.saved,
            duplicates = result.duplicates,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Records saved"
        );

        result
    }

    /// Persists a single record without duplicate checks.
    pub async fn save_one(&self, mut record: NormalizedRecord) -> Result<(), AppError> {
        if record.fetched_at.is_none() {
            record.fetched_at = Some(Utc::now());
        }
        self.store.create(&record).await
    }

    /// Most recently fetched records of a configuration.
    pub async fn recent(
        &self,
        config_id: Uuid,
        limit: usize,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        self.store.list_recent(config_id, limit).await
    }

    /// Records of a configuration fetched at or after `since`.
    pub async fn since(
        &self,
        config_id: Uuid,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        self.store.list_since(config_id, since, limit).await
    }

    /// Record count and last fetch time for a configuration.
    pub async fn stats(&self, config_id: Uuid) -> Result<DataStats, AppError> {
        let total_count = self.store.count(config_id).await?;
        let last_fetched_at = self
            .store
            .list_recent(config_id, 1)
            .await?
            .into_iter()
            .next()
            .and_then(|r| r.fetched_at);

        Ok(DataStats {
            total_count,
            last_fetched_at,
        })
    }
}
