//! Duplicate detection against the record store.
//!
//! Each record is checked by canonical URL (when enabled) and then by
//! source-native id. The first positive match drops the record. A failed
//! check also drops it: the record might already be stored, so it is never
//! passed through, but the failure is reported instead of counted as a
//! duplicate.

use crate::models::NormalizedRecord;
use crate::traits::RecordStore;

/// Result of a filter pass.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// Records that are not stored yet, in input order.
    pub accepted: Vec<NormalizedRecord>,
    /// Records positively identified as already stored.
    pub duplicates: usize,
    /// One message per failed existence check.
    pub errors: Vec<String>,
}

/// Decision for a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    New,
    Duplicate,
    CheckFailed(String),
}

/// Filters out records already present in a [`RecordStore`].
pub struct DuplicateFilter<'a, S: RecordStore> {
    store: &'a S,
    skip_by_url: bool,
}

impl<'a, S: RecordStore> DuplicateFilter<'a, S> {
    pub fn new(store: &'a S, skip_by_url: bool) -> Self {
        Self { store, skip_by_url }
    }

    /// Runs the filter over `records`, consuming them.
    ///
    /// Checks run sequentially; a store error on one record never aborts the
    /// pass.
    pub async fn filter(&self, records: Vec<NormalizedRecord>) -> FilterOutcome {
        let mut outcome = FilterOutcome {
            accepted: Vec::with_capacity(records.len()),
            ..Default::default()
        };

        for record in records {
            match self.check(&record).await {
                Verdict::New => outcome.accepted.push(record),
                Verdict::Duplicate => outcome.duplicates += 1,
                Verdict::CheckFailed(message) => {
                    tracing::warn!(title = %record.title, "{}", message);
                    outcome.errors.push(message);
                }
            }
        }

        tracing::debug!(
            accepted = outcome.accepted.len(),
            duplicates = outcome.duplicates,
            check_errors = outcome.errors.len(),
            "Duplicate filter finished"
        );

        outcome
    }

    async fn check(&self, record: &NormalizedRecord) -> Verdict {
        let url = record.canonical_url().filter(|_| self.skip_by_url);
        if let Some(url) = url {
            match self.store.exists_by_url(url).await {
                Ok(true) => return Verdict::Duplicate,
                Ok(false) => {}
                Err(e) => {
                    return Verdict::CheckFailed(format!(
                        "Failed to check duplicate for URL {}: {}",
                        url, e
                    ));
                }
            }
        }

        if let Some(native_id) = record.native_id() {
            match self
                .store
                .exists_by_native_id(&record.source, native_id)
                .await
            {
                Ok(true) => return Verdict::Duplicate,
                Ok(false) => {}
                Err(e) => {
                    return Verdict::CheckFailed(format!(
                        "Failed to check duplicate for native ID {}: {}",
                        native_id, e
                    ));
                }
            }
        }

        Verdict::New
    }
}
