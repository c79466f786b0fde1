//! Batched writes with per-batch failure accounting.

use crate::models::NormalizedRecord;
use crate::traits::RecordStore;

/// Result of writing all batches.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records in batches that were written successfully.
    pub saved: usize,
    /// Number of batches attempted.
    pub batches: usize,
    /// One message per failed batch, carrying its 1-based index.
    pub errors: Vec<String>,
}

/// Splits records into contiguous batches and writes them in order.
///
/// A failed batch is recorded and skipped; later batches are still written
/// and the failed one is not retried.
pub struct BatchWriter<'a, S: RecordStore> {
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: RecordStore> BatchWriter<'a, S> {
    /// Creates a writer. A `batch_size` of zero falls back to 100.
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        let batch_size = if batch_size == 0 { 100 } else { batch_size };
        Self { store, batch_size }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn write(&self, records: &[NormalizedRecord]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            outcome.batches += 1;
            match self.store.create_batch(batch).await {
                Ok(()) => {
                    outcome.saved += batch.len();
                    tracing::debug!(batch = index + 1, size = batch.len(), "Batch saved");
                }
                Err(e) => {
                    let message = format!("Failed to save batch {}: {}", index + 1, e);
                    tracing::warn!(batch = index + 1, size = batch.len(), error = %e, "Batch write failed");
                    outcome.errors.push(message);
                }
            }
        }

        outcome
    }
}
