//! Trait definitions for external dependencies.
//!
//! The pipeline talks to two collaborators it does not own: content sources
//! reached over HTTP and a durable record store. Both are abstracted here so
//! the services in this crate can be exercised with in-memory mocks.
//!
//! # Example
//!
//! ```
//! use feedle_core::traits::RecordStore;
//! use feedle_core::AppError;
//! use uuid::Uuid;
//!
//! async fn stored_count<S: RecordStore>(store: &S, config_id: Uuid) -> Result<i64, AppError> {
//!     store.count(config_id).await
//! }
//! ```

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SourceKind;
use crate::error::{AppError, FetchError};
use crate::models::{FetchConfig, NormalizedRecord};

/// Client for one external content source.
///
/// Implementations handle authentication, pagination and mapping of the
/// source's payloads into [`NormalizedRecord`]s.
pub trait SourceClient: Send + Sync + Clone {
    /// Which source this client talks to.
    fn source(&self) -> SourceKind;

    /// Fetches records matching `config`.
    ///
    /// Records are de-duplicated by identifier within the call, keeping the
    /// first occurrence. A config with neither keywords nor a channel is
    /// rejected with [`AppError::NoQueryCriteria`] before any request.
    ///
    /// When `cancel` fires, pagination stops at the next page boundary and
    /// the records fetched so far are returned inside the [`FetchError`].
    fn fetch(
        &self,
        config: &FetchConfig,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Vec<NormalizedRecord>, FetchError>> + Send;
}

/// Store for record persistence and retrieval.
pub trait RecordStore: Send + Sync + Clone {
    /// Inserts a single record.
    fn create(&self, record: &NormalizedRecord) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Inserts a batch of records. The write is all-or-nothing.
    fn create_batch(
        &self,
        records: &[NormalizedRecord],
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Returns true if a record with this canonical URL is stored.
    fn exists_by_url(&self, url: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Returns true if a record from `source` with this native id is stored.
    fn exists_by_native_id(
        &self,
        source: &str,
        native_id: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Number of records owned by a fetch configuration.
    fn count(&self, config_id: Uuid) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Records of a configuration fetched at or after `since`, oldest first.
    fn list_since(
        &self,
        config_id: Uuid,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<NormalizedRecord>, AppError>> + Send;

    /// Most recently fetched records of a configuration, newest first.
    fn list_recent(
        &self,
        config_id: Uuid,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<NormalizedRecord>, AppError>> + Send;
}
