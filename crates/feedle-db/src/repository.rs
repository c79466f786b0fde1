//! Fetched-record repository for PostgreSQL.
//!
//! Records live in the `fetched_data` table (see `migrations/`). Batch
//! inserts run inside a transaction, so a batch is stored completely or not
//! at all.

use chrono::{DateTime, Utc};
use feedle_core::error::AppError;
use feedle_core::models::NormalizedRecord;
use feedle_core::traits::RecordStore;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Column list for SELECT queries. Must remain a const literal to ensure SQL safety
/// since format!() bypasses sqlx compile-time validation.
const RECORD_COLUMNS: &str = "id, config_id, source, source_item_id, title, content, url, author_name, author_id, published_at, tags, metadata, media_urls, fetched_at";

const INSERT_RECORD: &str = r#"
    INSERT INTO fetched_data (
        id,
        config_id,
        source,
        source_item_id,
        title,
        content,
        url,
        author_name,
        author_id,
        published_at,
        tags,
        metadata,
        media_urls,
        fetched_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
"#;

/// Repository for fetched records in PostgreSQL.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use feedle_db::RecordRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/feedle")
///     .await?;
///
/// let repo = RecordRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RecordRepository {
    pool: Pool<Postgres>,
}

impl RecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a single record. Returns the id of the stored row.
    pub async fn create(&self, record: &NormalizedRecord) -> Result<Uuid, AppError> {
        let id = record.id.unwrap_or_else(Uuid::new_v4);
        bind_record(sqlx::query(INSERT_RECORD), id, record)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(id)
    }

    /// Inserts all records in one transaction.
    ///
    /// Any failing row rolls back the whole batch.
    pub async fn create_batch(&self, records: &[NormalizedRecord]) -> Result<u64, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;
        for record in records {
            let id = record.id.unwrap_or_else(Uuid::new_v4);
            bind_record(sqlx::query(INSERT_RECORD), id, record)
                .execute(&mut *tx)
                .await
                .map_err(AppError::DatabaseError)?;
        }
        tx.commit().await.map_err(AppError::DatabaseError)?;

        Ok(records.len() as u64)
    }

    /// Retrieves a record by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<NormalizedRecord>, AppError> {
        let query = format!("SELECT {} FROM fetched_data WHERE id = $1", RECORD_COLUMNS);
        let row = sqlx::query_as::<_, RecordRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(row.map(NormalizedRecord::from))
    }

    /// Deletes a record. Returns true if a row was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM fetched_data WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists_by_url(&self, url: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM fetched_data WHERE url = $1)")
                .bind(url)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;
        Ok(exists)
    }

    /// Checks for a stored record with the same source-native id.
    ///
    /// Native ids are only unique within a source.
    pub async fn exists_by_native_id(&self, source: &str, native_id: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM fetched_data WHERE source = $1 AND source_item_id = $2)",
        )
        .bind(source)
        .bind(native_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;
        Ok(exists)
    }

    pub async fn count(&self, config_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM fetched_data WHERE config_id = $1")
                .bind(config_id)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;
        Ok(count)
    }

    /// Records of a configuration fetched at or after `since`, oldest first.
    ///
    /// `limit = None` returns every match (`LIMIT NULL`).
    pub async fn list_since(
        &self,
        config_id: Uuid,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM fetched_data WHERE config_id = $1 AND fetched_at >= $2 ORDER BY fetched_at ASC LIMIT $3",
            RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(config_id)
            .bind(since)
            .bind(limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rows.into_iter().map(NormalizedRecord::from).collect())
    }

    /// Most recently fetched records of a configuration, newest first.
    pub async fn list_recent(
        &self,
        config_id: Uuid,
        limit: usize,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM fetched_data WHERE config_id = $1 ORDER BY fetched_at DESC LIMIT $2",
            RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(config_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rows.into_iter().map(NormalizedRecord::from).collect())
    }

    /// Checks database connectivity by executing a simple query.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }
}

fn bind_record<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    id: Uuid,
    record: &'q NormalizedRecord,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(id)
        .bind(record.config_id)
        .bind(&record.source)
        .bind(&record.source_item_id)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.url)
        .bind(&record.author_name)
        .bind(&record.author_id)
        .bind(record.published_at)
        .bind(&record.tags)
        .bind(Json(&record.metadata))
        .bind(&record.media_urls)
        .bind(record.fetched_at.unwrap_or_else(Utc::now))
}

/// Row shape of `fetched_data`.
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    config_id: Option<Uuid>,
    source: String,
    source_item_id: Option<String>,
    title: String,
    content: Option<String>,
    url: Option<String>,
    author_name: Option<String>,
    author_id: Option<String>,
    published_at: Option<DateTime<Utc>>,
    tags: Vec<String>,
    metadata: Json<Value>,
    media_urls: Vec<String>,
    fetched_at: DateTime<Utc>,
}

impl From<RecordRow> for NormalizedRecord {
    fn from(row: RecordRow) -> Self {
        let metadata = match row.metadata.0 {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        NormalizedRecord {
            id: Some(row.id),
            config_id: row.config_id,
            source: row.source,
            source_item_id: row.source_item_id,
            title: row.title,
            content: row.content,
            url: row.url,
            author_name: row.author_name,
            author_id: row.author_id,
            published_at: row.published_at,
            tags: row.tags,
            metadata,
            media_urls: row.media_urls,
            fetched_at: Some(row.fetched_at),
        }
    }
}

// =============================================================================
// Trait Implementation: RecordStore
// =============================================================================

impl RecordStore for RecordRepository {
    async fn create(&self, record: &NormalizedRecord) -> Result<(), AppError> {
        RecordRepository::create(self, record).await?;
        Ok(())
    }

    async fn create_batch(&self, records: &[NormalizedRecord]) -> Result<(), AppError> {
        RecordRepository::create_batch(self, records).await?;
        Ok(())
    }

    async fn exists_by_url(&self, url: &str) -> Result<bool, AppError> {
        RecordRepository::exists_by_url(self, url).await
    }

    async fn exists_by_native_id(&self, source: &str, native_id: &str) -> Result<bool, AppError> {
        RecordRepository::exists_by_native_id(self, source, native_id).await
    }

    async fn count(&self, config_id: Uuid) -> Result<i64, AppError> {
        RecordRepository::count(self, config_id).await
    }

    async fn list_since(
        &self,
        config_id: Uuid,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        RecordRepository::list_since(self, config_id, since, limit).await
    }

    async fn list_recent(
        &self,
        config_id: Uuid,
        limit: usize,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        RecordRepository::list_recent(self, config_id, limit).await
    }
}
