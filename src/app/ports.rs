use async_trait::async_trait;

use crate::domain::{NewRecord, Record, RecordField};
use crate::error::{Result, TranslationError};

/// Persistent home of the nutrition records.
///
/// Every write is atomic per call: a batch either commits whole or leaves
/// storage as it was.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Append records in one transaction.
    async fn append(&self, records: &[NewRecord]) -> Result<usize>;

    /// Every record, ascending by id.
    async fn query_all(&self) -> Result<Vec<Record>>;

    /// Up to `limit` records with id greater than `after_id`, ascending by id.
    async fn query_page(&self, after_id: Option<i64>, limit: usize) -> Result<Vec<Record>>;

    async fn update_field(&self, id: i64, field: RecordField, value: Option<&str>) -> Result<()>;

    /// Update one field on many rows in one transaction.
    async fn update_fields(&self, field: RecordField, updates: &[(i64, Option<String>)]) -> Result<()>;

    async fn count(&self) -> Result<usize>;

    /// Any single stored record, used to estimate row footprint.
    async fn sample(&self) -> Result<Option<Record>>;

    /// Drop every record and the ingest history.
    async fn reset(&self) -> Result<()>;

    /// Whether a source with this digest has already been ingested.
    async fn has_ingested(&self, digest: &str) -> Result<bool>;

    async fn mark_ingested(&self, digest: &str, source_name: &str, rows: usize) -> Result<()>;
}

/// Word-level translation service.
#[async_trait]
pub trait TranslatorPort: Send + Sync {
    async fn translate_word(&self, word: &str, target_language: &str) -> std::result::Result<String, TranslationError>;
}

/// Reports how many bytes a chunk may draw on right now.
pub trait CapacityEstimator: Send + Sync {
    fn estimate(&self) -> u64;
}
