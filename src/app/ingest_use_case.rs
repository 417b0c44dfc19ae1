use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::app::ports::{CapacityEstimator, StoragePort};
use crate::constants::{is_nutrition_column, ITEM_COLUMN, RESTAURANT_COLUMN};
use crate::domain::{NewRecord, Nutrition, SourceRow};
use crate::error::{EtlError, Result};
use crate::infra::csv_source::CsvSource;
use crate::pipeline::chunking::ChunkPlan;
use crate::pipeline::processing::{clean_identifier, filter_complete};

/// Where the stored fields sit in a source header.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub restaurant: usize,
    pub item: usize,
    /// Known nutrition columns present in the source; others are ignored
    pub nutrition: Vec<(usize, String)>,
}

impl ColumnLayout {
    pub fn from_headers(headers: &[String], source_name: &str) -> Result<Self> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| EtlError::MissingColumn {
                    source_name: source_name.to_string(),
                    column: column.to_string(),
                })
        };
        Ok(Self {
            restaurant: position(RESTAURANT_COLUMN)?,
            item: position(ITEM_COLUMN)?,
            nutrition: headers
                .iter()
                .enumerate()
                .filter(|(_, h)| is_nutrition_column(h))
                .map(|(i, h)| (i, h.clone()))
                .collect(),
        })
    }
}

/// Clean, filter and convert one chunk of source rows.
///
/// An item name that cleans down to nothing counts as a missing value.
pub fn prepare_chunk(rows: Vec<SourceRow>, layout: &ColumnLayout) -> Vec<NewRecord> {
    let cleaned: Vec<SourceRow> = rows
        .into_iter()
        .map(|mut row| {
            if let Some(slot) = row.values.get_mut(layout.item) {
                *slot = slot
                    .as_deref()
                    .map(clean_identifier)
                    .filter(|item| !item.is_empty());
            }
            row
        })
        .collect();

    filter_complete(cleaned)
        .into_iter()
        .map(|row| {
            let nutrition: Nutrition = layout
                .nutrition
                .iter()
                .filter_map(|(index, column)| row.get(*index).map(|v| (column.clone(), v.trim().to_string())))
                .collect();
            NewRecord {
                restaurant: row.get(layout.restaurant).unwrap_or_default().trim().to_string(),
                item: row.get(layout.item).unwrap_or_default().to_string(),
                nutrition,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source_name: String,
    pub source_digest: String,
    /// True when the source had been ingested before and nothing was written
    pub skipped: bool,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub chunk_size: usize,
    pub planned_chunks: usize,
    pub chunks_committed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Loads a delimited source into storage in memory-sized chunks.
pub struct IngestionEngine {
    storage: Arc<dyn StoragePort>,
    capacity: Arc<dyn CapacityEstimator>,
    fraction: f64,
    required_columns: Vec<String>,
}

impl IngestionEngine {
    /// `features` are required in the source header alongside restaurant and item.
    pub fn new(
        storage: Arc<dyn StoragePort>,
        capacity: Arc<dyn CapacityEstimator>,
        fraction: f64,
        features: &[String],
    ) -> Self {
        let mut required_columns = vec![RESTAURANT_COLUMN.to_string(), ITEM_COLUMN.to_string()];
        required_columns.extend(features.iter().cloned());
        Self {
            storage,
            capacity,
            fraction,
            required_columns,
        }
    }

    /// Header check only; touches no storage.
    pub fn check_source(&self, source: &CsvSource) -> Result<ColumnLayout> {
        let headers = source.validate_header(&self.required_columns)?;
        ColumnLayout::from_headers(&headers, source.name())
    }

    #[instrument(skip(self, source), fields(source = %source.name()))]
    pub async fn ingest(&self, source: &CsvSource, force: bool) -> Result<IngestReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let layout = self.check_source(source)?;
        let source_digest = source.digest()?;

        let mut report = IngestReport {
            source_name: source.name().to_string(),
            source_digest: source_digest.clone(),
            skipped: false,
            rows_read: 0,
            rows_kept: 0,
            rows_dropped: 0,
            chunk_size: 0,
            planned_chunks: 0,
            chunks_committed: 0,
            started_at,
            finished_at: started_at,
        };

        if !force && self.storage.has_ingested(&source_digest).await? {
            warn!(
                "Source {} (sha256 {}) was already ingested, skipping",
                source.name(),
                &source_digest[..12]
            );
            report.skipped = true;
            report.finished_at = Utc::now();
            return Ok(report);
        }

        let row_count = source.count_rows()?;
        let per_row_bytes = source.first_row_footprint()?;
        let plan = ChunkPlan::compute(row_count, per_row_bytes, self.capacity.estimate(), self.fraction);
        report.chunk_size = plan.chunk_size;
        report.planned_chunks = plan.chunk_count(row_count);
        crate::observability::metrics::ingest::chunk_size(plan.chunk_size);
        info!(
            "Ingesting {} rows from {} in {} chunks of {}",
            row_count,
            source.name(),
            report.planned_chunks,
            plan.chunk_size
        );

        let mut rows = source.rows()?;
        let mut chunk_index = 0;
        loop {
            let chunk = rows
                .by_ref()
                .take(plan.chunk_size)
                .collect::<Result<Vec<SourceRow>>>()
                .map_err(|e| EtlError::ChunkRead {
                    source_name: source.name().to_string(),
                    chunk_index,
                    source: Box::new(e),
                })?;
            if chunk.is_empty() {
                break;
            }

            let read = chunk.len();
            let records = prepare_chunk(chunk, &layout);
            let dropped = read - records.len();

            self.storage
                .append(&records)
                .await
                .map_err(|e| EtlError::ChunkAppend {
                    source_name: source.name().to_string(),
                    chunk_index,
                    source: Box::new(e),
                })?;

            report.rows_read += read;
            report.rows_kept += records.len();
            report.rows_dropped += dropped;
            report.chunks_committed += 1;
            crate::observability::metrics::ingest::rows_read(read);
            crate::observability::metrics::ingest::rows_dropped(dropped);
            crate::observability::metrics::ingest::chunk_committed(records.len());
            info!(
                "Chunk {} committed: {} rows kept, {} dropped",
                chunk_index,
                records.len(),
                dropped
            );
            chunk_index += 1;
        }

        self.storage
            .mark_ingested(&source_digest, source.name(), report.rows_kept)
            .await?;

        report.finished_at = Utc::now();
        crate::observability::metrics::ingest::duration(timer.elapsed().as_secs_f64());
        info!(
            "Ingestion of {} finished: {} kept, {} dropped, {} chunks",
            source.name(),
            report.rows_kept,
            report.rows_dropped,
            report.chunks_committed
        );
        Ok(report)
    }
}
