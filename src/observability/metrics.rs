//! Metrics for the ETL stages
//!
//! Every metric name lives in [`MetricName`] so call sites never spell out
//! strings. Recording goes through the `metrics` facade; the binary installs
//! a Prometheus recorder and can render a snapshot at exit.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion
    IngestRowsRead,
    IngestRowsDropped,
    IngestRowsAppended,
    IngestChunksCommitted,
    IngestChunkSize,
    IngestDuration,

    // Enrichment
    EnrichDictionaryHits,
    EnrichFallbackTranslations,
    EnrichBlankItems,
    EnrichTranslationErrors,
    EnrichTranslationRetries,
    EnrichChunksCommitted,
    EnrichDuration,

    // Classification
    ClassifyRowsLabelled,
    ClassifyRowsExcluded,
    ClassifyIterations,
    ClassifyDuration,

    // Export
    ExportRowsWritten,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestRowsRead => "nutrition_etl_ingest_rows_read_total",
            MetricName::IngestRowsDropped => "nutrition_etl_ingest_rows_dropped_total",
            MetricName::IngestRowsAppended => "nutrition_etl_ingest_rows_appended_total",
            MetricName::IngestChunksCommitted => "nutrition_etl_ingest_chunks_committed_total",
            MetricName::IngestChunkSize => "nutrition_etl_ingest_chunk_size",
            MetricName::IngestDuration => "nutrition_etl_ingest_duration_seconds",

            MetricName::EnrichDictionaryHits => "nutrition_etl_enrich_dictionary_hits_total",
            MetricName::EnrichFallbackTranslations => "nutrition_etl_enrich_fallback_translations_total",
            MetricName::EnrichBlankItems => "nutrition_etl_enrich_blank_items_total",
            MetricName::EnrichTranslationErrors => "nutrition_etl_enrich_translation_errors_total",
            MetricName::EnrichTranslationRetries => "nutrition_etl_enrich_translation_retries_total",
            MetricName::EnrichChunksCommitted => "nutrition_etl_enrich_chunks_committed_total",
            MetricName::EnrichDuration => "nutrition_etl_enrich_duration_seconds",

            MetricName::ClassifyRowsLabelled => "nutrition_etl_classify_rows_labelled_total",
            MetricName::ClassifyRowsExcluded => "nutrition_etl_classify_rows_excluded_total",
            MetricName::ClassifyIterations => "nutrition_etl_classify_iterations",
            MetricName::ClassifyDuration => "nutrition_etl_classify_duration_seconds",

            MetricName::ExportRowsWritten => "nutrition_etl_export_rows_written_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = PROMETHEUS_HANDLE.set(handle);
    info!("Metrics recorder installed");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

pub mod ingest {
    use super::MetricName;

    pub fn rows_read(count: usize) {
        ::metrics::counter!(MetricName::IngestRowsRead.as_str()).increment(count as u64);
    }

    pub fn rows_dropped(count: usize) {
        ::metrics::counter!(MetricName::IngestRowsDropped.as_str()).increment(count as u64);
    }

    pub fn chunk_committed(rows: usize) {
        ::metrics::counter!(MetricName::IngestChunksCommitted.as_str()).increment(1);
        ::metrics::counter!(MetricName::IngestRowsAppended.as_str()).increment(rows as u64);
    }

    pub fn chunk_size(size: usize) {
        ::metrics::histogram!(MetricName::IngestChunkSize.as_str()).record(size as f64);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::IngestDuration.as_str()).record(secs);
    }
}

pub mod enrich {
    use super::MetricName;

    pub fn dictionary_hit() {
        ::metrics::counter!(MetricName::EnrichDictionaryHits.as_str()).increment(1);
    }

    pub fn fallback_translation() {
        ::metrics::counter!(MetricName::EnrichFallbackTranslations.as_str()).increment(1);
    }

    pub fn blank_item() {
        ::metrics::counter!(MetricName::EnrichBlankItems.as_str()).increment(1);
    }

    pub fn translation_error(transient: bool) {
        let kind = if transient { "transient" } else { "permanent" };
        ::metrics::counter!(MetricName::EnrichTranslationErrors.as_str(), "kind" => kind).increment(1);
    }

    pub fn translation_retry() {
        ::metrics::counter!(MetricName::EnrichTranslationRetries.as_str()).increment(1);
    }

    pub fn chunk_committed() {
        ::metrics::counter!(MetricName::EnrichChunksCommitted.as_str()).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::EnrichDuration.as_str()).record(secs);
    }
}

pub mod classify {
    use super::MetricName;

    pub fn rows_labelled(label: &str, count: usize) {
        ::metrics::counter!(MetricName::ClassifyRowsLabelled.as_str(), "category" => label.to_string())
            .increment(count as u64);
    }

    pub fn rows_excluded(count: usize) {
        ::metrics::counter!(MetricName::ClassifyRowsExcluded.as_str()).increment(count as u64);
    }

    pub fn iterations(count: usize) {
        ::metrics::histogram!(MetricName::ClassifyIterations.as_str()).record(count as f64);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::ClassifyDuration.as_str()).record(secs);
    }
}

pub mod export {
    use super::MetricName;

    pub fn rows_written(count: usize) {
        ::metrics::counter!(MetricName::ExportRowsWritten.as_str()).increment(count as u64);
    }
}
