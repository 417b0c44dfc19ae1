use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::app::ports::{CapacityEstimator, StoragePort, TranslatorPort};
use crate::domain::{Footprint, Record, RecordField};
use crate::error::{EtlError, Result, TranslationError};
use crate::pipeline::chunking::ChunkPlan;
use crate::pipeline::processing::TranslationDictionary;

/// How an item got its translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationSource {
    Dictionary,
    Service,
    /// Nothing to translate
    Empty,
}

/// Yields stored records in ascending id order, one page per call.
pub struct RecordPages<'a> {
    storage: &'a dyn StoragePort,
    page_size: usize,
    after_id: Option<i64>,
    exhausted: bool,
}

impl<'a> RecordPages<'a> {
    pub fn new(storage: &'a dyn StoragePort, page_size: usize) -> Self {
        Self {
            storage,
            page_size: page_size.max(1),
            after_id: None,
            exhausted: false,
        }
    }

    /// `None` once every record has been handed out.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self.storage.query_page(self.after_id, self.page_size).await?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        match page.last() {
            Some(last) => {
                self.after_id = Some(last.id);
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichReport {
    pub rows_translated: usize,
    pub dictionary_hits: usize,
    pub fallback_translations: usize,
    /// Items with no words, stored with an empty translation
    pub blank_items: usize,
    pub chunk_size: usize,
    pub chunks_committed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Adds a target-language item name to every stored record.
pub struct EnrichmentEngine {
    storage: Arc<dyn StoragePort>,
    translator: Arc<dyn TranslatorPort>,
    capacity: Arc<dyn CapacityEstimator>,
    dictionary: TranslationDictionary,
    target_language: String,
    fraction: f64,
}

impl EnrichmentEngine {
    pub fn new(
        storage: Arc<dyn StoragePort>,
        translator: Arc<dyn TranslatorPort>,
        capacity: Arc<dyn CapacityEstimator>,
        dictionary: TranslationDictionary,
        target_language: impl Into<String>,
        fraction: f64,
    ) -> Self {
        Self {
            storage,
            translator,
            capacity,
            dictionary,
            target_language: target_language.into(),
            fraction,
        }
    }

    /// Curated translation when the dictionary has the exact item, otherwise
    /// each whitespace-separated word goes through the translator in order.
    ///
    /// A failure on any word fails the item; partial results are discarded.
    pub async fn translate(&self, item: &str) -> std::result::Result<(String, TranslationSource), TranslationError> {
        if let Some(curated) = self.dictionary.get(item) {
            return Ok((curated.to_string(), TranslationSource::Dictionary));
        }

        let words: Vec<&str> = item.split_whitespace().collect();
        if words.is_empty() {
            return Ok((String::new(), TranslationSource::Empty));
        }

        let mut translated = Vec::with_capacity(words.len());
        for word in words {
            translated.push(self.translator.translate_word(word, &self.target_language).await?);
        }
        Ok((translated.join(" "), TranslationSource::Service))
    }

    async fn plan(&self) -> Result<ChunkPlan> {
        let row_count = self.storage.count().await?;
        let per_row_bytes = self
            .storage
            .sample()
            .await?
            .map(|record| record.estimated_bytes() as u64)
            .unwrap_or(0);
        Ok(ChunkPlan::compute(row_count, per_row_bytes, self.capacity.estimate(), self.fraction))
    }

    #[instrument(skip(self), fields(target_language = %self.target_language))]
    pub async fn enrich_all(&self) -> Result<EnrichReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let plan = self.plan().await?;
        let mut report = EnrichReport {
            rows_translated: 0,
            dictionary_hits: 0,
            fallback_translations: 0,
            blank_items: 0,
            chunk_size: plan.chunk_size,
            chunks_committed: 0,
            started_at,
            finished_at: started_at,
        };

        let mut pages = RecordPages::new(self.storage.as_ref(), plan.chunk_size);
        let mut chunk_index = 0;
        while let Some(page) = pages.next_page().await.map_err(|e| EtlError::ChunkRead {
            source_name: "storage".to_string(),
            chunk_index,
            source: Box::new(e),
        })? {
            let mut updates = Vec::with_capacity(page.len());
            let mut hits = 0;
            let mut fallbacks = 0;
            let mut blanks = 0;

            for record in &page {
                let (translated, via) =
                    self.translate(&record.item)
                        .await
                        .map_err(|source| EtlError::Translation {
                            chunk_index,
                            row_id: record.id,
                            item: record.item.clone(),
                            source,
                        })?;
                match via {
                    TranslationSource::Dictionary => {
                        hits += 1;
                        crate::observability::metrics::enrich::dictionary_hit();
                    }
                    TranslationSource::Service => {
                        fallbacks += 1;
                        crate::observability::metrics::enrich::fallback_translation();
                    }
                    TranslationSource::Empty => {
                        blanks += 1;
                        crate::observability::metrics::enrich::blank_item();
                    }
                }
                debug!("Row {}: '{}' -> '{}'", record.id, record.item, translated);
                updates.push((record.id, Some(translated)));
            }

            self.storage
                .update_fields(RecordField::TranslatedItem, &updates)
                .await
                .map_err(|e| EtlError::ChunkUpdate {
                    field: RecordField::TranslatedItem.to_string(),
                    chunk_index,
                    source: Box::new(e),
                })?;

            report.rows_translated += updates.len();
            report.dictionary_hits += hits;
            report.fallback_translations += fallbacks;
            report.blank_items += blanks;
            report.chunks_committed += 1;
            crate::observability::metrics::enrich::chunk_committed();
            info!("Chunk {} enriched: {} rows", chunk_index, updates.len());
            chunk_index += 1;
        }

        report.finished_at = Utc::now();
        crate::observability::metrics::enrich::duration(timer.elapsed().as_secs_f64());
        info!(
            "Enrichment finished: {} rows, {} from the dictionary, {} translated, {} blank",
            report.rows_translated, report.dictionary_hits, report.fallback_translations, report.blank_items
        );
        Ok(report)
    }
}
