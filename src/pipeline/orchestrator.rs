use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::app::classify_use_case::{ClassificationEngine, ClassifyReport};
use crate::app::enrich_use_case::{EnrichReport, EnrichmentEngine};
use crate::app::export_use_case::ExportUseCase;
use crate::app::ingest_use_case::{IngestReport, IngestionEngine};
use crate::app::ports::{CapacityEstimator, StoragePort, TranslatorPort};
use crate::app::stats_use_case::{NutritionStats, StatsUseCase};
use crate::config::Config;
use crate::error::{EtlError, Result};
use crate::infra::{
    CsvSource, FixedCapacity, GoogleTranslateClient, ResilientTranslator, RetryPolicy, SystemMemoryEstimator,
};
use crate::pipeline::processing::TranslationDictionary;
use crate::pipeline::storage::SqliteStorage;

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub rows_written: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub ingest: IngestReport,
    pub enrich: EnrichReport,
    pub classify: ClassifyReport,
    pub export: ExportReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Wires the engines to their collaborators and runs them one after another.
pub struct Pipeline {
    config: Config,
    storage: Arc<dyn StoragePort>,
    capacity: Arc<dyn CapacityEstimator>,
    translator: Arc<dyn TranslatorPort>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        storage: Arc<dyn StoragePort>,
        capacity: Arc<dyn CapacityEstimator>,
        translator: Arc<dyn TranslatorPort>,
    ) -> Self {
        Self {
            config,
            storage,
            capacity,
            translator,
        }
    }

    /// Production wiring: SQLite storage, live memory reading unless a fixed
    /// capacity is configured, and the retrying translation client.
    pub fn from_config(config: Config) -> Result<Self> {
        let storage = Arc::new(SqliteStorage::open(&config.storage.database_path)?);

        let capacity: Arc<dyn CapacityEstimator> = match config.memory.available_bytes {
            Some(bytes) => Arc::new(FixedCapacity(bytes)),
            None => Arc::new(SystemMemoryEstimator::new(config.memory.fallback_available_bytes)),
        };

        let client = GoogleTranslateClient::new(config.translation.endpoint.clone(), config.translation.timeout())
            .map_err(|e| EtlError::Config(e.to_string()))?;
        let translator = Arc::new(ResilientTranslator::new(
            client,
            RetryPolicy::from_config(&config.translation),
            config.translation.timeout(),
        ));

        Ok(Self::new(config, storage, capacity, translator))
    }

    fn open_source(&self, path: Option<&Path>) -> Result<CsvSource> {
        let path = path.unwrap_or(self.config.source.path.as_path());
        CsvSource::open(path, self.config.source.delimiter as u8)
    }

    fn ingestion_engine(&self) -> IngestionEngine {
        IngestionEngine::new(
            self.storage.clone(),
            self.capacity.clone(),
            self.config.memory.fraction,
            &self.config.classification.features,
        )
    }

    fn enrichment_engine(&self, dictionary: TranslationDictionary) -> EnrichmentEngine {
        EnrichmentEngine::new(
            self.storage.clone(),
            self.translator.clone(),
            self.capacity.clone(),
            dictionary,
            self.config.translation.target_language.clone(),
            self.config.memory.fraction,
        )
    }

    pub async fn ingest(&self, source: Option<&Path>, force: bool) -> Result<IngestReport> {
        let source = self.open_source(source)?;
        self.ingestion_engine().ingest(&source, force).await
    }

    pub async fn enrich(&self) -> Result<EnrichReport> {
        let dictionary = TranslationDictionary::load(&self.config.translation.dictionary_path)?;
        self.enrichment_engine(dictionary).enrich_all().await
    }

    pub async fn classify(&self) -> Result<ClassifyReport> {
        ClassificationEngine::new(self.storage.clone(), self.config.classification.clone())
            .classify_all()
            .await
    }

    pub async fn export(&self, output: Option<&Path>) -> Result<ExportReport> {
        let path = output.unwrap_or(self.config.export.path.as_path()).to_path_buf();
        let rows_written = ExportUseCase::new(self.storage.clone())
            .export_classification(&path)
            .await?;
        Ok(ExportReport { path, rows_written })
    }

    pub async fn stats(&self) -> Result<Vec<NutritionStats>> {
        StatsUseCase::new(self.storage.clone()).nutrition_stats().await
    }

    pub async fn reset(&self) -> Result<()> {
        self.storage.reset().await?;
        info!("Storage reset");
        Ok(())
    }

    /// Ingest, enrich, classify and export under one run id.
    ///
    /// Source header and dictionary are checked before storage is touched.
    /// Storage is reset first unless `keep_existing` is set.
    pub async fn run(&self, keep_existing: bool) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id);
        self.run_stages(run_id, keep_existing).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid, keep_existing: bool) -> Result<RunReport> {
        let started_at = Utc::now();
        info!("Starting pipeline run");

        let source = self.open_source(None)?;
        let ingestion = self.ingestion_engine();
        ingestion.check_source(&source)?;
        let dictionary = TranslationDictionary::load(&self.config.translation.dictionary_path)?;

        if !keep_existing {
            self.reset().await?;
        }

        let ingest = ingestion.ingest(&source, false).await?;
        let enrich = self.enrichment_engine(dictionary).enrich_all().await?;
        let classify = self.classify().await?;
        let export = self.export(None).await?;

        let finished_at = Utc::now();
        info!(
            "Pipeline run finished in {} ms",
            (finished_at - started_at).num_milliseconds()
        );
        Ok(RunReport {
            run_id,
            ingest,
            enrich,
            classify,
            export,
            started_at,
            finished_at,
        })
    }
}
