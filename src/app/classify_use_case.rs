use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::app::ports::StoragePort;
use crate::config::ClassificationConfig;
use crate::domain::RecordField;
use crate::error::{EtlError, Result};
use crate::pipeline::processing::features::{select_features, standardize, FeatureIssue};
use crate::pipeline::processing::kmeans;
use crate::pipeline::processing::labels::{cluster_means, ClusterLabelMap};

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyReport {
    pub rows_classified: usize,
    pub rows_excluded: usize,
    /// Below the configured count when there were fewer complete rows
    pub effective_clusters: usize,
    pub iterations: usize,
    pub converged: bool,
    pub rows_per_label: BTreeMap<String, usize>,
    pub issues: Vec<FeatureIssue>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Groups records into nutritional profiles and writes a category label back.
pub struct ClassificationEngine {
    storage: Arc<dyn StoragePort>,
    config: ClassificationConfig,
}

impl ClassificationEngine {
    pub fn new(storage: Arc<dyn StoragePort>, config: ClassificationConfig) -> Self {
        Self { storage, config }
    }

    #[instrument(skip(self), fields(clusters = self.config.clusters, seed = self.config.seed))]
    pub async fn classify_all(&self) -> Result<ClassifyReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let records = self.storage.query_all().await?;
        let table = select_features(&records, &self.config.features);

        for issue in &table.issues {
            warn!("Excluded from classification: {}", EtlError::from(issue.clone()));
        }
        crate::observability::metrics::classify::rows_excluded(table.issues.len());

        let mut report = ClassifyReport {
            rows_classified: 0,
            rows_excluded: table.issues.len(),
            effective_clusters: 0,
            iterations: 0,
            converged: true,
            rows_per_label: BTreeMap::new(),
            issues: table.issues.clone(),
            started_at,
            finished_at: started_at,
        };

        if table.is_empty() {
            warn!(
                "No complete rows among {} records, nothing to classify",
                records.len()
            );
            report.finished_at = Utc::now();
            return Ok(report);
        }

        let standardized = standardize(&table.rows);
        let result = kmeans::cluster(
            &standardized.rows,
            self.config.clusters,
            self.config.seed,
            self.config.max_iterations,
        );
        let effective = result.cluster_count();
        if effective < self.config.clusters {
            info!(
                "Only {} complete rows, clustering into {} groups instead of {}",
                table.len(),
                effective,
                self.config.clusters
            );
        }

        // Ranking uses raw values so labels follow real calorie levels
        let rank_means = match table.column_index(&self.config.rank_feature) {
            Some(column) => {
                let values: Vec<f64> = table.rows.iter().map(|row| row[column]).collect();
                cluster_means(&values, &result.assignments, effective)
            }
            None => vec![0.0; effective],
        };
        let label_map = ClusterLabelMap::build(self.config.label_strategy, &rank_means, &self.config.labels)?;

        let mut updates: Vec<(i64, Option<String>)> = Vec::with_capacity(records.len());
        for (row_id, &cluster_id) in table.row_ids.iter().zip(&result.assignments) {
            let label = label_map.label(cluster_id).map(str::to_string);
            if let Some(label) = &label {
                *report.rows_per_label.entry(label.clone()).or_insert(0) += 1;
            }
            updates.push((*row_id, label));
        }
        let excluded: HashSet<i64> = table.issues.iter().map(|issue| issue.row_id).collect();
        updates.extend(excluded.into_iter().map(|row_id| (row_id, None)));
        updates.sort_by_key(|(row_id, _)| *row_id);

        self.storage
            .update_fields(RecordField::Category, &updates)
            .await
            .map_err(|e| EtlError::ChunkUpdate {
                field: RecordField::Category.to_string(),
                chunk_index: 0,
                source: Box::new(e),
            })?;

        report.rows_classified = table.len();
        report.effective_clusters = effective;
        report.iterations = result.iterations;
        report.converged = result.converged;
        report.finished_at = Utc::now();

        for (label, count) in &report.rows_per_label {
            crate::observability::metrics::classify::rows_labelled(label, *count);
        }
        crate::observability::metrics::classify::iterations(result.iterations);
        crate::observability::metrics::classify::duration(timer.elapsed().as_secs_f64());
        info!(
            "Classified {} rows into {} clusters in {} iterations ({} excluded)",
            report.rows_classified, effective, result.iterations, report.rows_excluded
        );
        Ok(report)
    }
}
