use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::app::ports::StoragePort;
use crate::constants::EXPORT_HEADER;
use crate::error::Result;

/// Writes the classification artifact: item, translation and category per row.
pub struct ExportUseCase {
    storage: Arc<dyn StoragePort>,
}

impl ExportUseCase {
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    /// Replaces any file at `path`. Returns the number of data lines written.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn export_classification(&self, path: &Path) -> Result<usize> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let records = self.storage.query_all().await?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(EXPORT_HEADER)?;
        for record in &records {
            writer.write_record([
                record.item.as_str(),
                record.translated_item.as_deref().unwrap_or(""),
                record.category.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush()?;

        crate::observability::metrics::export::rows_written(records.len());
        info!("Exported {} rows to {}", records.len(), path.display());
        Ok(records.len())
    }
}
