use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{EtlError, Result};

/// Curated item → translation pairs, fixed for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct TranslationDictionary {
    entries: HashMap<String, String>,
}

impl TranslationDictionary {
    /// Load a two-column CSV (raw item name, curated translation) with a header row.
    ///
    /// A missing or unreadable file, or any column count other than two, is a
    /// configuration error. Later duplicate keys overwrite earlier ones.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            EtlError::Config(format!(
                "Cannot open translation dictionary '{}': {}",
                path.display(),
                e
            ))
        })?;
        let dictionary = Self::from_reader(file, &path.display().to_string())?;
        info!("Loaded {} curated translations from {}", dictionary.len(), path.display());
        Ok(dictionary)
    }

    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| EtlError::Config(format!("Cannot read header of {}: {}", source_name, e)))?
            .clone();
        if headers.len() != 2 {
            return Err(EtlError::Config(format!(
                "{} must have exactly two columns, found {}",
                source_name,
                headers.len()
            )));
        }

        let mut entries = HashMap::new();
        for (index, result) in csv_reader.records().enumerate() {
            let record = result
                .map_err(|e| EtlError::Config(format!("Malformed row {} in {}: {}", index + 1, source_name, e)))?;
            if record.len() != 2 {
                return Err(EtlError::Config(format!(
                    "Row {} in {} has {} columns, expected 2",
                    index + 1,
                    source_name,
                    record.len()
                )));
            }
            if let Some(previous) = entries.insert(record[0].to_string(), record[1].to_string()) {
                debug!("Curated translation for '{}' overrides '{}'", &record[0], previous);
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, item: &str) -> Option<&str> {
        self.entries.get(item).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for TranslationDictionary {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_curated_translations() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "item,item_gr").unwrap();
        writeln!(file, "Big Mac,Μπιγκ Μακ").unwrap();
        writeln!(file, "\"Fries, Large\",Πατάτες Μεγάλες").unwrap();

        let dictionary = TranslationDictionary::load(file.path()).unwrap();

        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.get("Big Mac"), Some("Μπιγκ Μακ"));
        assert_eq!(dictionary.get("Fries, Large"), Some("Πατάτες Μεγάλες"));
        assert_eq!(dictionary.get("Whopper"), None);
    }

    #[test]
    fn test_later_duplicates_win() {
        let csv = "item,item_gr\nTaco,Τάκο\nTaco,Τάκος\n";
        let dictionary = TranslationDictionary::from_reader(csv.as_bytes(), "inline").unwrap();
        assert_eq!(dictionary.len(), 1);
        assert_eq!(dictionary.get("Taco"), Some("Τάκος"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = TranslationDictionary::load("/nonexistent/curated_translations.csv");
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_wrong_column_count_is_config_error() {
        let csv = "item,item_gr,notes\nTaco,Τάκο,x\n";
        let result = TranslationDictionary::from_reader(csv.as_bytes(), "inline");
        assert!(matches!(result, Err(EtlError::Config(_))));

        let ragged = "item,item_gr\nTaco\n";
        let result = TranslationDictionary::from_reader(ragged.as_bytes(), "inline");
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
