use crate::domain::{Footprint, SourceRow};
use crate::error::{EtlError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Delimited text source with a header line.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    name: String,
}

impl CsvSource {
    /// Missing files are a configuration problem, reported before anything is read.
    pub fn open(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(EtlError::Config(format!(
                "Source file not found: {}",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { path, delimiter, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn reader(&self) -> Result<csv::Reader<File>> {
        Ok(csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?)
    }

    pub fn headers(&self) -> Result<Vec<String>> {
        let mut reader = self.reader()?;
        Ok(reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect())
    }

    /// Header names, failing on the first required column that is absent.
    pub fn validate_header<S: AsRef<str>>(&self, required: &[S]) -> Result<Vec<String>> {
        let headers = self.headers()?;
        for column in required {
            let column = column.as_ref();
            if !headers.iter().any(|h| h == column) {
                return Err(EtlError::MissingColumn {
                    source_name: self.name.clone(),
                    column: column.to_string(),
                });
            }
        }
        Ok(headers)
    }

    /// Data lines, header excluded.
    pub fn count_rows(&self) -> Result<usize> {
        let mut reader = self.reader()?;
        let mut record = csv::ByteRecord::new();
        let mut count = 0;
        while reader.read_byte_record(&mut record)? {
            count += 1;
        }
        Ok(count)
    }

    /// Estimated in-memory size of the first data row, 0 for an empty source.
    pub fn first_row_footprint(&self) -> Result<u64> {
        match self.rows()?.next() {
            Some(row) => Ok(row?.estimated_bytes() as u64),
            None => Ok(0),
        }
    }

    /// Lazily streams data rows aligned to the header width.
    pub fn rows(&self) -> Result<SourceRows> {
        let mut reader = self.reader()?;
        let width = reader.headers()?.len();
        Ok(SourceRows {
            records: reader.into_records(),
            width,
            line: 0,
        })
    }

    /// Hex SHA-256 of the raw file bytes.
    pub fn digest(&self) -> Result<String> {
        let mut file = File::open(&self.path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }
}

pub struct SourceRows {
    records: csv::StringRecordsIntoIter<File>,
    width: usize,
    line: u64,
}

impl Iterator for SourceRows {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.line += 1;
        Some(record.map_err(EtlError::from).map(|record| {
            // Short lines are padded with missing values, extra fields dropped
            let mut row = SourceRow::new(self.line, record.iter().take(self.width));
            row.values.resize(self.width, None);
            row
        }))
    }
}
