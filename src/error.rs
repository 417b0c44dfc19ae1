use std::time::Duration;
use thiserror::Error;

/// Failure reported by a translation collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Network trouble, throttling or a server-side failure. Worth retrying.
    #[error("transient translation failure: {0}")]
    Transient(String),

    /// Unsupported language, rejected request or unusable response.
    #[error("permanent translation failure: {0}")]
    Permanent(String),

    #[error("translation timed out after {0:?}")]
    Timeout(Duration),
}

impl TranslationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TranslationError::Transient(_) | TranslationError::Timeout(_))
    }
}

/// Taxonomy bucket of an [`EtlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Translation,
    Validation,
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { source_name: String, column: String },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Failed to read chunk {chunk_index} from {source_name}: {source}")]
    ChunkRead {
        source_name: String,
        chunk_index: usize,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Failed to append chunk {chunk_index} from {source_name}: {source}")]
    ChunkAppend {
        source_name: String,
        chunk_index: usize,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Failed to write {field} for chunk {chunk_index}: {source}")]
    ChunkUpdate {
        field: String,
        chunk_index: usize,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Translation of row {row_id} ('{item}') in chunk {chunk_index} failed: {source}")]
    Translation {
        chunk_index: usize,
        row_id: i64,
        item: String,
        #[source]
        source: TranslationError,
    },

    #[error("Invalid value for '{field}' on row {row_id}: {reason}")]
    Validation {
        row_id: i64,
        field: String,
        reason: String,
    },
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::Config(_) | EtlError::MissingColumn { .. } | EtlError::Toml(_) => {
                ErrorKind::Configuration
            }
            EtlError::Io(_)
            | EtlError::Csv(_)
            | EtlError::Storage(_)
            | EtlError::ChunkRead { .. }
            | EtlError::ChunkAppend { .. }
            | EtlError::ChunkUpdate { .. } => ErrorKind::Io,
            EtlError::Translation { .. } => ErrorKind::Translation,
            EtlError::Validation { .. } => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_errors_keep_context() {
        let err = EtlError::ChunkAppend {
            source_name: "fastfood.csv".to_string(),
            chunk_index: 3,
            source: Box::new(EtlError::Config("disk full".to_string())),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        let msg = err.to_string();
        assert!(msg.contains("chunk 3"));
        assert!(msg.contains("fastfood.csv"));
    }

    #[test]
    fn test_read_errors_name_source_and_chunk() {
        let err = EtlError::ChunkRead {
            source_name: "fastfood.csv".to_string(),
            chunk_index: 1,
            source: Box::new(EtlError::Config("bad row".to_string())),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "Failed to read chunk 1 from fastfood.csv: Configuration error: bad row");
    }

    #[test]
    fn test_timeouts_are_transient() {
        assert!(TranslationError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(TranslationError::Transient("reset".into()).is_transient());
        assert!(!TranslationError::Permanent("xx".into()).is_transient());
    }

    #[test]
    fn test_translation_error_kind() {
        let err = EtlError::Translation {
            chunk_index: 0,
            row_id: 7,
            item: "Big Mac".to_string(),
            source: TranslationError::Permanent("unsupported language".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Translation);
        assert!(err.to_string().contains("row 7"));
    }
}
