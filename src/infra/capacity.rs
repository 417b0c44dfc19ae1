use crate::app::ports::CapacityEstimator;
use std::fs;
use tracing::warn;

/// Reads `MemAvailable` from `/proc/meminfo` on every call.
pub struct SystemMemoryEstimator {
    meminfo_path: String,
    fallback_bytes: u64,
}

impl SystemMemoryEstimator {
    pub fn new(fallback_bytes: u64) -> Self {
        Self {
            meminfo_path: "/proc/meminfo".to_string(),
            fallback_bytes,
        }
    }

    pub fn with_meminfo_path(path: impl Into<String>, fallback_bytes: u64) -> Self {
        Self {
            meminfo_path: path.into(),
            fallback_bytes,
        }
    }
}

/// `MemAvailable` in bytes from meminfo text (reported there in kB).
pub fn parse_mem_available(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb.saturating_mul(1024))
}

impl CapacityEstimator for SystemMemoryEstimator {
    fn estimate(&self) -> u64 {
        match fs::read_to_string(&self.meminfo_path).ok().as_deref().and_then(parse_mem_available) {
            Some(bytes) => bytes,
            None => {
                warn!(
                    "Could not read available memory from {}, assuming {} bytes",
                    self.meminfo_path, self.fallback_bytes
                );
                self.fallback_bytes
            }
        }
    }
}

/// Always reports the same capacity.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapacity(pub u64);

impl CapacityEstimator for FixedCapacity {
    fn estimate(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MEMINFO: &str = "MemTotal:       16314748 kB\nMemFree:         1200000 kB\nMemAvailable:    8000000 kB\nBuffers:          300000 kB\n";

    #[test]
    fn test_parse_mem_available() {
        assert_eq!(parse_mem_available(MEMINFO), Some(8_000_000 * 1024));
        assert_eq!(parse_mem_available("MemTotal: 10 kB\n"), None);
    }

    #[test]
    fn test_reads_meminfo_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", MEMINFO).unwrap();
        let estimator = SystemMemoryEstimator::with_meminfo_path(file.path().to_string_lossy(), 1);
        assert_eq!(estimator.estimate(), 8_000_000 * 1024);
    }

    #[test]
    fn test_falls_back_when_unreadable() {
        let estimator = SystemMemoryEstimator::with_meminfo_path("/nonexistent/meminfo", 4096);
        assert_eq!(estimator.estimate(), 4096);
        assert_eq!(FixedCapacity(77).estimate(), 77);
    }
}
