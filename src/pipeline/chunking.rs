use serde::Serialize;
use tracing::info;

/// Rows per processing unit, sized against available memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkPlan {
    pub chunk_size: usize,
}

impl ChunkPlan {
    /// Size chunks so each one stays within `fraction` of `available_bytes`.
    ///
    /// When the estimated input size already fits in available memory the
    /// whole input becomes one chunk. The result is never below 1.
    pub fn compute(row_count: usize, per_row_bytes: u64, available_bytes: u64, fraction: f64) -> Self {
        let per_row = per_row_bytes.max(1);
        let estimated_total = (row_count as u128) * (per_row as u128);

        if estimated_total < available_bytes as u128 {
            info!(
                "Whole input fits in memory: {} bytes < {} bytes available",
                estimated_total, available_bytes
            );
            return Self {
                chunk_size: row_count.max(1),
            };
        }

        let budget = fraction * available_bytes as f64;
        let rows = (budget / per_row as f64).floor();
        let chunk_size = if rows.is_finite() && rows >= 1.0 {
            rows.min(usize::MAX as f64) as usize
        } else {
            1
        };
        info!(
            "Input exceeds memory, chunking with {:.0} bytes budget: {} rows per chunk",
            budget, chunk_size
        );
        Self { chunk_size }
    }

    /// Number of chunks needed for `row_count` rows, 0 for an empty input.
    pub fn chunk_count(&self, row_count: usize) -> usize {
        row_count.div_ceil(self.chunk_size)
    }
}
