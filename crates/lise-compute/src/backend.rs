//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over how an independent-event loop
//! is executed (caller thread, Rayon pool) so that the event generation in
//! `lise-core` stays execution-agnostic.

use std::ops::Range;

use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Task failed in chunk {chunk}: {message}")]
    Task { chunk: usize, message: String },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub threads: usize,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Serial,
    Cpu,
}

/// A unit of chunked work: `(chunk_index, item_range)`.
pub type ChunkTask<'a> = dyn Fn(usize, Range<usize>) -> Result<(), ComputeError> + Send + Sync + 'a;

/// Abstraction over execution backends.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Run `task` over consecutive chunks of `0..total`.
    ///
    /// Chunk `i` covers `i * chunk_size .. min((i + 1) * chunk_size, total)`.
    /// Chunks may run concurrently and in any order; the first error is
    /// returned.
    fn run_chunks(
        &self,
        total: usize,
        chunk_size: usize,
        task: &ChunkTask<'_>,
    ) -> Result<(), ComputeError>;
}

/// Split `0..total` into consecutive ranges of at most `chunk_size` items.
pub fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..total)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ranges_cover_total() {
        assert_eq!(chunk_ranges(10, 4), vec![0..4, 4..8, 8..10]);
        assert_eq!(chunk_ranges(8, 4), vec![0..4, 4..8]);
        assert!(chunk_ranges(0, 4).is_empty());
        // Zero chunk size degrades to single items
        assert_eq!(chunk_ranges(2, 0), vec![0..1, 1..2]);
    }
}
