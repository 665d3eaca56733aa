//! CPU compute backend using Rayon for shared-memory parallelism.

use log::debug;
use rayon::prelude::*;

use crate::backend::{
    chunk_ranges, BackendType, ChunkTask, ComputeBackend, ComputeError, DeviceInfo,
};

/// CPU backend that spreads chunks across a Rayon thread pool.
pub struct CpuBackend {
    pool: Option<rayon::ThreadPool>,
    num_threads: usize,
}

impl CpuBackend {
    /// Create a new CPU backend on the global pool (all available threads).
    pub fn new() -> Self {
        Self {
            pool: None,
            num_threads: rayon::current_num_threads(),
        }
    }

    /// Create a CPU backend with a dedicated pool of `num_threads` threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;
        Ok(Self {
            num_threads: pool.current_num_threads(),
            pool: Some(pool),
        })
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            threads: self.num_threads,
        }
    }

    fn run_chunks(
        &self,
        total: usize,
        chunk_size: usize,
        task: &ChunkTask<'_>,
    ) -> Result<(), ComputeError> {
        let ranges = chunk_ranges(total, chunk_size);
        debug!(
            "Running {} items in {} chunks on {} threads",
            total,
            ranges.len(),
            self.num_threads
        );
        let run = || {
            ranges
                .into_par_iter()
                .enumerate()
                .try_for_each(|(chunk, range)| task(chunk, range))
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}
