//! Single-threaded backend running chunks in order on the caller thread.

use log::debug;

use crate::backend::{
    chunk_ranges, BackendType, ChunkTask, ComputeBackend, ComputeError, DeviceInfo,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct SerialBackend;

impl SerialBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial (1 thread)".into(),
            backend_type: BackendType::Serial,
            threads: 1,
        }
    }

    fn run_chunks(
        &self,
        total: usize,
        chunk_size: usize,
        task: &ChunkTask<'_>,
    ) -> Result<(), ComputeError> {
        let ranges = chunk_ranges(total, chunk_size);
        debug!("Running {} items in {} chunks serially", total, ranges.len());
        for (chunk, range) in ranges.into_iter().enumerate() {
            task(chunk, range)?;
        }
        Ok(())
    }
}
