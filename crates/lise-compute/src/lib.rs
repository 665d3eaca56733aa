//! # LISE Compute
//!
//! Execution backends for the independent-event Monte Carlo loop. This
//! crate provides a [`ComputeBackend`](backend::ComputeBackend) trait that
//! isolates the physics code from how chunks of events are scheduled.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Notes |
//! |---------|-------------|-------|
//! | Serial | always | Caller thread, chunks in order |
//! | CPU (Rayon) | `cpu` (default) | Chunks spread over a thread pool |

pub mod backend;
pub mod seed;
pub mod serial;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{BackendType, ChunkTask, ComputeBackend, ComputeError, DeviceInfo};
pub use seed::{derive_seed, time_seed};
pub use serial::SerialBackend;

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
