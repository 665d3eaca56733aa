//! # LISE Core
//!
//! Telescope event generation on top of LISE range tables, output tables
//! shared between worker threads, and the neutron generation bookkeeping of
//! a transport run.
//!
//! ## Modules
//!
//! - [`beam`]: Beam labels such as `10Be` and the element table.
//! - [`detector`]: A detector layer and its energy loss.
//! - [`generator`]: The telescope Monte Carlo loop.
//! - [`types`]: Event records and their CSV rows.
//! - [`output`]: CSV tables with metadata and periodic autosave.
//! - [`reader`]: Reading tables back.
//! - [`neutron`]: Per-track generation and creation-time records.
//! - [`recorder`]: End-of-event transcription of neutron records.
//! - [`analysis`]: Correlation series and histograms for plotting.

pub mod analysis;
pub mod beam;
pub mod detector;
pub mod error;
pub mod generator;
pub mod neutron;
pub mod output;
pub mod reader;
pub mod recorder;
pub mod types;

pub use beam::Beam;
pub use detector::Detector;
pub use error::CoreError;
pub use generator::TelescopeGenerator;
pub use neutron::{Classification, GenerationTracker, ParticleKind, TrackInfo, TrackerLimits};
pub use output::{EventTable, OpenMode, SharedTable, TableRecord};
pub use reader::{read_neutron_table, read_telescope_table, NeutronRun, TelescopeRun};
pub use recorder::NeutronRecorder;
pub use types::{EventRecord, NeutronEvent};
