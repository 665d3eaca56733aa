//! Range provider trait.
//!
//! All stopping-range data sources implement [`RangeProvider`], which maps
//! kinetic energy per nucleon to penetration depth and back.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or building range data.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to open file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: malformed header: {message}")]
    Header { path: String, message: String },

    #[error("{path}: table contains no data rows")]
    Empty { path: String },

    #[error("{path}: need at least 2 data points, found {found}")]
    TooFewPoints { path: String, found: usize },

    #[error("{path}: table is not monotonic at row {row} (E={energy}, x={depth})")]
    NonMonotonic {
        path: String,
        row: usize,
        energy: f64,
        depth: f64,
    },

    #[error("{path}: negative value at row {row} (E={energy}, x={depth})")]
    Negative {
        path: String,
        row: usize,
        energy: f64,
        depth: f64,
    },

    #[error("Invalid interpolation data: {0}")]
    Interpolation(String),

    #[error("Invalid model parameter: {0}")]
    InvalidParameter(String),
}

/// Provides the energy ↔ penetration depth relation for one beam/target pair.
///
/// Energies are per nucleon in [`ENERGY_UNIT`](crate::ENERGY_UNIT), depths in
/// [`DEPTH_UNIT`](crate::DEPTH_UNIT). Both lookups are monotonic increasing.
pub trait RangeProvider: Send + Sync {
    /// Human-readable name, e.g. `"10Be on Si"`.
    fn name(&self) -> &str;

    /// Beam identifier, e.g. `"10Be"`.
    fn beam(&self) -> &str;

    /// Target material, e.g. `"Si"`.
    fn target(&self) -> &str;

    /// Energy range covered by the underlying data (MeV/u).
    fn energy_range(&self) -> (f64, f64);

    /// Depth range covered by the underlying data (um).
    fn depth_range(&self) -> (f64, f64);

    /// Penetration depth of a particle with the given energy per nucleon.
    fn depth_at(&self, energy: f64) -> f64;

    /// Energy per nucleon of a particle with the given remaining range.
    fn energy_at(&self, depth: f64) -> f64;

    /// Whether `energy` lies inside the data range (no extrapolation needed).
    fn covers_energy(&self, energy: f64) -> bool {
        let (lo, hi) = self.energy_range();
        energy >= lo && energy <= hi
    }
}
