//! # LISE Tables
//!
//! Stopping-range data for the LISE telescope simulation. All sources
//! implement the [`RangeProvider`](provider::RangeProvider) trait, which maps
//! energy per nucleon to penetration depth and back.
//!
//! ## Available data sources
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | LISE range files | [`table`] | Tabulated, ATIMA 1.4 columns |
//! | Bragg–Kleeman rule | [`power_law`] | Analytic reference model |
//!
//! ## Interpolation
//!
//! Tabulated data is interpolated piecewise-linearly
//! ([`interp::LinearInterpolator`]) and extrapolated from the end segments.

pub mod catalogue;
pub mod interp;
pub mod power_law;
pub mod provider;
pub mod table;

pub use catalogue::{list_tables, natural_cmp};
pub use provider::{RangeProvider, TableError};
pub use table::RangeTable;

/// Unit of tabulated energies.
pub const ENERGY_UNIT: &str = "MeV/u";

/// Unit of tabulated penetration depths.
pub const DEPTH_UNIT: &str = "um";
