//! LISE range tables.
//!
//! A LISE range file is plain text: a three-line header followed by rows of
//! ten whitespace-separated numbers.
//!
//! ```text
//! ! 10Be range in Si
//! <free text>
//! <free text>
//! E0 x0  E1 x1  E2 x2  E3 x3  E4 x4
//! ...
//! ```
//!
//! Each row carries five `(E, x)` pairs, one per stopping model:
//!
//! | Pair | Model |
//! |------|-------|
//! | 0 | He-base, F. Hubert et al., AD&ND Tables 46 (1990) 1 |
//! | 1 | H-base, J. F. Ziegler et al. (low energy) |
//! | 2 | ATIMA 1.2 LS-theory |
//! | 3 | ATIMA 1.2 without LS-correction |
//! | 4 | ATIMA 1.4, improved mean charge formula for heavy ions |
//!
//! Only pair 4 is used. Malformed rows are skipped with a warning; a table
//! with fewer than two usable rows is rejected.

use std::path::Path;

use log::{debug, warn};

use crate::interp::LinearInterpolator;
use crate::provider::{RangeProvider, TableError};

/// Number of numeric columns in a data row.
const COLUMNS_PER_ROW: usize = 10;
/// Column index of the energy used (ATIMA 1.4).
const ENERGY_COLUMN: usize = 8;
/// Column index of the depth used (ATIMA 1.4).
const DEPTH_COLUMN: usize = 9;
/// Number of header lines preceding the data.
const HEADER_LINES: usize = 3;

/// An immutable energy ↔ penetration depth table for one beam/target pair.
#[derive(Debug, Clone)]
pub struct RangeTable {
    path: String,
    beam: String,
    target: String,
    name: String,
    energies: Vec<f64>,
    depths: Vec<f64>,
    e2x: LinearInterpolator,
    x2e: LinearInterpolator,
}

impl RangeTable {
    /// Load a table from a file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse a table from its text content.
    ///
    /// `path` is only used to label the table and its errors.
    pub fn parse(content: &str, path: &str) -> Result<Self, TableError> {
        let lines: Vec<&str> = content.lines().collect();

        let first = lines.first().ok_or_else(|| TableError::Header {
            path: path.to_string(),
            message: "file is empty".into(),
        })?;
        let (beam, target) = parse_header(first).ok_or_else(|| TableError::Header {
            path: path.to_string(),
            message: format!("expected '! <beam> range in <target>', got '{}'", first.trim()),
        })?;

        let mut rows: Vec<(usize, f64, f64)> = Vec::new();
        for (idx, line) in lines.iter().enumerate().skip(HEADER_LINES) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_row(line) {
                Some((energy, depth)) => rows.push((idx + 1, energy, depth)),
                None => warn!("{}: skipping malformed row {}: '{}'", path, idx + 1, line),
            }
        }

        if rows.is_empty() {
            return Err(TableError::Empty { path: path.to_string() });
        }
        if rows.len() < 2 {
            return Err(TableError::TooFewPoints {
                path: path.to_string(),
                found: rows.len(),
            });
        }

        if let Some(&(row, energy, depth)) =
            rows.iter().find(|&&(_, e, x)| e < 0.0 || x < 0.0)
        {
            return Err(TableError::Negative {
                path: path.to_string(),
                row,
                energy,
                depth,
            });
        }

        rows.sort_by(|a, b| a.1.total_cmp(&b.1));
        for pair in rows.windows(2) {
            let (_, e0, x0) = pair[0];
            let (row, e1, x1) = pair[1];
            if e1 <= e0 || x1 <= x0 {
                return Err(TableError::NonMonotonic {
                    path: path.to_string(),
                    row,
                    energy: e1,
                    depth: x1,
                });
            }
        }

        let energies: Vec<f64> = rows.iter().map(|&(_, e, _)| e).collect();
        let depths: Vec<f64> = rows.iter().map(|&(_, _, x)| x).collect();
        let e2x = LinearInterpolator::new(energies.clone(), depths.clone())?;
        let x2e = LinearInterpolator::new(depths.clone(), energies.clone())?;

        debug!("{}: {} on {}, {} points", path, beam, target, energies.len());

        Ok(Self {
            path: path.to_string(),
            name: format!("{} on {}", beam, target),
            beam,
            target,
            energies,
            depths,
            e2x,
            x2e,
        })
    }

    /// Source path (or label) of the table.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of tabulated points.
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Tabulated `(energy, depth)` points in increasing energy order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.energies.iter().copied().zip(self.depths.iter().copied())
    }
}

impl RangeProvider for RangeTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn beam(&self) -> &str {
        &self.beam
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn energy_range(&self) -> (f64, f64) {
        self.e2x.domain()
    }

    fn depth_range(&self) -> (f64, f64) {
        self.x2e.domain()
    }

    fn depth_at(&self, energy: f64) -> f64 {
        self.e2x.evaluate(energy)
    }

    fn energy_at(&self, depth: f64) -> f64 {
        self.x2e.evaluate(depth)
    }
}

/// Extract `(beam, target)` from `! <beam> range in <target> ...`.
fn parse_header(line: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return None;
    }
    Some((tokens[1].to_string(), tokens[4].to_string()))
}

fn parse_row(line: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < COLUMNS_PER_ROW {
        return None;
    }
    let energy: f64 = parts[ENERGY_COLUMN].parse().ok()?;
    let depth: f64 = parts[DEPTH_COLUMN].parse().ok()?;
    if !energy.is_finite() || !depth.is_finite() {
        return None;
    }
    Some((energy, depth))
}
