//! Analytic Bragg–Kleeman range model.
//!
//! The empirical rule $R(E) = a E^p$ with $p \approx 1.75$ describes the
//! range of light ions over a wide energy window. It serves as a reference
//! model with an exact inverse, $E(R) = (R / a)^{1/p}$.

use crate::provider::{RangeProvider, TableError};

/// Power-law range relation $R = a E^p$.
#[derive(Debug, Clone)]
pub struct PowerLawRange {
    name: String,
    beam: String,
    target: String,
    coefficient: f64,
    exponent: f64,
    energy_range: (f64, f64),
}

impl PowerLawRange {
    /// Construct a power-law model.
    ///
    /// # Arguments
    /// * `beam` - Beam identifier, e.g. `"10Be"`.
    /// * `target` - Target material, e.g. `"Si"`.
    /// * `coefficient` - $a$ in um / (MeV/u)^p, must be positive.
    /// * `exponent` - $p$, must be positive.
    /// * `energy_range` - Nominal validity window in MeV/u.
    pub fn new(
        beam: impl Into<String>,
        target: impl Into<String>,
        coefficient: f64,
        exponent: f64,
        energy_range: (f64, f64),
    ) -> Result<Self, TableError> {
        if !(coefficient.is_finite() && coefficient > 0.0) {
            return Err(TableError::InvalidParameter(format!(
                "coefficient must be positive, got {}",
                coefficient
            )));
        }
        if !(exponent.is_finite() && exponent > 0.0) {
            return Err(TableError::InvalidParameter(format!(
                "exponent must be positive, got {}",
                exponent
            )));
        }
        if !(energy_range.0 >= 0.0 && energy_range.1 > energy_range.0) {
            return Err(TableError::InvalidParameter(format!(
                "invalid energy range [{}, {}]",
                energy_range.0, energy_range.1
            )));
        }
        let beam = beam.into();
        let target = target.into();
        Ok(Self {
            name: format!("{} on {} (power law)", beam, target),
            beam,
            target,
            coefficient,
            exponent,
            energy_range,
        })
    }

    /// Bragg–Kleeman exponent commonly used for light ions.
    pub const BRAGG_KLEEMAN_EXPONENT: f64 = 1.75;
}

impl RangeProvider for PowerLawRange {
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
        self.energy_range
    }

    fn depth_range(&self) -> (f64, f64) {
        (
            self.depth_at(self.energy_range.0),
            self.depth_at(self.energy_range.1),
        )
    }

    fn depth_at(&self, energy: f64) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        self.coefficient * energy.powf(self.exponent)
    }

    fn energy_at(&self, depth: f64) -> f64 {
        if depth <= 0.0 {
            return 0.0;
        }
        (depth / self.coefficient).powf(1.0 / self.exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_is_exact() {
        let model = PowerLawRange::new("10Be", "Si", 12.0, 1.75, (0.1, 100.0)).unwrap();
        for &e in &[0.5, 3.0, 17.0, 80.0] {
            assert_relative_eq!(model.energy_at(model.depth_at(e)), e, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(PowerLawRange::new("10Be", "Si", 0.0, 1.75, (0.0, 1.0)).is_err());
        assert!(PowerLawRange::new("10Be", "Si", 1.0, -1.0, (0.0, 1.0)).is_err());
        assert!(PowerLawRange::new("10Be", "Si", 1.0, 1.75, (2.0, 1.0)).is_err());
    }
}
