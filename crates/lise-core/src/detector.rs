//! A single detector layer of given thickness.
//!
//! The energy deposited in a layer follows from the range relation: a
//! particle entering with range $x_0$ leaves with range $x_0 - d$, and the
//! deposit is the difference of the corresponding energies. A particle whose
//! range is shorter than the layer stops inside it and deposits everything.

use std::fmt;
use std::sync::Arc;

use lise_tables::RangeProvider;

use crate::error::CoreError;

/// A detector layer backed by a shared range relation.
#[derive(Clone)]
pub struct Detector {
    provider: Arc<dyn RangeProvider>,
    depth: f64,
}

impl Detector {
    /// Create a layer of thickness `depth_um` (um).
    pub fn new(provider: Arc<dyn RangeProvider>, depth_um: f64) -> Result<Self, CoreError> {
        check_depth(depth_um)?;
        Ok(Self {
            provider,
            depth: depth_um,
        })
    }

    /// The range relation of this layer.
    pub fn provider(&self) -> &Arc<dyn RangeProvider> {
        &self.provider
    }

    /// Thickness in um.
    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn set_depth(&mut self, depth_um: f64) -> Result<(), CoreError> {
        check_depth(depth_um)?;
        self.depth = depth_um;
        Ok(())
    }

    /// Energy per nucleon lost by a particle entering with `energy` (MeV/u).
    ///
    /// The result always lies in `[0, energy]`.
    pub fn energy_loss(&self, energy: f64) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        let init_depth = self.provider.depth_at(energy);
        let fini_depth = init_depth - self.depth;
        if fini_depth < 0.0 {
            return energy;
        }
        let fini_energy = self.provider.energy_at(fini_depth).clamp(0.0, energy);
        energy - fini_energy
    }
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("provider", &self.provider.name())
            .field("depth", &self.depth)
            .finish()
    }
}

fn check_depth(depth_um: f64) -> Result<(), CoreError> {
    if depth_um.is_finite() && depth_um >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidConfig(format!(
            "detector depth must be finite and non-negative, got {}",
            depth_um
        )))
    }
}
