//! Independent-event Monte Carlo over a stack of detector layers.
//!
//! Each event draws a total kinetic energy uniformly from
//! `[emin, emax)`, follows the particle through every layer in order, and
//! records the incident energy followed by the smeared deposit of each layer.
//! Deposits are smeared with a Gaussian of width $\sigma(E) = 0.01\sqrt{E}$
//! and clamped at zero.

use log::info;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use lise_compute::{derive_seed, ComputeBackend, ComputeError};

use crate::beam::Beam;
use crate::detector::Detector;
use crate::error::CoreError;
use crate::output::{EventTable, SharedTable};
use crate::types::EventRecord;

/// Relative resolution coefficient: $\sigma(E) = k\sqrt{E}$ with E in MeV.
pub const RESOLUTION_COEFFICIENT: f64 = 0.01;

/// Default number of events per work chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Energy resolution (MeV) of a deposit `energy` (MeV).
pub fn energy_uncertainty(energy: f64) -> f64 {
    RESOLUTION_COEFFICIENT * energy.max(0.0).sqrt()
}

/// Telescope event generator.
#[derive(Debug, Clone)]
pub struct TelescopeGenerator {
    energy_dist: Uniform<f64>,
    energy_range: (f64, f64),
    detectors: Vec<Detector>,
    beam: Option<Beam>,
}

impl TelescopeGenerator {
    /// Create a generator drawing total energies (MeV) from `[emin, emax)`.
    pub fn new(emin: f64, emax: f64) -> Result<Self, CoreError> {
        if !(emin.is_finite() && emax.is_finite() && emin >= 0.0 && emin < emax) {
            return Err(CoreError::InvalidConfig(format!(
                "energy range must satisfy 0 <= emin < emax, got [{}, {}]",
                emin, emax
            )));
        }
        Ok(Self {
            energy_dist: Uniform::new(emin, emax),
            energy_range: (emin, emax),
            detectors: Vec::new(),
            beam: None,
        })
    }

    /// Append a layer behind the existing ones.
    ///
    /// The first layer fixes the beam; later layers must use the same beam.
    pub fn add_detector(&mut self, detector: Detector) -> Result<(), CoreError> {
        let label = detector.provider().beam().to_string();
        let beam = Beam::parse(&label)?;
        match self.beam {
            None => self.beam = Some(beam),
            Some(current) if current != beam => {
                return Err(CoreError::InconsistentBeam {
                    expected: current.to_string(),
                    found: label,
                })
            }
            Some(_) => {}
        }
        self.detectors.push(detector);
        Ok(())
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    pub fn detector(&self, index: usize) -> Option<&Detector> {
        self.detectors.get(index)
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Beam fixed by the first detector, if any.
    pub fn beam(&self) -> Option<Beam> {
        self.beam
    }

    pub fn energy_range(&self) -> (f64, f64) {
        self.energy_range
    }

    /// Generate a single event.
    pub fn generate_event<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        event: u64,
    ) -> Result<EventRecord, CoreError> {
        let beam = self.require_beam()?;
        Ok(self.sample(rng, event, beam))
    }

    /// Generate `n` events on `backend` and append them to `sink`.
    ///
    /// Chunk `c` draws from `StdRng` seeded with `derive_seed(seed, c)`, so
    /// the events depend only on `seed` and `chunk_size`.
    pub fn generate_events(
        &self,
        n: usize,
        seed: u64,
        chunk_size: usize,
        backend: &dyn ComputeBackend,
        sink: &SharedTable<EventRecord>,
    ) -> Result<usize, CoreError> {
        let beam = self.require_beam()?;
        info!(
            "Generating {} events of {} through {} layers on {}",
            n,
            beam,
            self.detectors.len(),
            backend.device_info().name
        );

        backend.run_chunks(n, chunk_size, &|chunk, range| {
            let mut rng = StdRng::seed_from_u64(derive_seed(seed, chunk as u64));
            let batch: Vec<EventRecord> = range
                .map(|i| self.sample(&mut rng, i as u64, beam))
                .collect();
            sink.append_batch(batch).map_err(|e| ComputeError::Task {
                chunk,
                message: e.to_string(),
            })
        })?;

        Ok(n)
    }

    /// Record the run parameters in the table header.
    ///
    /// Keys: `beam`, `target`, `detectors_um` and `energy_range` (space
    /// separated values) and `seed`.
    pub fn describe(&self, table: &mut EventTable<EventRecord>, seed: u64) -> Result<(), CoreError> {
        let beam = self.require_beam()?;
        let target = self
            .detectors
            .first()
            .map(|d| d.provider().target().to_string())
            .unwrap_or_default();
        let depths: Vec<String> = self.detectors.iter().map(|d| d.depth().to_string()).collect();

        table.set_metadata("beam", beam);
        table.set_metadata("target", target);
        table.set_metadata("detectors_um", depths.join(" "));
        table.set_metadata(
            "energy_range",
            format!("{} {}", self.energy_range.0, self.energy_range.1),
        );
        table.set_metadata("seed", seed);
        Ok(())
    }

    fn require_beam(&self) -> Result<Beam, CoreError> {
        self.beam.ok_or_else(|| {
            CoreError::InvalidConfig("generator has no detectors; add one before generating".into())
        })
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, event: u64, beam: Beam) -> EventRecord {
        let a = f64::from(beam.a);
        let mut energies = Vec::with_capacity(self.detectors.len() + 1);

        let total = self.energy_dist.sample(rng);
        energies.push(total);

        let mut per_nucleon = total / a;
        for detector in &self.detectors {
            let loss = detector.energy_loss(per_nucleon);
            per_nucleon -= loss;

            let deposit = loss * a;
            let noise: f64 = StandardNormal.sample(rng);
            let smeared = deposit + energy_uncertainty(deposit) * noise;
            energies.push(smeared.max(0.0));
        }

        EventRecord {
            event,
            z: beam.z,
            a: beam.a,
            energies,
        }
    }
}
