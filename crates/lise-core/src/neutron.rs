//! Neutron generation bookkeeping for a transport engine's stacking callback.
//!
//! Every new neutron track is classified when it is pushed onto the stack.
//! Its creation time is recorded, and its generation is computed as one
//! more than its parent's (primaries are generation 1). Tracks that exceed
//! the generation or time limit are killed, which bounds supercritical
//! chains. Records are per event and are cleared with [`GenerationTracker::reset`].

use std::collections::HashMap;

use crate::error::CoreError;

/// Particle species as far as the bookkeeping is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticleKind {
    Neutron,
    Other(String),
}

/// What the transport engine needs to know about a newly created track.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub track_id: u32,
    /// Parent track id; 0 for primaries.
    pub parent_id: u32,
    pub kind: ParticleKind,
    /// Global time at creation (ns).
    pub global_time_ns: f64,
}

/// Stacking decision for a new track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Track normally.
    Urgent,
    /// Discard without tracking.
    Kill,
}

/// Kill thresholds. `None` disables a limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerLimits {
    pub max_generation: Option<u32>,
    pub max_global_time_ns: Option<f64>,
}

impl Default for TrackerLimits {
    fn default() -> Self {
        Self {
            max_generation: Some(100),
            max_global_time_ns: Some(6000.0),
        }
    }
}

/// One recorded neutron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutronRecord {
    pub track_id: u32,
    pub generation: u32,
    pub global_time_ns: f64,
}

/// Per-worker neutron bookkeeping.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    limits: TrackerLimits,
    records: HashMap<u32, (u32, f64)>,
}

impl GenerationTracker {
    pub fn new(limits: TrackerLimits) -> Self {
        Self {
            limits,
            records: HashMap::new(),
        }
    }

    pub fn limits(&self) -> TrackerLimits {
        self.limits
    }

    /// Classify a new track, recording neutrons.
    ///
    /// Non-neutrons are always tracked and never recorded. A neutron whose
    /// parent is a neutron must come after its parent.
    pub fn classify_new_track(&mut self, track: &TrackInfo) -> Result<Classification, CoreError> {
        if track.kind != ParticleKind::Neutron {
            return Ok(Classification::Urgent);
        }

        let generation = self.generation_of(track)?;
        self.records
            .insert(track.track_id, (generation, track.global_time_ns));

        let too_late = self
            .limits
            .max_global_time_ns
            .is_some_and(|limit| track.global_time_ns > limit);
        let too_deep = self
            .limits
            .max_generation
            .is_some_and(|limit| generation > limit);

        if too_late || too_deep {
            Ok(Classification::Kill)
        } else {
            Ok(Classification::Urgent)
        }
    }

    /// Generation of a recorded track.
    pub fn generation(&self, track_id: u32) -> Option<u32> {
        self.records.get(&track_id).map(|&(g, _)| g)
    }

    /// Latest recorded global time of a track (ns).
    pub fn global_time_ns(&self, track_id: u32) -> Option<f64> {
        self.records.get(&track_id).map(|&(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records sorted by generation, then track id.
    pub fn records_by_generation(&self) -> Vec<NeutronRecord> {
        let mut out: Vec<NeutronRecord> = self
            .records
            .iter()
            .map(|(&track_id, &(generation, global_time_ns))| NeutronRecord {
                track_id,
                generation,
                global_time_ns,
            })
            .collect();
        out.sort_by_key(|r| (r.generation, r.track_id));
        out
    }

    /// Forget all records.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    fn generation_of(&self, track: &TrackInfo) -> Result<u32, CoreError> {
        if let Some(generation) = self.generation(track.track_id) {
            return Ok(generation);
        }
        if track.parent_id == 0 {
            return Ok(1);
        }
        self.generation(track.parent_id)
            .map(|g| g + 1)
            .ok_or(CoreError::UnknownParent {
                track: track.track_id,
                parent: track.parent_id,
            })
    }
}
