//! End-of-event transcription of neutron records into a shared table.
//!
//! Workers each own a [`GenerationTracker`]; at the end of an event they hand
//! it to [`NeutronRecorder::end_of_event`], which appends the event under the
//! table mutex and clears the tracker for the next event.

use std::path::Path;

use log::info;

use crate::error::CoreError;
use crate::neutron::{GenerationTracker, TrackerLimits};
use crate::output::{EventTable, OpenMode, SharedTable};
use crate::types::{NeutronEvent, NEUTRON_HEADER};

/// Collects neutron events from any number of worker threads.
pub struct NeutronRecorder {
    table: SharedTable<NeutronEvent>,
}

impl NeutronRecorder {
    /// Open (or recreate) the neutron table at `path`.
    pub fn create(
        path: impl AsRef<Path>,
        mode: OpenMode,
        limits: TrackerLimits,
        autosave_every: Option<usize>,
    ) -> Result<Self, CoreError> {
        let mut table = EventTable::create(path, "Neutron generation records", NEUTRON_HEADER, mode)?;
        table.set_metadata("max_generation", format_limit(limits.max_generation));
        table.set_metadata("max_global_time_ns", format_limit(limits.max_global_time_ns));
        Ok(Self {
            table: SharedTable::new(table, autosave_every),
        })
    }

    /// Transcribe and reset `tracker`; returns the number of neutrons recorded.
    pub fn end_of_event(
        &self,
        event: u64,
        tracker: &mut GenerationTracker,
    ) -> Result<usize, CoreError> {
        let records = tracker.records_by_generation();
        let neutrons = NeutronEvent {
            event,
            generations: records.iter().map(|r| r.generation).collect(),
            global_times_ns: records.iter().map(|r| r.global_time_ns).collect(),
        };
        let n = neutrons.len();
        self.table.append(neutrons)?;
        tracker.reset();
        Ok(n)
    }

    /// Number of events recorded so far.
    pub fn event_count(&self) -> Result<usize, CoreError> {
        self.table.len()
    }

    /// Write the final table and return the number of events.
    pub fn finish(self) -> Result<usize, CoreError> {
        let table = self.table.into_inner()?;
        let path = table.path().display().to_string();
        let events = table.finish()?;
        info!("The run consists of {} events ({})", events, path);
        Ok(events)
    }
}

fn format_limit<T: ToString>(limit: Option<T>) -> String {
    limit.map_or_else(|| "unset".to_string(), |v| v.to_string())
}
