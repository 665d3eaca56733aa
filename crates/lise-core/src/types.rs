//! Event records written to output tables.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::output::TableRecord;

/// One telescope event.
///
/// `energies[0]` is the total kinetic energy of the incident particle (MeV);
/// `energies[i]` for `i >= 1` is the smeared energy deposited in detector
/// `i - 1` (MeV). All entries are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: u64,
    /// Charge number of the beam.
    pub z: u32,
    /// Mass number of the beam.
    pub a: u32,
    pub energies: Vec<f64>,
}

impl EventRecord {
    /// Incident energy `E0` (MeV).
    pub fn initial_energy(&self) -> f64 {
        self.energies.first().copied().unwrap_or(0.0)
    }

    /// Deposits in each detector (MeV).
    pub fn deposits(&self) -> &[f64] {
        self.energies.get(1..).unwrap_or(&[])
    }

    /// Sum of all deposits (MeV).
    pub fn total_deposit(&self) -> f64 {
        self.deposits().iter().sum()
    }
}

/// CSV header for a telescope table with `detectors` layers.
pub fn telescope_header(detectors: usize) -> String {
    let mut header = String::from("event,Z,A");
    for i in 0..=detectors {
        header.push_str(&format!(",E{}", i));
    }
    header
}

impl TableRecord for EventRecord {
    fn sequence(&self) -> u64 {
        self.event
    }

    fn write_rows(&self, w: &mut dyn Write) -> std::io::Result<()> {
        write!(w, "{},{},{}", self.event, self.z, self.a)?;
        for e in &self.energies {
            write!(w, ",{}", e)?;
        }
        writeln!(w)
    }
}

/// Neutrons created during one event, sorted by generation then track id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeutronEvent {
    pub event: u64,
    pub generations: Vec<u32>,
    pub global_times_ns: Vec<f64>,
}

impl NeutronEvent {
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }
}

/// CSV header of a neutron table (one row per neutron).
pub const NEUTRON_HEADER: &str = "event,generation,global_time_ns";

impl TableRecord for NeutronEvent {
    fn sequence(&self) -> u64 {
        self.event
    }

    fn write_rows(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for (generation, time) in self.generations.iter().zip(&self.global_times_ns) {
            writeln!(w, "{},{},{}", self.event, generation, time)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telescope_header() {
        assert_eq!(telescope_header(3), "event,Z,A,E0,E1,E2,E3");
    }

    #[test]
    fn test_event_row_format() {
        let rec = EventRecord {
            event: 7,
            z: 4,
            a: 10,
            energies: vec![120.5, 3.25, 0.0],
        };
        let mut buf = Vec::new();
        rec.write_rows(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "7,4,10,120.5,3.25,0\n");
        assert_eq!(rec.total_deposit(), 3.25);
    }

    #[test]
    fn test_neutron_rows() {
        let ev = NeutronEvent {
            event: 2,
            generations: vec![1, 2],
            global_times_ns: vec![0.0, 12.5],
        };
        let mut buf = Vec::new();
        ev.write_rows(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "2,1,0\n2,2,12.5\n");

        let mut buf = Vec::new();
        NeutronEvent::default().write_rows(&mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
