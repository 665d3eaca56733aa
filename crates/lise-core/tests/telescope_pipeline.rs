//! End-to-end tests of the telescope generator and the neutron recorder.
//!
//! Covers: non-negative energies for arbitrary stacks, reproducibility
//! across backends, reading written tables back, and concurrent neutron
//! recording from several workers.

use std::sync::Arc;

use approx::assert_relative_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use lise_compute::{ComputeBackend, CpuBackend, SerialBackend};
use lise_core::generator::DEFAULT_CHUNK_SIZE;
use lise_core::types::telescope_header;
use lise_core::{
    read_neutron_table, read_telescope_table, Detector, EventRecord, EventTable,
    GenerationTracker, NeutronRecorder, OpenMode, ParticleKind, SharedTable, TelescopeGenerator,
    TrackInfo, TrackerLimits,
};
use lise_tables::power_law::PowerLawRange;
use lise_tables::{RangeProvider, RangeTable};

// ── Helpers ──────────────────────────────────────────────────────────

fn silicon() -> Arc<dyn RangeProvider> {
    Arc::new(PowerLawRange::new("10Be", "Si", 14.0, 1.75, (0.1, 100.0)).unwrap())
}

/// A coarse table whose range-to-energy extrapolation below the first row
/// goes negative.
fn steep_table() -> Arc<dyn RangeProvider> {
    let mut text = String::from("! 10Be range in Si\nE [MeV/u]  Range [um]\n----\n");
    for (e, x) in [(1.0, 10.0), (2.0, 11.0), (3.0, 40.0)] {
        text.push_str(&format!("{e} {x} {e} {x} {e} {x} {e} {x} {e} {x}\n"));
    }
    Arc::new(RangeTable::parse(&text, "steep.txt").unwrap())
}

fn telescope(depths: &[f64], emax: f64) -> TelescopeGenerator {
    stack(silicon(), depths, emax)
}

fn stack(provider: Arc<dyn RangeProvider>, depths: &[f64], emax: f64) -> TelescopeGenerator {
    let mut generator = TelescopeGenerator::new(0.0, emax).unwrap();
    for &d in depths {
        generator
            .add_detector(Detector::new(provider.clone(), d).unwrap())
            .unwrap();
    }
    generator
}

fn run_into_memory(
    generator: &TelescopeGenerator,
    backend: &dyn ComputeBackend,
    dir: &std::path::Path,
    name: &str,
    n: usize,
    seed: u64,
) -> Vec<EventRecord> {
    let header = telescope_header(generator.detector_count());
    let table = EventTable::create(dir.join(name), "events", header, OpenMode::New).unwrap();
    let shared = SharedTable::new(table, Some(250));
    generator
        .generate_events(n, seed, 128, backend, &shared)
        .unwrap();
    let mut table = shared.into_inner().unwrap();
    table.save().unwrap();
    table.records().to_vec()
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    /// No stack of layers ever yields a negative energy.
    #[test]
    fn energies_never_negative(
        depths in prop::collection::vec(0.0f64..5000.0, 1..5),
        emax in 1.0f64..2000.0,
        seed in any::<u64>(),
    ) {
        let generator = telescope(&depths, emax);
        let mut rng = StdRng::seed_from_u64(seed);
        for i in 0..50 {
            let ev = generator.generate_event(&mut rng, i).unwrap();
            prop_assert_eq!(ev.energies.len(), depths.len() + 1);
            prop_assert!(ev.energies.iter().all(|&e| e >= 0.0 && e.is_finite()));
        }
    }

    /// Thin layers on a tabulated relation reach the region below the first
    /// row, where the extrapolated energy is negative.
    #[test]
    fn table_extrapolation_never_yields_negative_energy(
        depths in prop::collection::vec(0.0f64..60.0, 1..5),
        emax in 1.0f64..60.0,
        seed in any::<u64>(),
    ) {
        let generator = stack(steep_table(), &depths, emax);
        let mut rng = StdRng::seed_from_u64(seed);
        for i in 0..200 {
            let ev = generator.generate_event(&mut rng, i).unwrap();
            prop_assert!(ev.energies.iter().all(|&e| e >= 0.0 && e.is_finite()));
            prop_assert!(ev.total_deposit() <= ev.initial_energy() + 1.0);
        }
    }
}

#[test]
fn loss_below_first_row_stops_the_particle() {
    let table = steep_table();
    assert!(table.energy_at(5.0) < 0.0);
    let det = Detector::new(table, 5.0).unwrap();
    // 1 MeV/u has 10 um of range left; 5 um leave an extrapolated -4 MeV/u
    assert_eq!(det.energy_loss(1.0), 1.0);
    let loss = det.energy_loss(2.5);
    assert!(loss > 0.0 && loss <= 2.5);
}

// ── Reproducibility ──────────────────────────────────────────────────

#[test]
fn parallel_and_serial_runs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let generator = telescope(&[100.0, 300.0, 2000.0], 300.0);

    let serial = run_into_memory(&generator, &SerialBackend::new(), dir.path(), "s.csv", 1000, 7);
    let cpu = CpuBackend::with_threads(4).unwrap();
    let parallel = run_into_memory(&generator, &cpu, dir.path(), "p.csv", 1000, 7);

    assert_eq!(serial.len(), 1000);
    assert_eq!(serial, parallel);
    assert!(serial.iter().enumerate().all(|(i, ev)| ev.event == i as u64));
}

#[test]
fn different_seeds_differ() {
    let dir = tempfile::tempdir().unwrap();
    let generator = telescope(&[100.0], 300.0);
    let backend = SerialBackend::new();
    let a = run_into_memory(&generator, &backend, dir.path(), "a.csv", 10, 1);
    let b = run_into_memory(&generator, &backend, dir.path(), "b.csv", 10, 2);
    assert_ne!(a, b);
}

// ── Tables on disk ───────────────────────────────────────────────────

#[test]
fn telescope_table_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("10Be_Si.csv");
    let generator = telescope(&[100.0, 300.0, 2000.0], 300.0);

    let mut table = EventTable::create(
        &path,
        "LISE telescope events",
        telescope_header(3),
        OpenMode::New,
    )
    .unwrap();
    generator.describe(&mut table, 99).unwrap();
    let shared = SharedTable::new(table, Some(100));
    generator
        .generate_events(500, 99, DEFAULT_CHUNK_SIZE, &SerialBackend::new(), &shared)
        .unwrap();
    let table = shared.into_inner().unwrap();
    let written = table.records().to_vec();
    assert_eq!(table.finish().unwrap(), 500);

    let run = read_telescope_table(&path).unwrap();
    assert_eq!(run.beam.to_string(), "10Be");
    assert_eq!(run.target, "Si");
    assert_eq!(run.depths_um, vec![100.0, 300.0, 2000.0]);
    assert_eq!(run.energy_range, Some((0.0, 300.0)));
    assert_eq!(run.seed, Some(99));
    assert_eq!(run.events.len(), 500);
    for (a, b) in run.events.iter().zip(&written) {
        assert_eq!(a.event, b.event);
        for (x, y) in a.energies.iter().zip(&b.energies) {
            assert_relative_eq!(*x, *y, max_relative = 1e-12);
        }
    }
}

#[test]
fn existing_output_is_not_clobbered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    std::fs::write(&path, "keep me").unwrap();
    assert!(EventTable::<EventRecord>::create(&path, "t", "h", OpenMode::New).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
}

// ── Neutron recording ────────────────────────────────────────────────

fn neutron(id: u32, parent: u32, t: f64) -> TrackInfo {
    TrackInfo {
        track_id: id,
        parent_id: parent,
        kind: ParticleKind::Neutron,
        global_time_ns: t,
    }
}

#[test]
fn neutron_recorder_collects_worker_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("neutrons.csv");
    let recorder =
        NeutronRecorder::create(&path, OpenMode::New, TrackerLimits::default(), Some(7)).unwrap();

    // Four workers, 25 events each; event e produces a chain of e % 4 neutrons.
    std::thread::scope(|s| {
        for worker in 0..4u64 {
            let recorder = &recorder;
            s.spawn(move || {
                let mut tracker = GenerationTracker::new(TrackerLimits::default());
                for k in 0..25u64 {
                    let event = worker * 25 + k;
                    let mut parent = 0;
                    for id in 1..=(event % 4) as u32 {
                        tracker
                            .classify_new_track(&neutron(id, parent, 10.0 * f64::from(id)))
                            .unwrap();
                        parent = id;
                    }
                    recorder.end_of_event(event, &mut tracker).unwrap();
                }
            });
        }
    });

    assert_eq!(recorder.finish().unwrap(), 100);

    let run = read_neutron_table(&path).unwrap();
    assert_eq!(run.event_count, 100);
    assert_eq!(run.events.len(), 75);
    assert_eq!(run.neutron_count(), 25 * (1 + 2 + 3));
    let third = run.events.iter().find(|e| e.event == 3).unwrap();
    assert_eq!(third.generations, vec![1, 2, 3]);
    assert_eq!(third.global_times_ns, vec![10.0, 20.0, 30.0]);
}
