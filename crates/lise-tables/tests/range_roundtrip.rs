//! Property tests for range-table lookups.
//!
//! Covers: monotonicity of both lookups, energy → depth → energy recovery
//! for in-range inputs, and agreement of a dense table with the analytic
//! Bragg–Kleeman model it was sampled from.

use approx::assert_relative_eq;
use proptest::prelude::*;

use lise_tables::power_law::PowerLawRange;
use lise_tables::{RangeProvider, RangeTable};

// ── Helpers ──────────────────────────────────────────────────────────

/// Render a LISE-format file sampled from `model` at `n` log-spaced energies.
fn lise_file_from_model(model: &PowerLawRange, n: usize) -> String {
    let (lo, hi) = model.energy_range();
    let mut s = String::from("! 10Be range in Si\nE [MeV/u]  Range [um]\n----\n");
    for i in 0..n {
        let t = i as f64 / (n - 1) as f64;
        let e = lo * (hi / lo).powf(t);
        let x = model.depth_at(e);
        s.push_str(&format!(
            "{e:.9e} {x:.9e} {e:.9e} {x:.9e} {e:.9e} {x:.9e} {e:.9e} {x:.9e} {e:.9e} {x:.9e}\n"
        ));
    }
    s
}

fn reference() -> (PowerLawRange, RangeTable) {
    let model = PowerLawRange::new("10Be", "Si", 14.0, 1.75, (0.1, 100.0)).unwrap();
    let table = RangeTable::parse(&lise_file_from_model(&model, 400), "synthetic").unwrap();
    (model, table)
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    /// E → x → E recovers the input energy for in-range energies.
    #[test]
    fn energy_depth_energy_roundtrip(e in 0.1f64..100.0) {
        let (_, table) = reference();
        let back = table.energy_at(table.depth_at(e));
        prop_assert!((back - e).abs() <= 1e-9 * e.max(1.0), "E={} -> {}", e, back);
    }

    /// Both lookups preserve ordering.
    #[test]
    fn lookups_are_monotonic(a in 0.1f64..100.0, b in 0.1f64..100.0) {
        let (_, table) = reference();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(table.depth_at(lo) <= table.depth_at(hi));
        let (xlo, xhi) = (table.depth_at(lo), table.depth_at(hi));
        prop_assert!(table.energy_at(xlo) <= table.energy_at(xhi));
    }
}

#[test]
fn dense_table_tracks_model() {
    let (model, table) = reference();
    for &e in &[0.5, 2.0, 9.0, 33.0, 75.0] {
        assert_relative_eq!(table.depth_at(e), model.depth_at(e), max_relative = 1e-3);
    }
}

#[test]
fn load_from_disk() {
    let (model, _) = reference();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("10Be_Si.txt");
    std::fs::write(&path, lise_file_from_model(&model, 50)).unwrap();

    let table = RangeTable::load(&path).unwrap();
    assert_eq!(table.beam(), "10Be");
    assert_eq!(table.target(), "Si");
    assert_eq!(table.len(), 50);
    assert!(table.path().ends_with("10Be_Si.txt"));
}
