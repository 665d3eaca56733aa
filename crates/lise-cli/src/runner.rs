//! Run driver: ties together range tables, detectors, and the generator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use lise_compute::{time_seed, ComputeBackend, CpuBackend, SerialBackend};
use lise_core::analysis::{
    neutron_histograms, EnergyCorrelations, ExponentialFit, Histogram, NeutronAxes, NeutronHistograms,
};
use lise_core::types::telescope_header;
use lise_core::{
    read_neutron_table, read_telescope_table, Detector, EventRecord, EventTable, OpenMode,
    SharedTable, TelescopeGenerator, TelescopeRun,
};
use lise_tables::{list_tables, natural_cmp, RangeProvider, RangeTable};

use crate::config::JobConfig;

/// Summary of one generated table.
pub struct RunSummary {
    pub table: PathBuf,
    pub output: PathBuf,
    pub events: usize,
}

/// Load every range table of the catalogue, in natural order.
pub fn load_tables(dir: &Path) -> Result<Vec<RangeTable>> {
    let paths = list_tables(dir)
        .with_context(|| format!("Failed to list range tables in {}", dir.display()))?;
    if paths.is_empty() {
        anyhow::bail!("No range tables (*.txt) found in {}", dir.display());
    }
    paths
        .iter()
        .map(|p| RangeTable::load(p).with_context(|| format!("Failed to load {}", p.display())))
        .collect()
}

/// Listing line of a range table: `path  beam  target  rows`.
pub fn table_line(table: &RangeTable) -> String {
    format!("{}  {}  {}  {}", table.path(), table.beam(), table.target(), table.len())
}

/// Listing line of a telescope run: `path  beam  target  events`.
pub fn run_line(run: &TelescopeRun) -> String {
    format!("{}  {}  {}  {}", run.path.display(), run.beam, run.target, run.events.len())
}

/// Generate one telescope table per range table.
pub fn run_telescopes(job: &JobConfig, out_dir: &Path) -> Result<Vec<RunSummary>> {
    let tables = load_tables(&job.tables.directory)?;
    let backend = create_backend(&job.generator.backend, job.generator.threads)?;
    let seed = job.generator.seed.unwrap_or_else(time_seed);
    let mode = if job.output.overwrite {
        OpenMode::Recreate
    } else {
        OpenMode::New
    };
    println!("Seed: {}", seed);

    let mut summaries = Vec::with_capacity(tables.len());
    for table in tables {
        println!("{}  {}  {}", table.path(), table.beam(), table.target());
        let table_path = PathBuf::from(table.path());
        let provider: Arc<dyn RangeProvider> = Arc::new(table);
        let generator = build_generator(job, provider)?;

        let beam = generator
            .beam()
            .context("Generator has no detectors")?;
        let target = generator
            .detector(0)
            .map(|d| d.provider().target().to_string())
            .unwrap_or_default();
        let output = out_dir.join(format!("{}_{}.csv", beam, target));

        let mut events = EventTable::create(
            &output,
            "LISE telescope events",
            telescope_header(generator.detector_count()),
            mode,
        )
        .with_context(|| format!("Failed to create {}", output.display()))?;
        generator.describe(&mut events, seed)?;

        let shared: SharedTable<EventRecord> =
            SharedTable::new(events, Some(job.output.autosave_every));
        generator.generate_events(
            job.generator.events,
            seed,
            job.generator.chunk_size,
            backend.as_ref(),
            &shared,
        )?;

        let mut events = shared.into_inner()?;
        if job.output.save_json {
            events.sort();
            let json_path = output.with_extension("json");
            events.write_json(&json_path)?;
            println!("Events (JSON) written to: {}", json_path.display());
        }
        let count = events.finish()?;
        println!("Events written to: {} ({} events)", output.display(), count);

        summaries.push(RunSummary {
            table: table_path,
            output,
            events: count,
        });
    }
    Ok(summaries)
}

/// Build the detector stack of `job` on a single range relation.
pub fn build_generator(job: &JobConfig, provider: Arc<dyn RangeProvider>) -> Result<TelescopeGenerator> {
    let [emin, emax] = job.generator.energy_range;
    let mut generator = TelescopeGenerator::new(emin, emax)?;
    for depth in job.detector_depths() {
        generator.add_detector(Detector::new(provider.clone(), depth)?)?;
    }
    Ok(generator)
}

/// Telescope tables (`*.csv`) in a run directory, in natural order.
pub fn list_runs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read run directory {}", dir.display()))?;
    let mut runs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "csv") {
            runs.push(path);
        }
    }
    runs.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(runs)
}

/// Read every telescope run in `dir` and build its correlations.
///
/// Files that are not telescope tables, and runs with fewer than three
/// detectors, are skipped with a warning.
pub fn analyze_runs(dir: &Path) -> Result<Vec<EnergyCorrelations>> {
    let mut correlations = Vec::new();
    for path in list_runs(dir)? {
        let run = match read_telescope_table(&path) {
            Ok(run) => run,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        println!("{}", run_line(&run));
        match EnergyCorrelations::from_run(&run) {
            Ok(c) => {
                info!("{}: {} events", c.label, run.events.len());
                correlations.push(c);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    if correlations.is_empty() {
        anyhow::bail!("No telescope runs with three or more detectors in {}", dir.display());
    }
    Ok(correlations)
}

/// Read a neutron table and histogram it per event.
pub fn analyze_neutrons(path: &Path, axes: &NeutronAxes) -> Result<NeutronHistograms> {
    let run = read_neutron_table(path)
        .with_context(|| format!("Failed to read neutron table {}", path.display()))?;
    println!(
        "The run consists of {} events ({} neutrons)",
        run.event_count,
        run.neutron_count()
    );
    Ok(neutron_histograms(&run, axes)?)
}

/// Fit the exponential part of `hist` inside `window` and print the rate.
///
/// A window with too few filled bins is reported and yields `None`.
pub fn fit_growth(name: &str, hist: &Histogram, window: (f64, f64)) -> Option<ExponentialFit> {
    match ExponentialFit::fit(hist, window) {
        Ok(fit) => {
            println!(
                "{}: k = {:.6} ({:.6}), exp(k) = {:.6} ({:.6}), r = {:.6}, {} bins",
                name,
                fit.k,
                fit.sigma_k,
                fit.growth(),
                fit.sigma_growth(),
                fit.r,
                fit.points
            );
            Some(fit)
        }
        Err(e) => {
            warn!("{}: no fit: {}", name, e);
            None
        }
    }
}

/// Create a compute backend based on the user's preference string.
///
/// - `"serial"`: caller thread only.
/// - `"cpu"`: Rayon pool, `threads` workers if given.
/// - `"auto"` (default): same as `"cpu"`.
pub fn create_backend(preference: &str, threads: Option<usize>) -> Result<Box<dyn ComputeBackend>> {
    let backend: Box<dyn ComputeBackend> = match preference {
        "serial" => Box::new(SerialBackend::new()),
        "cpu" | "auto" => match threads {
            Some(n) => Box::new(CpuBackend::with_threads(n)?),
            None => Box::new(CpuBackend::new()),
        },
        other => anyhow::bail!("Unknown backend '{}'. Valid values: auto, cpu, serial", other),
    };
    let info = backend.device_info();
    println!("Backend: {} ({} threads)", info.name, info.threads);
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const TABLE: &str = "\
! 10Be range in Si
E [MeV/u]  Range [um]
----
0.1 1 0.1 1 0.1 1 0.1 1 0.1 0.25
1 10 1 10 1 10 1 10 1 14
10 700 10 700 10 700 10 700 10 780
100 40000 100 40000 100 40000 100 40000 100 44000
";

    fn job(dir: &Path) -> JobConfig {
        std::fs::create_dir_all(dir.join("data")).unwrap();
        std::fs::write(dir.join("data").join("10Be_Si.txt"), TABLE).unwrap();
        let toml = format!(
            "[tables]\ndirectory = {:?}\n[generator]\nevents = 300\nseed = 5\nbackend = \"serial\"\nchunk_size = 64\n[output]\ndirectory = {:?}\n",
            dir.join("data"),
            dir.join("run")
        );
        parse_config(&toml).unwrap()
    }

    #[test]
    fn test_run_then_analyze() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        let out = job.output.directory.clone();

        let summaries = run_telescopes(&job, &out).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].events, 300);
        assert_eq!(summaries[0].output, out.join("10Be_Si.csv"));

        let tables = load_tables(&job.tables.directory).unwrap();
        assert!(table_line(&tables[0]).ends_with("10Be_Si.txt  10Be  Si  4"));
        let run = read_telescope_table(&summaries[0].output).unwrap();
        assert_eq!(
            run_line(&run),
            format!("{}  10Be  Si  300", summaries[0].output.display())
        );

        let correlations = analyze_runs(&out).unwrap();
        assert_eq!(correlations.len(), 1);
        assert_eq!(correlations[0].label, "10Be on Si");
        assert_eq!(correlations[0].e0_e1.len(), 300);
    }

    #[test]
    fn test_second_run_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        let out = job.output.directory.clone();
        run_telescopes(&job, &out).unwrap();
        assert!(run_telescopes(&job, &out).is_err());
    }

    #[test]
    fn test_json_export_is_in_event_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path());
        job.output.save_json = true;
        job.generator.backend = "cpu".into();
        job.generator.threads = Some(3);
        job.generator.chunk_size = 16;
        let out = job.output.directory.clone();

        run_telescopes(&job, &out).unwrap();
        let json = std::fs::read_to_string(out.join("10Be_Si.json")).unwrap();
        let events: Vec<EventRecord> = serde_json::from_str(&json).unwrap();
        let order: Vec<u64> = events.iter().map(|e| e.event).collect();
        assert_eq!(order, (0..300).collect::<Vec<u64>>());

        let run = read_telescope_table(out.join("10Be_Si.csv")).unwrap();
        assert_eq!(run.events, events);
        assert!(!out.join("10Be_Si.tmp").exists());
    }

    #[test]
    fn test_neutron_growth_fit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neutrons.csv");
        let mut table =
            EventTable::create(&path, "neutrons", lise_core::types::NEUTRON_HEADER, OpenMode::New).unwrap();
        // 2^g neutrons in generation g at 10 g ns, over two events
        let mut event = lise_core::NeutronEvent {
            event: 0,
            ..Default::default()
        };
        for g in 1..=8u32 {
            for _ in 0..(1u32 << g) {
                event.generations.push(g);
                event.global_times_ns.push(10.0 * f64::from(g));
            }
        }
        table.append(event);
        table.append(lise_core::NeutronEvent {
            event: 1,
            ..Default::default()
        });
        table.finish().unwrap();

        let axes = NeutronAxes {
            time_max_ns: 100.0,
            generation_max: 10.0,
            bins: 10,
        };
        let hists = analyze_neutrons(&path, &axes).unwrap();
        assert_eq!(hists.generation.counts()[3], 4.0);

        let fit = fit_growth("generation", &hists.generation, (1.0, 9.0)).unwrap();
        assert!((fit.growth() - 2.0).abs() < 1e-9);
        assert!(fit_growth("generation", &hists.generation, (9.5, 10.0)).is_none());
    }

    #[test]
    fn test_unknown_backend() {
        assert!(create_backend("gpu", None).is_err());
        assert!(create_backend("serial", None).is_ok());
    }
}
