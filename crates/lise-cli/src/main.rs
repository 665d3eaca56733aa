//! LISE command-line interface.
//!
//! Generate telescope events from TOML configuration files and plot the
//! results:
//! ```sh
//! lise-cli run telescope.toml
//! lise-cli tables --dir data
//! lise-cli analyze telescope.toml
//! lise-cli neutrons run/neutrons.csv
//! ```

mod config;
mod plot;
mod runner;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lise_core::analysis::{range_curve, NeutronAxes};

use crate::plot::Correlation;

#[derive(Parser)]
#[command(name = "lise-cli")]
#[command(about = "LISE: range-table driven telescope event generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate telescope events for every range table.
    Run {
        /// Path to the run configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and load its range tables without running.
    Validate {
        /// Path to the run configuration file.
        config: PathBuf,
    },
    /// List the range tables of a directory.
    Tables {
        /// Table directory.
        #[arg(short, long, default_value = "data")]
        dir: PathBuf,
    },
    /// Plot the range curves of all tables (Lise.png).
    PlotTables {
        /// Table directory.
        #[arg(short, long, default_value = "data")]
        dir: PathBuf,
        /// Output directory for the plot.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Plot energy correlations of the runs produced by a configuration.
    Analyze {
        /// Path to the run configuration file.
        config: PathBuf,
        /// Directory holding the run tables (overrides config file setting).
        #[arg(short, long)]
        runs: Option<PathBuf>,
    },
    /// Histogram a neutron generation table.
    Neutrons {
        /// Neutron table written by the recorder.
        table: PathBuf,
        /// Output directory for plots and CSV.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Upper end of the global time axis in ns.
        #[arg(long, default_value_t = 1200.0)]
        time_max: f64,
        /// Global time window (ns) of the exponential fit.
        #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [400.0, 1000.0])]
        fit_window: Vec<f64>,
        /// Generation window of the exponential fit.
        #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [54.0, 156.0])]
        generation_window: Vec<f64>,
        /// Plot the histograms without fitting.
        #[arg(long)]
        no_fit: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("LISE Telescope Generator");
            println!("========================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let out_dir = output.unwrap_or_else(|| job.output.directory.clone());
            let summaries = runner::run_telescopes(&job, &out_dir)?;
            for s in &summaries {
                println!("  {} -> {} ({} events)", s.table.display(), s.output.display(), s.events);
            }
            println!("Generation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let tables = runner::load_tables(&job.tables.directory)?;
            for table in tables {
                runner::build_generator(&job, std::sync::Arc::new(table))?;
            }
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Tables { dir } => {
            for table in runner::load_tables(&dir)? {
                println!("{}", runner::table_line(&table));
            }
            Ok(())
        }
        Commands::PlotTables { dir, output } => {
            let tables = runner::load_tables(&dir)?;
            for table in &tables {
                println!("{}", runner::table_line(table));
            }
            let curves: Vec<_> = tables.iter().map(range_curve).collect();
            let path = output.join("Lise.png");
            ensure_dir(&output)?;
            plot::render_range_curves(&path, &curves)
                .map_err(|e| anyhow::anyhow!("Failed to draw {}: {}", path.display(), e))?;
            println!("Range curves written to: {}", path.display());
            Ok(())
        }
        Commands::Analyze { config, runs } => {
            let job = config::load_config(&config)?;
            let run_dir = runs.unwrap_or_else(|| job.output.directory.clone());
            let correlations = runner::analyze_runs(&run_dir)?;
            let plot_dir = run_dir.join("plots");
            ensure_dir(&plot_dir)?;

            for which in Correlation::ALL {
                let name = &which.series(&correlations[0]).name;
                let png = plot_dir.join(format!("{}.png", name));
                plot::render_correlation(&png, which, &correlations)
                    .map_err(|e| anyhow::anyhow!("Failed to draw {}: {}", png.display(), e))?;
                for c in &correlations {
                    let stem = c.label.replace(" on ", "_");
                    let csv = plot_dir.join(format!("{}_{}.csv", stem, name));
                    plot::write_series_csv(&csv, which.series(c))
                        .with_context(|| format!("Failed to write {}", csv.display()))?;
                }
                println!("{} written to: {}", name, png.display());
            }
            Ok(())
        }
        Commands::Neutrons {
            table,
            output,
            time_max,
            fit_window,
            generation_window,
            no_fit,
        } => {
            let axes = NeutronAxes {
                time_max_ns: time_max,
                ..Default::default()
            };
            let hists = runner::analyze_neutrons(&table, &axes)?;
            ensure_dir(&output)?;
            let plots = [
                ("NeutronGlobalTime", "Neutron creation time", "global time (ns)", "global_time_ns", &hists.global_time, window(&fit_window)?),
                ("NeutronGeneration", "Neutron generation", "generation", "generation", &hists.generation, window(&generation_window)?),
            ];
            for (name, title, x_desc, column, hist, fit_window) in plots {
                let fit = if no_fit {
                    None
                } else {
                    runner::fit_growth(name, hist, fit_window)
                };
                let png = output.join(format!("{}.png", name));
                plot::render_histogram(&png, title, x_desc, hist, fit.as_ref())
                    .map_err(|e| anyhow::anyhow!("Failed to draw {}: {}", png.display(), e))?;
                let csv = output.join(format!("{}.csv", name));
                plot::write_histogram_csv(&csv, column, hist)
                    .with_context(|| format!("Failed to write {}", csv.display()))?;
                println!("{} written to: {}", name, png.display());
            }
            Ok(())
        }
    }
}

fn window(bounds: &[f64]) -> Result<(f64, f64)> {
    match *bounds {
        [lo, hi] => Ok((lo, hi)),
        _ => anyhow::bail!("a fit window takes two values, got {}", bounds.len()),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}
