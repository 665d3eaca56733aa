//! TOML configuration deserialisation for telescope runs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Top-level run configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Detector layers, front to back.
    #[serde(default = "default_detectors", rename = "detector")]
    pub detectors: Vec<DetectorConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the LISE range tables live.
#[derive(Debug, Deserialize)]
pub struct TablesConfig {
    /// Directory scanned for `*.txt` tables (default: "data").
    #[serde(default = "default_tables_dir")]
    pub directory: PathBuf,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            directory: default_tables_dir(),
        }
    }
}

fn default_tables_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Event generator parameters.
#[derive(Debug, Deserialize)]
pub struct GeneratorConfig {
    /// Total kinetic energy range in MeV (default: [0, 300]).
    #[serde(default = "default_energy_range")]
    pub energy_range: [f64; 2],
    /// Events per table (default: 100000).
    #[serde(default = "default_events")]
    pub events: usize,
    /// Base RNG seed. Taken from the clock when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Compute backend: "auto", "cpu", or "serial". Default: "auto".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Worker threads for the CPU backend (default: all cores).
    #[serde(default)]
    pub threads: Option<usize>,
    /// Events per work chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            energy_range: default_energy_range(),
            events: default_events(),
            seed: None,
            backend: default_backend(),
            threads: None,
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_energy_range() -> [f64; 2] {
    [0.0, 300.0]
}
fn default_events() -> usize {
    100_000
}
fn default_backend() -> String {
    "auto".into()
}
fn default_chunk_size() -> usize {
    lise_core::generator::DEFAULT_CHUNK_SIZE
}

/// A single detector layer.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Thickness in um.
    pub depth_um: f64,
}

fn default_detectors() -> Vec<DetectorConfig> {
    [100.0, 300.0, 2000.0]
        .into_iter()
        .map(|depth_um| DetectorConfig { depth_um })
        .collect()
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./run").
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// Replace existing run tables instead of refusing to start (default: false).
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to also save events as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Rewrite the table every this many events; 0 disables (default: 10000).
    #[serde(default = "default_autosave")]
    pub autosave_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            overwrite: false,
            save_json: false,
            autosave_every: default_autosave(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./run")
}
fn default_autosave() -> usize {
    10_000
}

impl JobConfig {
    /// Check values that deserialisation alone cannot.
    pub fn check(&self) -> anyhow::Result<()> {
        let [emin, emax] = self.generator.energy_range;
        if !(emin >= 0.0 && emin < emax && emax.is_finite()) {
            anyhow::bail!("generator.energy_range must satisfy 0 <= emin < emax, got [{}, {}]", emin, emax);
        }
        if self.detectors.is_empty() {
            anyhow::bail!("at least one [[detector]] is required");
        }
        if let Some(bad) = self
            .detectors
            .iter()
            .find(|d| !(d.depth_um.is_finite() && d.depth_um >= 0.0))
        {
            anyhow::bail!("detector depth_um must be finite and non-negative, got {}", bad.depth_um);
        }
        if !matches!(self.generator.backend.as_str(), "auto" | "cpu" | "serial") {
            anyhow::bail!(
                "Unknown backend '{}'. Valid values: auto, cpu, serial",
                self.generator.backend
            );
        }
        if self.generator.threads == Some(0) {
            anyhow::bail!("generator.threads must be at least 1");
        }
        Ok(())
    }

    pub fn detector_depths(&self) -> Vec<f64> {
        self.detectors.iter().map(|d| d.depth_um).collect()
    }
}

/// Parse a configuration from TOML text.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    config.check()?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid configuration {}", path.display()))
}
