//! Reading telescope and neutron tables back from disk.

use std::path::{Path, PathBuf};

use log::debug;

use crate::beam::Beam;
use crate::error::CoreError;
use crate::types::{EventRecord, NeutronEvent, NEUTRON_HEADER};

/// A telescope run read from disk.
#[derive(Debug, Clone)]
pub struct TelescopeRun {
    pub path: PathBuf,
    pub beam: Beam,
    pub target: String,
    /// Detector thicknesses (um), front to back.
    pub depths_um: Vec<f64>,
    /// Total-energy range of the source (MeV), if recorded.
    pub energy_range: Option<(f64, f64)>,
    pub seed: Option<u64>,
    pub events: Vec<EventRecord>,
}

impl TelescopeRun {
    pub fn detector_count(&self) -> usize {
        self.depths_um.len()
    }
}

/// A neutron run read from disk.
#[derive(Debug, Clone)]
pub struct NeutronRun {
    pub path: PathBuf,
    /// Number of simulated events, including those without neutrons.
    pub event_count: usize,
    /// Events that produced at least one neutron, in event order.
    pub events: Vec<NeutronEvent>,
}

impl NeutronRun {
    /// Total number of recorded neutrons.
    pub fn neutron_count(&self) -> usize {
        self.events.iter().map(NeutronEvent::len).sum()
    }
}

/// Comment header, column names and numbered data lines of a table file.
struct RawTable<'a> {
    label: String,
    metadata: Vec<(&'a str, &'a str)>,
    columns: Vec<&'a str>,
    rows: Vec<(usize, Vec<&'a str>)>,
}

impl<'a> RawTable<'a> {
    fn parse(content: &'a str, label: String) -> Result<Self, CoreError> {
        let mut metadata = Vec::new();
        let mut columns = None;
        let mut rows = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if let Some((key, value)) = comment.split_once(':') {
                    metadata.push((key.trim(), value.trim()));
                }
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if columns.is_none() {
                columns = Some(fields);
            } else {
                rows.push((line_no, fields));
            }
        }

        let columns = columns.ok_or_else(|| CoreError::Format {
            path: label.clone(),
            line: content.lines().count(),
            message: "missing column header".into(),
        })?;

        Ok(Self {
            label,
            metadata,
            columns,
            rows,
        })
    }

    fn metadata(&self, key: &str) -> Option<&'a str> {
        self.metadata
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    fn required(&self, key: &str) -> Result<&'a str, CoreError> {
        self.metadata(key).ok_or_else(|| CoreError::Format {
            path: self.label.clone(),
            line: 1,
            message: format!("missing metadata entry '{}'", key),
        })
    }

    fn error(&self, line: usize, message: impl Into<String>) -> CoreError {
        CoreError::Format {
            path: self.label.clone(),
            line,
            message: message.into(),
        }
    }

    fn field<T: std::str::FromStr>(&self, line: usize, name: &str, value: &str) -> Result<T, CoreError> {
        value
            .parse()
            .map_err(|_| self.error(line, format!("invalid {} '{}'", name, value)))
    }
}

fn read(path: &Path) -> Result<String, CoreError> {
    std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))
}

/// Read a telescope table written by the generator.
pub fn read_telescope_table(path: impl AsRef<Path>) -> Result<TelescopeRun, CoreError> {
    let path = path.as_ref();
    let content = read(path)?;
    let raw = RawTable::parse(&content, path.display().to_string())?;

    let beam = Beam::parse(raw.required("beam")?)?;
    let target = raw.required("target")?.to_string();
    let depths_um = raw
        .required("detectors_um")?
        .split_whitespace()
        .map(|v| raw.field(1, "detector depth", v))
        .collect::<Result<Vec<f64>, _>>()?;
    let energy_range = match raw.metadata("energy_range") {
        Some(v) => {
            let bounds = v
                .split_whitespace()
                .map(|b| raw.field(1, "energy bound", b))
                .collect::<Result<Vec<f64>, _>>()?;
            match bounds[..] {
                [lo, hi] => Some((lo, hi)),
                _ => return Err(raw.error(1, format!("invalid energy_range '{}'", v))),
            }
        }
        None => None,
    };
    let seed = raw
        .metadata("seed")
        .map(|v| raw.field(1, "seed", v))
        .transpose()?;

    let expected = 3 + depths_um.len() + 1;
    if raw.columns.len() != expected {
        return Err(raw.error(
            1,
            format!(
                "header has {} columns, expected {} for {} detectors",
                raw.columns.len(),
                expected,
                depths_um.len()
            ),
        ));
    }

    let mut events = Vec::with_capacity(raw.rows.len());
    for (line, fields) in &raw.rows {
        let line = *line;
        if fields.len() != expected {
            return Err(raw.error(
                line,
                format!("expected {} columns, found {}", expected, fields.len()),
            ));
        }
        let energies = fields[3..]
            .iter()
            .map(|v| raw.field(line, "energy", v))
            .collect::<Result<Vec<f64>, _>>()?;
        events.push(EventRecord {
            event: raw.field(line, "event number", fields[0])?,
            z: raw.field(line, "Z", fields[1])?,
            a: raw.field(line, "A", fields[2])?,
            energies,
        });
    }

    debug!("Read {} events of {} on {} from {}", events.len(), beam, target, path.display());
    Ok(TelescopeRun {
        path: path.to_path_buf(),
        beam,
        target,
        depths_um,
        energy_range,
        seed,
        events,
    })
}

/// Read a neutron table written by [`NeutronRecorder`](crate::recorder::NeutronRecorder).
pub fn read_neutron_table(path: impl AsRef<Path>) -> Result<NeutronRun, CoreError> {
    let path = path.as_ref();
    let content = read(path)?;
    let raw = RawTable::parse(&content, path.display().to_string())?;

    let event_count: usize = raw.field(1, "record count", raw.required("records")?)?;
    let header = raw.columns.join(",");
    if header != NEUTRON_HEADER {
        return Err(raw.error(1, format!("unexpected header '{}'", header)));
    }

    let mut events: Vec<NeutronEvent> = Vec::new();
    for (line, fields) in &raw.rows {
        let line = *line;
        if fields.len() != 3 {
            return Err(raw.error(line, format!("expected 3 columns, found {}", fields.len())));
        }
        let event: u64 = raw.field(line, "event number", fields[0])?;
        let generation: u32 = raw.field(line, "generation", fields[1])?;
        let time: f64 = raw.field(line, "global time", fields[2])?;

        match events.last_mut() {
            Some(last) if last.event == event => {
                last.generations.push(generation);
                last.global_times_ns.push(time);
            }
            _ => events.push(NeutronEvent {
                event,
                generations: vec![generation],
                global_times_ns: vec![time],
            }),
        }
    }

    if events.len() > event_count {
        return Err(raw.error(
            1,
            format!("{} events with neutrons but only {} recorded", events.len(), event_count),
        ));
    }

    Ok(NeutronRun {
        path: path.to_path_buf(),
        event_count,
        events,
    })
}
