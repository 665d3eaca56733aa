//! Post-processing of telescope and neutron runs.
//!
//! Turns runs read back from disk into plot-ready series and histograms.
//! Rendering lives in the command-line crate.

use lise_tables::{RangeProvider, RangeTable, DEPTH_UNIT, ENERGY_UNIT};

use crate::error::CoreError;
use crate::reader::{NeutronRun, TelescopeRun};

/// Axis limits are this factor times the largest value seen.
pub const AXIS_HEADROOM: f64 = 1.2;

/// A named (x, y) series sorted by x.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    fn new(name: &str, x_label: String, y_label: String, mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            name: name.to_string(),
            x_label,
            y_label,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Unit of deposited energies: the table unit without the per-nucleon part.
pub fn energy_axis_unit() -> &'static str {
    ENERGY_UNIT.strip_suffix("/u").unwrap_or(ENERGY_UNIT)
}

fn energy_label(name: &str) -> String {
    format!("{} ({})", name, energy_axis_unit())
}

/// Running maxima of the plotted energies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageMaxima {
    pub e0: f64,
    pub e1: f64,
    pub e2: f64,
    pub e3: f64,
    pub eloss: f64,
}

impl StageMaxima {
    pub fn merge(&mut self, other: &StageMaxima) {
        self.e0 = self.e0.max(other.e0);
        self.e1 = self.e1.max(other.e1);
        self.e2 = self.e2.max(other.e2);
        self.e3 = self.e3.max(other.e3);
        self.eloss = self.eloss.max(other.eloss);
    }

    /// Upper axis limit for a stage maximum.
    pub fn limit(max: f64) -> f64 {
        AXIS_HEADROOM * max
    }
}

/// The four energy correlation plots of a three-layer telescope.
#[derive(Debug, Clone)]
pub struct EnergyCorrelations {
    /// Label of the run, `"<beam> on <target>"`.
    pub label: String,
    /// E1 vs E2 for events reaching the second layer.
    pub e1_e2: Series,
    /// E2 vs E3 for events reaching the third layer.
    pub e2_e3: Series,
    /// E1 vs total loss for events depositing beyond the first layer.
    pub e1_eloss: Series,
    /// E0 vs E1.
    pub e0_e1: Series,
    pub maxima: StageMaxima,
}

impl EnergyCorrelations {
    /// Build the correlations of a run with at least three detectors.
    ///
    /// Layers beyond the third are ignored.
    pub fn from_run(run: &TelescopeRun) -> Result<Self, CoreError> {
        if run.detector_count() < 3 {
            return Err(CoreError::InvalidConfig(format!(
                "energy correlations need at least 3 detectors, {} has {}",
                run.path.display(),
                run.detector_count()
            )));
        }

        let mut e1_e2 = Vec::new();
        let mut e2_e3 = Vec::new();
        let mut e1_eloss = Vec::new();
        let mut e0_e1 = Vec::with_capacity(run.events.len());
        let mut maxima = StageMaxima::default();

        for event in &run.events {
            let (e0, e1, e2, e3) = match event.energies[..] {
                [e0, e1, e2, e3, ..] => (e0, e1, e2, e3),
                _ => continue,
            };
            let eloss = e1 + e2 + e3;

            maxima.merge(&StageMaxima {
                e0,
                e1,
                e2,
                e3,
                eloss,
            });

            if e2 != 0.0 {
                e1_e2.push((e1, e2));
            }
            if e3 != 0.0 {
                e2_e3.push((e2, e3));
            }
            if eloss > e1 {
                e1_eloss.push((e1, eloss));
            }
            e0_e1.push((e0, e1));
        }

        Ok(Self {
            label: format!("{} on {}", run.beam, run.target),
            e1_e2: Series::new("E1_E2", energy_label("E1"), energy_label("E2"), e1_e2),
            e2_e3: Series::new("E2_E3", energy_label("E2"), energy_label("E3"), e2_e3),
            e1_eloss: Series::new("E1_El", energy_label("E1"), energy_label("Eloss"), e1_eloss),
            e0_e1: Series::new("E0_E1", energy_label("E0"), energy_label("E1"), e0_e1),
            maxima,
        })
    }

    /// All four series in plot order.
    pub fn series(&self) -> [&Series; 4] {
        [&self.e1_e2, &self.e2_e3, &self.e1_eloss, &self.e0_e1]
    }
}

/// Range curve of a table, labelled `"<beam> on <target>"`.
pub fn range_curve(table: &RangeTable) -> Series {
    Series::new(
        &format!("{} on {}", table.beam(), table.target()),
        format!("Energy ({})", ENERGY_UNIT),
        format!("Range ({})", DEPTH_UNIT),
        table.points().collect(),
    )
}

/// Fixed-width histogram with weighted entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    min: f64,
    max: f64,
    counts: Vec<f64>,
}

impl Histogram {
    pub fn new(min: f64, max: f64, bins: usize) -> Result<Self, CoreError> {
        if bins == 0 || !(min.is_finite() && max.is_finite() && min < max) {
            return Err(CoreError::InvalidConfig(format!(
                "histogram needs bins > 0 and min < max, got {} bins over [{}, {}]",
                bins, min, max
            )));
        }
        Ok(Self {
            min,
            max,
            counts: vec![0.0; bins],
        })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Add `weight` to the bin containing `value`.
    ///
    /// Bins are half-open except the last, which also takes `max`. Values
    /// outside `[min, max]` are dropped.
    pub fn fill(&mut self, value: f64, weight: f64) {
        if !(value >= self.min && value <= self.max) {
            return;
        }
        let bin = ((value - self.min) / self.bin_width()) as usize;
        let last = self.counts.len() - 1;
        self.counts[bin.min(last)] += weight;
    }

    pub fn centers(&self) -> Vec<f64> {
        let width = self.bin_width();
        (0..self.counts.len())
            .map(|i| self.min + (i as f64 + 0.5) * width)
            .collect()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }
}

/// Axis ranges of the neutron histograms. Both axes start at 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutronAxes {
    pub time_max_ns: f64,
    pub generation_max: f64,
    pub bins: usize,
}

impl Default for NeutronAxes {
    fn default() -> Self {
        Self {
            time_max_ns: 1200.0,
            generation_max: 300.0,
            bins: 50,
        }
    }
}

/// Per-event neutron distributions.
#[derive(Debug, Clone)]
pub struct NeutronHistograms {
    /// Global creation time in ns.
    pub global_time: Histogram,
    /// Generation number.
    pub generation: Histogram,
}

/// Histogram all neutrons of a run, each weighted by `1 / event_count`.
pub fn neutron_histograms(run: &NeutronRun, axes: &NeutronAxes) -> Result<NeutronHistograms, CoreError> {
    let mut global_time = Histogram::new(0.0, axes.time_max_ns, axes.bins)?;
    let mut generation = Histogram::new(0.0, axes.generation_max, axes.bins)?;
    if run.event_count == 0 {
        return Ok(NeutronHistograms {
            global_time,
            generation,
        });
    }

    let weight = 1.0 / run.event_count as f64;
    for event in &run.events {
        for (&g, &t) in event.generations.iter().zip(&event.global_times_ns) {
            global_time.fill(t, weight);
            generation.fill(f64::from(g), weight);
        }
    }
    Ok(NeutronHistograms {
        global_time,
        generation,
    })
}

/// Least-squares fit of `ln(count) = k x + b` over the bins of a histogram
/// whose centers fall inside a window.
///
/// `k` is the growth rate of the neutron population per ns (time axis) or per
/// generation, so `exp(k)` is the multiplication factor per unit step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialFit {
    pub k: f64,
    pub intercept: f64,
    /// Pearson correlation of `x` and `ln(count)`; 0 when the counts are flat.
    pub r: f64,
    /// Standard error of `k`.
    pub sigma_k: f64,
    /// Lower edge of the first and upper edge of the last fitted bin.
    pub edges: (f64, f64),
    /// Number of fitted bins.
    pub points: usize,
}

impl ExponentialFit {
    /// Bins outside `window` or with no entries are ignored. At least three
    /// filled bins are required.
    pub fn fit(hist: &Histogram, window: (f64, f64)) -> Result<Self, CoreError> {
        let (lo, hi) = window;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(CoreError::InvalidConfig(format!(
                "fit window needs lo < hi, got [{}, {}]",
                lo, hi
            )));
        }
        let points: Vec<(f64, f64)> = hist
            .centers()
            .into_iter()
            .zip(hist.counts().iter().copied())
            .filter(|&(x, c)| x >= lo && x <= hi && c > 0.0)
            .map(|(x, c)| (x, c.ln()))
            .collect();
        let n = points.len();
        if n < 3 {
            return Err(CoreError::InvalidConfig(format!(
                "fit window [{}, {}] holds {} filled bins, at least 3 are needed",
                lo, hi, n
            )));
        }

        let nf = n as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;
        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for &(x, y) in &points {
            let (dx, dy) = (x - mean_x, y - mean_y);
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        let k = sxy / sxx;
        let intercept = mean_y - k * mean_x;
        let r = if syy > 0.0 { sxy / (sxx * syy).sqrt() } else { 0.0 };
        let residual = (syy - k * sxy).max(0.0);
        let sigma_k = (residual / (nf - 2.0) / sxx).sqrt();

        let half = hist.bin_width() / 2.0;
        let first = points[0].0 - half;
        let last = points[n - 1].0 + half;
        Ok(Self {
            k,
            intercept,
            r,
            sigma_k,
            edges: (first, last),
            points: n,
        })
    }

    /// Multiplication factor per unit step, `exp(k)`.
    pub fn growth(&self) -> f64 {
        self.k.exp()
    }

    /// Standard error of [`growth`](Self::growth).
    pub fn sigma_growth(&self) -> f64 {
        self.growth() * self.sigma_k
    }

    /// Fitted count at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        (self.k * x + self.intercept).exp()
    }
}
