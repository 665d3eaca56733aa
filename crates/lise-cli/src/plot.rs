//! PNG rendering and CSV export of analysis results.

use std::error::Error;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use plotters::prelude::*;

use lise_core::analysis::{EnergyCorrelations, ExponentialFit, Histogram, Series, StageMaxima};

type PlotResult = Result<(), Box<dyn Error>>;

/// Log–log range curves of all tables on one canvas.
pub fn render_range_curves(out_path: &Path, curves: &[Series]) -> PlotResult {
    let positive: Vec<Vec<(f64, f64)>> = curves
        .iter()
        .map(|c| {
            c.points
                .iter()
                .copied()
                .filter(|&(x, y)| x > 0.0 && y > 0.0)
                .collect()
        })
        .collect();
    let all = positive.iter().flatten();
    let (x_min, x_max) = bounds(all.clone().map(|p| p.0));
    let (y_min, y_max) = bounds(all.map(|p| p.1));
    let (Some(x_min), Some(y_min)) = (x_min, y_min) else {
        return Err("no positive points to draw".into());
    };
    let (x_max, y_max) = (x_max.unwrap_or(x_min), y_max.unwrap_or(y_min));

    let root = BitMapBackend::new(out_path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("LISE range tables", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (x_min * 0.8..x_max * 1.25).log_scale(),
            (y_min * 0.8..y_max * 1.25).log_scale(),
        )?;

    let (x_desc, y_desc) = curves
        .first()
        .map(|c| (c.x_label.clone(), c.y_label.clone()))
        .unwrap_or_default();
    chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;

    for (i, (curve, points)) in curves.iter().zip(positive).enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(points, &color))?
            .label(curve.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Which correlation of [`EnergyCorrelations`] to draw.
#[derive(Debug, Clone, Copy)]
pub enum Correlation {
    E1E2,
    E2E3,
    E1Eloss,
    E0E1,
}

impl Correlation {
    pub const ALL: [Correlation; 4] = [
        Correlation::E1E2,
        Correlation::E2E3,
        Correlation::E1Eloss,
        Correlation::E0E1,
    ];

    pub fn series(self, c: &EnergyCorrelations) -> &Series {
        match self {
            Correlation::E1E2 => &c.e1_e2,
            Correlation::E2E3 => &c.e2_e3,
            Correlation::E1Eloss => &c.e1_eloss,
            Correlation::E0E1 => &c.e0_e1,
        }
    }

    fn limits(self, m: &StageMaxima) -> (f64, f64) {
        let (x, y) = match self {
            Correlation::E1E2 => (m.e1, m.e2),
            Correlation::E2E3 => (m.e2, m.e3),
            Correlation::E1Eloss => (m.e1, m.eloss),
            Correlation::E0E1 => (m.e0, m.e1),
        };
        (StageMaxima::limit(x).max(1.0), StageMaxima::limit(y).max(1.0))
    }
}

/// Scatter one correlation of every run on a shared canvas.
pub fn render_correlation(
    out_path: &Path,
    which: Correlation,
    runs: &[EnergyCorrelations],
) -> PlotResult {
    let mut maxima = StageMaxima::default();
    for run in runs {
        maxima.merge(&run.maxima);
    }
    let (x_max, y_max) = which.limits(&maxima);
    let Some(first) = runs.first().map(|r| which.series(r)) else {
        return Err("no runs to draw".into());
    };

    let root = BitMapBackend::new(out_path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&first.name, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc(first.x_label.as_str())
        .y_desc(first.y_label.as_str())
        .draw()?;

    for (i, run) in runs.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let series = which.series(run);
        chart
            .draw_series(
                series
                    .points
                    .iter()
                    .map(|&p| Circle::new(p, 1, color.filled())),
            )?
            .label(run.label.clone())
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Per-event histogram with a logarithmic y axis. Empty bins are not drawn.
///
/// A `fit` is overlaid across its fitted bins, between two boundary lines.
pub fn render_histogram(
    out_path: &Path,
    title: &str,
    x_desc: &str,
    hist: &Histogram,
    fit: Option<&ExponentialFit>,
) -> PlotResult {
    let centers = hist.centers();
    let half = hist.bin_width() / 2.0;
    let filled: Vec<(f64, f64)> = centers
        .iter()
        .copied()
        .zip(hist.counts().iter().copied())
        .filter(|&(_, c)| c > 0.0)
        .collect();
    let (y_min, y_max) = bounds(filled.iter().map(|p| p.1));
    let (y_min, y_max) = match (y_min, y_max) {
        (Some(lo), Some(hi)) => (lo * 0.5, hi * 2.0),
        _ => (1e-3, 1.0),
    };
    let x_min = centers.first().map_or(0.0, |c| c - half);
    let x_max = centers.last().map_or(1.0, |c| c + half);

    let root = BitMapBackend::new(out_path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, (y_min..y_max).log_scale())?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("neutrons per event")
        .draw()?;

    chart
        .draw_series(filled.iter().map(|&(x, c)| {
            Rectangle::new([(x - half, y_min), (x + half, c)], BLUE.mix(0.6).filled())
        }))?
        .label("simulation")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.6).filled()));

    if let Some(fit) = fit {
        let (lo, hi) = fit.edges;
        for edge in [lo, hi] {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(edge, y_min), (edge, y_max)],
                BLACK.mix(0.6),
            )))?;
        }
        let curve: Vec<(f64, f64)> = centers
            .iter()
            .copied()
            .filter(|&x| x >= lo && x <= hi)
            .map(|x| (x, fit.eval(x).clamp(y_min, y_max)))
            .collect();
        chart
            .draw_series(LineSeries::new(curve, RED.stroke_width(2)))?
            .label(format!("fit: exp(k) = {:.4}, r = {:.4}", fit.growth(), fit.r))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Write a series as two-column CSV.
pub fn write_series_csv(path: &Path, series: &Series) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "# {}", series.name)?;
    writeln!(w, "{},{}", series.x_label, series.y_label)?;
    for (x, y) in &series.points {
        writeln!(w, "{},{}", x, y)?;
    }
    w.flush()
}

/// Write a histogram as `bin_center,value` CSV.
pub fn write_histogram_csv(path: &Path, x_label: &str, hist: &Histogram) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "{},per_event", x_label)?;
    for (x, c) in hist.centers().iter().zip(hist.counts()) {
        writeln!(w, "{},{}", x, c)?;
    }
    w.flush()
}

fn bounds(values: impl Iterator<Item = f64>) -> (Option<f64>, Option<f64>) {
    values.fold((None, None), |(lo, hi), v| {
        (
            Some(lo.map_or(v, |l: f64| l.min(v))),
            Some(hi.map_or(v, |h: f64| h.max(v))),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(bounds([3.0, -1.0, 2.0].into_iter()), (Some(-1.0), Some(3.0)));
        assert_eq!(bounds(std::iter::empty()), (None, None));
    }

    #[test]
    fn test_histogram_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        let mut hist = Histogram::new(0.0, 4.0, 2).unwrap();
        hist.fill(1.0, 0.5);
        write_histogram_csv(&path, "generation", &hist).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "generation,per_event\n1,0.5\n3,0\n"
        );
    }
}
