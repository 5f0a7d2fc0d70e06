//! Chart rendering.
//!
//! One narrow entry point: callers hand over finished named series and a
//! destination path, nothing here recomputes analysis results.

use plotters::prelude::*;
use std::path::Path;

use crate::align::DeviationSeries;

const PALETTE: [RGBColor; 4] = [BLUE, RED, GREEN, MAGENTA];

/// A finished series ready to draw.
pub struct NamedSeries<'a> {
    pub label: &'a str,
    pub t: &'a [f64],
    pub values: &'a [f64],
}

impl<'a> NamedSeries<'a> {
    pub fn from_deviation(label: &'a str, series: &'a DeviationSeries) -> Self {
        Self {
            label,
            t: &series.t,
            values: &series.deviation,
        }
    }
}

fn value_range(series: &[NamedSeries]) -> (f64, f64) {
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for s in series {
        for &v in s.values {
            low = low.min(v);
            high = high.max(v);
        }
    }
    if !low.is_finite() || !high.is_finite() {
        return (-1.0, 1.0);
    }
    // Pad so flat series still get a visible band.
    let pad = ((high - low) * 0.05).max(1e-3);
    (low - pad, high + pad)
}

/// Render line series over time into a PNG at `path`.
///
/// Empty input (no series, or all series empty) still produces a chart,
/// just one with empty axes.
pub fn render_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    series: &[NamedSeries],
) -> Result<(), Box<dyn std::error::Error>> {
    let t_max = series
        .iter()
        .filter_map(|s| s.t.last().copied())
        .fold(0.0, f64::max)
        .max(1e-3);
    let (y_low, y_high) = value_range(series);

    let root = BitMapBackend::new(path, (1600, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 32).into_font().color(&BLACK))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..t_max, y_low..y_high)?;

    chart
        .configure_mesh()
        .x_desc("Time from Motion Start (seconds)")
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 16))
        .draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(
                s.t.iter().zip(s.values).map(|(&t, &v)| (t, v)),
                color,
            ))?
            .label(s.label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    if !series.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.9))
            .border_style(BLACK)
            .label_font(("sans-serif", 18))
            .draw()?;
    }

    root.present()?;
    Ok(())
}
