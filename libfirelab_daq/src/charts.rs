//! SVG charts of reduced tests.
//!
//! One chart is drawn per `Chart` group of the reduction channel list. Every channel of the
//! group is a line, labelled in the legend, and every test event is marked with a vertical
//! line and its name. Temperature and velocity charts carry a second axis in imperial units.
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::ReductionError;
use super::output::write_file_atomically;
use super::reduction::{MeasurementKind, ReducedSeries, ReducedTest};

pub const CHART_SIZE: (u32, u32) = (1200, 800);

/// Axis ranges of a chart: time from 0, values padded by 10% and always including 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLimits {
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ChartLimits {
    pub fn new(series: &[&ReducedSeries]) -> Self {
        let mut limits = Self {
            x_max: 0.0,
            y_min: 0.0,
            y_max: 0.0,
        };
        for (t, v) in series.iter().flat_map(|s| s.points.iter()) {
            limits.x_max = limits.x_max.max(*t as f64);
            limits.y_min = limits.y_min.min(v - (v * 0.1).abs());
            limits.y_max = limits.y_max.max(v * 1.1);
        }
        if limits.x_max <= 0.0 {
            limits.x_max = 1.0;
        }
        if limits.y_max <= limits.y_min {
            limits.y_max = limits.y_min + 1.0;
        }
        limits
    }
}

/// Channels grouped by chart, in the order the groups first appear in the channel list
pub fn chart_groups(test: &ReducedTest) -> Vec<(&str, Vec<&ReducedSeries>)> {
    let mut groups: Vec<(&str, Vec<&ReducedSeries>)> = Vec::new();
    for series in test.series.iter() {
        match groups.iter_mut().find(|(name, _)| *name == series.chart) {
            Some((_, members)) => members.push(series),
            None => groups.push((series.chart.as_str(), vec![series])),
        }
    }
    groups
}

/// Draw one chart group onto a drawing area. The axis labels follow the kind of the first
/// channel in the group
pub fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    series: &[&ReducedSeries],
    events: &[(i64, String)],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let kind = series
        .first()
        .map(|s| s.kind)
        .unwrap_or(MeasurementKind::Temperature);
    let limits = ChartLimits::new(series);
    let secondary = kind.secondary_axis();
    let (y2_min, y2_max) = match secondary {
        Some(axis) => (axis.convert(limits.y_min), axis.convert(limits.y_max)),
        None => (limits.y_min, limits.y_max),
    };

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .right_y_label_area_size(if secondary.is_some() { 80 } else { 0 })
        .build_cartesian_2d(0f64..limits.x_max, limits.y_min..limits.y_max)?
        .set_secondary_coord(0f64..limits.x_max, y2_min..y2_max);

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc(kind.axis_label())
        .draw()?;
    if let Some(axis) = secondary {
        chart.configure_secondary_axes().y_desc(axis.label).draw()?;
    }

    let event_style = BLACK.mix(0.6).stroke_width(1);
    chart.draw_series(events.iter().map(|(t, _)| {
        let t = *t as f64;
        PathElement::new(vec![(t, limits.y_min), (t, limits.y_max)], event_style)
    }))?;
    chart.draw_series(events.iter().map(|(t, name)| {
        Text::new(
            name.clone(),
            (*t as f64, limits.y_max),
            ("sans-serif", 14).into_font(),
        )
    }))?;

    for (idx, s) in series.iter().enumerate() {
        let style = Palette99::pick(idx).stroke_width(2);
        chart
            .draw_series(LineSeries::new(
                s.points.iter().map(|(t, v)| (*t as f64, *v)),
                style,
            ))?
            .label(s.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render a chart group to SVG text
pub fn render_chart_svg(
    title: &str,
    series: &[&ReducedSeries],
    events: &[(i64, String)],
) -> Result<String, ReductionError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw_chart(&root, title, series, events).map_err(|e| ReductionError::ChartError {
            chart: title.to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(svg)
}

/// Write `<group>.svg` into `dir` for every chart group of the test
pub fn write_test_charts(dir: &Path, test: &ReducedTest) -> Result<Vec<PathBuf>, ReductionError> {
    std::fs::create_dir_all(dir)?;
    let mut written: Vec<PathBuf> = Vec::new();
    for (chart, series) in chart_groups(test) {
        let title = format!("{} {}", test.test_name, chart.replace('_', " "));
        let svg = render_chart_svg(&title, &series, &test.events)?;
        let path = dir.join(format!("{chart}.svg"));
        write_file_atomically(&path, |w| {
            w.write_all(svg.as_bytes()).map_err(ReductionError::from)
        })?;
        log::info!("Drew {}", path.display());
        written.push(path);
    }
    Ok(written)
}
