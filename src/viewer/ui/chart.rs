//! Chart region widget

use std::str::FromStr;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
};

use crate::render::{ChartModel, ChartRegion, chart::time_labels};

/// Terminal color for a color name or `#rrggbb`, white if unknown
pub fn parse_color(color: &str) -> Color {
    Color::from_str(color).unwrap_or(Color::White)
}

/// Render one region: a step line per series plus its band boundaries
pub fn render_region(frame: &mut Frame, area: Rect, region: &ChartRegion, model: &ChartModel) {
    let x_bounds = model.x_bounds();
    let y_bounds = model.y_bounds(region);

    let lines: Vec<Vec<(f64, f64)>> = region
        .spec
        .series
        .iter()
        .map(|series| model.stepped(&region.group, &series.metric))
        .collect();

    // Every bounded band is drawn as a horizontal line at its lower edge
    let boundaries: Vec<Vec<(f64, f64)>> = region
        .spec
        .bands
        .iter()
        .filter(|band| band.lower > 0.0)
        .map(|band| vec![(x_bounds[0], band.lower), (x_bounds[1], band.lower)])
        .collect();

    let mut datasets: Vec<Dataset> = region
        .spec
        .bands
        .iter()
        .filter(|band| band.lower > 0.0)
        .zip(boundaries.iter())
        .map(|(band, data)| {
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(parse_color(&band.color)))
                .data(data)
        })
        .collect();

    datasets.extend(region.spec.series.iter().zip(lines.iter()).map(|(series, data)| {
        let marker = if series.dashed {
            symbols::Marker::Dot
        } else {
            symbols::Marker::Braille
        };

        Dataset::default()
            .name(series.label.clone())
            .marker(marker)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(parse_color(&series.color)))
            .data(data)
    }));

    let [_, y_max] = y_bounds;

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(region.spec.title.clone()),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .labels(time_labels(x_bounds, 3))
                .bounds(x_bounds),
        )
        .y_axis(
            Axis::default()
                .title(region.spec.y_label.clone())
                .style(Style::default().fg(Color::Gray))
                .labels(vec![
                    "0".to_string(),
                    format!("{:.0}", y_max / 2.0),
                    format!("{y_max:.0}"),
                ])
                .bounds(y_bounds),
        );

    frame.render_widget(chart, area);
}
