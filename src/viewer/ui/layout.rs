//! Main dashboard layout

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::viewer::state::ViewState;

use super::chart::{parse_color, render_region};

/// Render the main dashboard UI
pub fn render(frame: &mut Frame, state: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Charts
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state);
    render_charts(frame, chunks[1], state);
    render_footer(frame, chunks[2], state);
}

fn render_header(frame: &mut Frame, area: Rect, state: &ViewState) {
    let header = Paragraph::new(Line::from(Span::styled(
        state.title.as_str(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

/// One region per row, sharing the time axis
fn render_charts(frame: &mut Frame, area: Rect, state: &ViewState) {
    let regions = state.model.regions();
    if regions.is_empty() {
        let message = Paragraph::new("No charts configured")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(message, area);
        return;
    }

    let constraints = vec![Constraint::Ratio(1, regions.len() as u32); regions.len()];
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (region, chunk) in regions.iter().zip(chunks.iter()) {
        render_region(frame, *chunk, region, &state.model);
    }
}

/// Latest values and key bindings
fn render_footer(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut footer_text = Vec::new();

    for region in state.model.regions() {
        for series in &region.spec.series {
            let Some(value) = state.model.latest(&region.group, &series.metric) else {
                continue;
            };
            let color = region
                .spec
                .band_for(value)
                .map_or_else(|| parse_color(&series.color), |band| parse_color(&band.color));

            footer_text.push(Span::raw(format!("{}: ", series.label)));
            footer_text.push(Span::styled(
                format!("{value:.1}"),
                Style::default().fg(color),
            ));
            footer_text.push(Span::raw(" | "));
        }
    }

    footer_text.extend([
        Span::raw("Pause: "),
        Span::styled("Space", Style::default().fg(Color::Yellow)),
        Span::raw(" | Resync: "),
        Span::styled("R", Style::default().fg(Color::Yellow)),
        Span::raw(" | Quit: "),
        Span::styled("Q", Style::default().fg(Color::Yellow)),
    ]);

    if state.paused {
        footer_text.push(Span::raw(" | "));
        footer_text.push(Span::styled(
            "⏸ PAUSED",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(error) = &state.error_message {
        footer_text.push(Span::raw(" | "));
        footer_text.push(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        ));
    }

    let footer =
        Paragraph::new(Line::from(footer_text)).block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}
