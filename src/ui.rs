use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};

use pulsr::display::{
    circle_display, overall_progress, phase_category, phase_ordinal, phase_progress, PhaseCategory,
};
use pulsr::phase::Phase;
use pulsr::stopwatch::format_elapsed;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn phase_color(phase: Phase) -> Color {
    match (phase, phase_category(phase)) {
        (Phase::Idle, _) => Color::DarkGray,
        (_, PhaseCategory::Exertion) => Color::Red,
        (_, PhaseCategory::Release) => Color::Green,
        (_, PhaseCategory::Break) => Color::Blue,
        (_, PhaseCategory::Neutral) => Color::Yellow,
    }
}

fn key_hints(phase: Phase, is_paused: bool) -> &'static str {
    match phase {
        Phase::Idle => "(enter) start / (q) quit",
        Phase::Completed => "(r) new session / (q) quit",
        _ if is_paused => "(space) resume / (s) skip / (x) stop / (q) quit",
        _ => "(space) pause / (s) skip / (x) stop / (q) quit",
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.driver.state();
        let config = self.driver.config();
        let color = phase_color(state.phase);
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // phase ordinal
                Constraint::Min(4),    // readout
                Constraint::Length(3), // phase gauge
                Constraint::Length(3), // overall gauge
                Constraint::Length(1), // elapsed + pulses
                Constraint::Length(2), // notice
                Constraint::Length(1), // key hints
            ])
            .split(area);

        let ordinal = phase_ordinal(state.phase);
        let mut title = if ordinal.block == 0 {
            ordinal.name.to_string()
        } else {
            format!(
                "Phase {}/{} · {}",
                ordinal.block, ordinal.total_blocks, ordinal.name
            )
        };
        if state.is_paused {
            title.push_str(" (paused)");
        }
        Paragraph::new(Span::styled(title, bold_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let readout = circle_display(state);
        let readout_height = chunks[1].height.saturating_sub(2) / 2;
        let mut lines: Vec<Line> = (0..readout_height).map(|_| Line::from("")).collect();
        lines.push(Line::from(Span::styled(
            readout.big,
            Style::default().patch(bold_style).fg(color),
        )));
        lines.push(Line::from(Span::styled(
            readout.sub,
            Style::default().fg(color).add_modifier(Modifier::ITALIC),
        )));
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        let local = phase_progress(state, &config.timings);
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Phase"))
            .gauge_style(Style::default().fg(color))
            .ratio((local / 100.0).clamp(0.0, 1.0))
            .label(format!("{local:.0}%"))
            .render(chunks[2], buf);

        let overall = overall_progress(state, &config.weights);
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Session"))
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio((overall / 100.0).clamp(0.0, 1.0))
            .label(format!("{overall:.0}%"))
            .render(chunks[3], buf);

        if state.phase != Phase::Idle {
            let status = format!(
                "{} elapsed · {} / {} pulses",
                format_elapsed(self.driver.elapsed()),
                state.pulses_completed,
                state.target_pulses
            );
            Paragraph::new(Span::styled(status, dim_style))
                .alignment(Alignment::Center)
                .render(chunks[4], buf);
        }

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.as_str(), Style::default().fg(Color::Cyan)))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(chunks[5], buf);
        }

        Paragraph::new(Span::styled(
            key_hints(state.phase, state.is_paused),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
    }
}
