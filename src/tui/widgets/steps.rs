// ABOUTME: Roadmap sidebar widget: lists the seven founder steps.
// ABOUTME: Marks the active step and highlights the cursor row when the sidebar has focus.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::steps::ROADMAP_STEPS;

/// Render one line per roadmap step.
pub fn step_lines(active_step: u8, cursor: u8, focused: bool) -> Vec<Line<'static>> {
    ROADMAP_STEPS
        .iter()
        .map(|step| {
            let active = step.number == active_step;
            let marker = if active { "▸ " } else { "  " };

            let mut style = if active {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            if focused && step.number == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }

            Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Cyan)),
                Span::styled(format!("{}. {}", step.number, step.title), style),
            ])
        })
        .collect()
}
