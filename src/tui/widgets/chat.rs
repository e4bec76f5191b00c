// ABOUTME: Chat widget: renders transcript messages into styled ratatui Lines.
// ABOUTME: User, AI, and system messages each get distinct prefixes; failed sends are flagged.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::api::format::message_text;
use crate::api::types::{ChatMessage, Sender};

const WELCOME: &str = "Tell me about your idea, or press Tab to pick a step from the roadmap.";

/// Render a slice of chat messages into styled Lines for display.
pub fn render_chat_lines(messages: &[ChatMessage]) -> Vec<Line<'static>> {
    if messages.is_empty() {
        return vec![Line::from(Span::styled(
            WELCOME,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ))];
    }

    let mut lines = Vec::new();

    for (idx, msg) in messages.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }

        match msg.sender {
            Sender::User => {
                let text = message_text(msg);
                for (i, part) in text.split('\n').enumerate() {
                    let mut spans = Vec::new();
                    if i == 0 {
                        spans.push(Span::styled(
                            "❯ ",
                            Style::default()
                                .fg(Color::Green)
                                .add_modifier(Modifier::BOLD),
                        ));
                    } else {
                        spans.push(Span::raw("  "));
                    }
                    spans.push(Span::raw(part.to_string()));
                    lines.push(Line::from(spans));
                }
                if msg.failed {
                    lines.push(Line::from(Span::styled(
                        "  [failed, Ctrl+R to retry]",
                        Style::default().fg(Color::Red),
                    )));
                }
            }
            Sender::Ai => {
                // First line gets the prefix, subsequent lines are plain.
                let text = message_text(msg);
                for (i, part) in text.split('\n').enumerate() {
                    if i == 0 {
                        lines.push(Line::from(vec![
                            Span::styled(
                                "⏺ ",
                                Style::default()
                                    .fg(Color::Cyan)
                                    .add_modifier(Modifier::BOLD),
                            ),
                            Span::raw(part.to_string()),
                        ]));
                    } else {
                        lines.push(Line::from(Span::raw(part.to_string())));
                    }
                }
            }
            Sender::System => {
                lines.push(Line::from(Span::styled(
                    format!("[system] {}", msg.text),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
        }

        if !msg.timestamp.is_empty() && msg.sender != Sender::System {
            lines.push(Line::from(Span::styled(
                format!("  {}", msg.timestamp),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines
}
