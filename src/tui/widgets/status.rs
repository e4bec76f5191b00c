// ABOUTME: Status widgets: the token usage bar and the bottom notice/key-hint line.
// ABOUTME: Both render to single ratatui Lines from TuiState fields.

use std::time::Instant;

use chrono::{DateTime, NaiveDate};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::api::types::TokenStats;
use crate::tui::state::{Focus, Notice};

const BAR_WIDTH: usize = 20;

/// Render the token usage line: a bar, the counts, and the renewal date.
pub fn usage_line(stats: &TokenStats) -> Line<'static> {
    let dim = Style::default().fg(Color::DarkGray);

    if stats.used.is_some() && stats.exhausted() {
        let mut spans = vec![Span::styled(
            " All tokens are used ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )];
        if let Some(date) = stats.renewable_date.as_deref().map(format_date) {
            spans.push(Span::styled(format!("| renews {date} "), dim));
        }
        return Line::from(spans);
    }

    let ratio = stats.ratio();
    let filled = ((ratio * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let color = if ratio >= 0.9 {
        Color::Red
    } else if ratio >= 0.7 {
        Color::Yellow
    } else {
        Color::Green
    };

    let mut spans = vec![
        Span::styled(" tokens ", dim),
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::styled("░".repeat(BAR_WIDTH - filled), dim),
        Span::styled(
            format!(
                " {} / {} ",
                format_tokens(stats.used_or_zero()),
                format_tokens(stats.effective_total())
            ),
            Style::default().fg(Color::White),
        ),
    ];
    if let Some(date) = stats.renewable_date.as_deref().map(format_date) {
        spans.push(Span::styled(format!("| renews {date} "), dim));
    }
    Line::from(spans)
}

/// Parameters for rendering the bottom status line.
pub struct StatusBarParams<'a> {
    pub notice: Option<&'a Notice>,
    pub focus: Focus,
    pub waiting: bool,
    pub session_start: Instant,
}

/// Render the bottom line: the current notice, else key hints for the focused pane.
pub fn status_line(params: &StatusBarParams) -> Line<'static> {
    if let Some(notice) = params.notice {
        let style = if notice.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Yellow)
        };
        return Line::from(Span::styled(format!(" {}", notice.text), style));
    }

    let dim = Style::default().fg(Color::DarkGray);
    let hints = match params.focus {
        Focus::Composer => " Enter send | Shift+Enter newline | Tab roadmap | ^N new chat | ^D templates | Esc quit ",
        Focus::Steps => " ↑/↓ choose step | Enter open | Tab back to chat | Esc quit ",
    };
    let mut spans = vec![Span::styled(hints, dim)];

    if params.waiting {
        spans.push(Span::styled("| ", dim));
        spans.push(Span::styled("waiting... ", Style::default().fg(Color::Yellow)));
    }

    spans.push(Span::styled("| ", dim));
    spans.push(Span::styled(
        format_elapsed(params.session_start.elapsed().as_secs()),
        dim,
    ));

    Line::from(spans)
}

/// Format a token count for display: small numbers as-is, thousands as X.Xk, millions as X.XM.
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}k", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

fn format_elapsed(secs: u64) -> String {
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

/// Render backend dates (RFC 3339 or `YYYY-MM-DD`) as `Mar 4, 2025`; unknown shapes pass through.
fn format_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%b %-d, %Y").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d") {
        return date.format("%b %-d, %Y").to_string();
    }
    raw.to_string()
}
