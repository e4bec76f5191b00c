// ABOUTME: Main TUI rendering function: assembles header, roadmap, transcript, composer, and status lines.
// ABOUTME: Splits the terminal frame into layout chunks and delegates to widgets.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::steps::step_title;
use crate::tui::state::{Focus, TuiState};
use crate::tui::widgets::chat::render_chat_lines;
use crate::tui::widgets::status::{StatusBarParams, status_line, usage_line};
use crate::tui::widgets::steps::step_lines;

// Maximum height the composer can grow to (in terminal rows).
const MAX_INPUT_HEIGHT: u16 = 8;
const SIDEBAR_WIDTH: u16 = 36;
// Below this width the sidebar is hidden; Tab still opens it.
const MIN_WIDTH_FOR_SIDEBAR: u16 = 80;

/// Render the full TUI screen layout to the given frame.
pub fn render(frame: &mut Frame, state: &mut TuiState) {
    let area = frame.area();

    // +2 accounts for top and bottom borders
    let input_height = (state.input_line_count() as u16 + 2).clamp(3, MAX_INPUT_HEIGHT);
    let usage_height = if state.token_stats.skip_token_usage { 0 } else { 1 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),            // Header
            Constraint::Min(3),               // Roadmap + transcript
            Constraint::Length(input_height), // Composer
            Constraint::Length(usage_height), // Token usage
            Constraint::Length(1),            // Status bar
        ])
        .split(area);

    // Header
    let mut header = vec![
        Span::styled(
            " AI Co-founder",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  Your Startup Success Partner",
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(title) = step_title(state.active_step) {
        header.push(Span::styled(
            format!("  | Step {}: {}", state.active_step, title),
            Style::default().fg(Color::Cyan),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

    // The sidebar is always shown while focused so keyboard navigation stays visible.
    let show_sidebar = area.width >= MIN_WIDTH_FOR_SIDEBAR || state.focus == Focus::Steps;
    let (sidebar_chunk, chat_chunk) = if show_sidebar {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(chunks[1]);
        (Some(body[0]), body[1])
    } else {
        (None, chunks[1])
    };

    if let Some(sidebar_chunk) = sidebar_chunk {
        let focused = state.focus == Focus::Steps;
        let border_style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let sidebar = Paragraph::new(step_lines(state.active_step, state.step_cursor, focused))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::RIGHT)
                    .border_style(border_style)
                    .title(" 7 Step Roadmap "),
            );
        frame.render_widget(sidebar, sidebar_chunk);
    }

    // Transcript
    let chat_lines = render_chat_lines(&state.messages);
    let visible_height = chat_chunk.height;

    // Use ratatui's own line_count() to get an accurate wrapped line count
    // that exactly matches its internal rendering.
    let chat_paragraph = Paragraph::new(chat_lines).wrap(Wrap { trim: false });
    let total_lines = chat_paragraph.line_count(chat_chunk.width) as u16;
    let max_scroll = total_lines.saturating_sub(visible_height);

    // Cap scroll_offset so it can't go past the top of the content.
    if state.scroll_offset > max_scroll {
        state.scroll_offset = max_scroll;
    }

    // scroll_offset is lines scrolled up from the bottom (0 = at bottom)
    let scroll = max_scroll.saturating_sub(state.scroll_offset);
    frame.render_widget(chat_paragraph.scroll((scroll, 0)), chat_chunk);

    // Composer
    let input_chunk = chunks[2];
    let mut input_block = Block::default().borders(Borders::TOP | Borders::BOTTOM);
    if state.send_disabled {
        input_block = input_block.border_style(Style::default().fg(Color::Red)).title(
            Span::styled(" sending disabled ", Style::default().fg(Color::Red)),
        );
    } else if state.waiting {
        input_block = input_block.title(Span::styled(
            " sending... ",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let input = Paragraph::new(state.input.clone()).block(input_block);
    frame.render_widget(input, input_chunk);

    if state.focus == Focus::Composer && input_chunk.width > 0 && input_chunk.height > 1 {
        state.clamp_cursor();

        let cursor_line = state.cursor_line();
        let cursor_col = state.cursor_column();

        // Compute the visual (display) width of the text before the cursor on its line.
        let lines = state.input_lines();
        let line_text = lines.get(cursor_line).unwrap_or(&"");
        let prefix: String = line_text.chars().take(cursor_col).collect();
        let visual_col = UnicodeWidthStr::width(prefix.as_str());

        let max_visual_col = input_chunk.width.saturating_sub(1) as usize;
        let clamped_visual_col = visual_col.min(max_visual_col);

        let cursor_x = input_chunk.x.saturating_add(clamped_visual_col as u16);
        // +1 for the top border, then offset by the cursor's line index.
        let cursor_y = input_chunk.y.saturating_add(1 + cursor_line as u16);
        frame.set_cursor_position(Position::new(cursor_x, cursor_y));
    }

    if usage_height > 0 {
        frame.render_widget(Paragraph::new(usage_line(&state.token_stats)), chunks[3]);
    }

    let status = status_line(&StatusBarParams {
        notice: state.notice.as_ref(),
        focus: state.focus,
        waiting: state.waiting,
        session_start: state.session_start,
    });
    frame.render_widget(Paragraph::new(status), chunks[4]);
}
