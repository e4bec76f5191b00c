// ABOUTME: E2E tests for TUI rendering using ratatui's TestBackend.
// ABOUTME: Verifies the header, roadmap sidebar, transcript, composer, usage line, and status bar.

use ratatui::Terminal;
use ratatui::backend::TestBackend;

use cofounder::api::types::{ChatMessage, Sender, TokenStats};
use cofounder::tui::state::{Focus, TuiState};
use cofounder::tui::ui;

/// Extract a single row of text from the terminal buffer as a String.
fn row_text(terminal: &Terminal<TestBackend>, y: u16) -> String {
    let buf = terminal.backend().buffer();
    let width = buf.area.width;
    (0..width)
        .map(|x| {
            buf.cell((x, y))
                .map(|c| c.symbol().chars().next().unwrap_or(' '))
                .unwrap_or(' ')
        })
        .collect()
}

/// Extract all text from the terminal buffer as a single string (rows joined by newlines).
fn all_text(terminal: &Terminal<TestBackend>) -> String {
    let buf = terminal.backend().buffer();
    let height = buf.area.height;
    (0..height)
        .map(|y| row_text(terminal, y))
        .collect::<Vec<_>>()
        .join("\n")
}

fn draw(terminal: &mut Terminal<TestBackend>, state: &mut TuiState) {
    terminal.draw(|frame| ui::render(frame, state)).unwrap();
}

fn ready_state() -> TuiState {
    let mut state = TuiState::new();
    state.waiting = false;
    state
}

#[test]
fn renders_header_and_roadmap() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ready_state();
    draw(&mut terminal, &mut state);

    let header = row_text(&terminal, 0);
    assert!(
        header.contains("AI Co-founder"),
        "header should name the app, got: {:?}",
        header,
    );

    let text = all_text(&terminal);
    assert!(text.contains("7 Step Roadmap"), "sidebar title missing:\n{}", text);
    assert!(text.contains("1. Foundation and Preparation"), "first step missing:\n{}", text);
    assert!(text.contains("7. Scaling Operations"), "last step missing:\n{}", text);
}

#[test]
fn renders_user_and_ai_messages() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ready_state();
    state.push_user_message("I want to open a bakery");
    state.push_message(ChatMessage::new("1-ai", Sender::Ai, "Great idea!"));
    draw(&mut terminal, &mut state);

    let text = all_text(&terminal);
    assert!(text.contains("❯"), "missing user prefix:\n{}", text);
    assert!(text.contains("I want to open a bakery"), "missing user text:\n{}", text);
    assert!(text.contains("⏺"), "missing AI prefix:\n{}", text);
    assert!(text.contains("Great idea!"), "missing AI text:\n{}", text);
}

#[test]
fn empty_transcript_shows_welcome() {
    let mut terminal = Terminal::new(TestBackend::new(120, 24)).unwrap();
    let mut state = ready_state();
    draw(&mut terminal, &mut state);

    let text = all_text(&terminal);
    assert!(text.contains("Tell me about your idea"), "welcome missing:\n{}", text);
}

#[test]
fn failed_message_shows_retry_hint() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ready_state();
    let id = state.push_user_message("lost");
    state.set_failed(&id, true);
    draw(&mut terminal, &mut state);

    let text = all_text(&terminal);
    assert!(text.contains("Ctrl+R to retry"), "retry hint missing:\n{}", text);
}

/// The last two rows hold the usage bar and the status line.
#[test]
fn renders_usage_and_status_lines() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ready_state();
    state.token_stats = TokenStats {
        used: Some(1_500),
        total: Some(10_000),
        ..Default::default()
    };
    draw(&mut terminal, &mut state);

    let usage = row_text(&terminal, 22);
    assert!(usage.contains("1.5k / 10.0k"), "usage row wrong: {:?}", usage);

    let status = row_text(&terminal, 23);
    assert!(status.contains("Enter send"), "status row wrong: {:?}", status);
}

#[test]
fn usage_line_hidden_when_skipped() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ready_state();
    state.token_stats.skip_token_usage = true;
    draw(&mut terminal, &mut state);

    let text = all_text(&terminal);
    assert!(!text.contains("20.0k"), "usage should be hidden:\n{}", text);
    assert!(row_text(&terminal, 23).contains("Enter send"));
}

#[test]
fn notice_replaces_key_hints() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ready_state();
    state.set_notice("Token consumed, please buy the tokens", true);
    state.send_disabled = true;
    draw(&mut terminal, &mut state);

    let status = row_text(&terminal, 23);
    assert!(status.contains("Token consumed"), "notice missing: {:?}", status);
    assert!(all_text(&terminal).contains("sending disabled"));
}

#[test]
fn narrow_terminal_hides_sidebar_until_focused() {
    let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
    let mut state = ready_state();
    draw(&mut terminal, &mut state);
    assert!(!all_text(&terminal).contains("7 Step Roadmap"));

    state.focus = Focus::Steps;
    draw(&mut terminal, &mut state);
    assert!(all_text(&terminal).contains("7 Step Roadmap"));
}

/// Wrapped chat lines should contribute to scroll bounds so long responses
/// don't appear clipped by the input area.
#[test]
fn scroll_clamp_accounts_for_wrapped_chat_height() {
    let mut terminal = Terminal::new(TestBackend::new(24, 10)).unwrap();
    let mut state = ready_state();
    state.push_message(ChatMessage::new(
        "1-ai",
        Sender::Ai,
        "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi omicron pi rho sigma tau upsilon phi chi psi omega",
    ));
    state.scroll_offset = 100;
    draw(&mut terminal, &mut state);

    assert!(
        state.scroll_offset > 0,
        "scroll offset should clamp above zero when wrapped content exceeds chat viewport",
    );
    assert!(state.scroll_offset < 100);
}

/// With scroll_offset at 0 the viewport stays pinned to the newest content.
#[test]
fn viewport_pinned_to_bottom_after_new_reply() {
    let mut terminal = Terminal::new(TestBackend::new(24, 10)).unwrap();
    let mut state = ready_state();
    state.push_message(ChatMessage::new("1-ai", Sender::Ai, "line1\nline2\nline3\nline4"));
    draw(&mut terminal, &mut state);

    state.push_message(ChatMessage::new("2-ai", Sender::Ai, "line5\nline6\nline7\nline8"));
    draw(&mut terminal, &mut state);

    let text = all_text(&terminal);
    assert!(
        text.contains("line8"),
        "viewport should include newest bottom content, got:\n{}",
        text,
    );
    assert!(
        !text.contains("line1"),
        "viewport should have scrolled past oldest content, got:\n{}",
        text,
    );
}

/// Cursor should be clamped to the input viewport when the input text exceeds available width.
#[test]
fn cursor_is_clamped_inside_input_viewport_for_long_input() {
    let mut terminal = Terminal::new(TestBackend::new(12, 8)).unwrap();
    let mut state = ready_state();
    state.input = "abcdefghijklmnopqrstuvwxyz".to_string();
    state.cursor_pos = state.input.chars().count();
    draw(&mut terminal, &mut state);

    let cursor = terminal.get_cursor_position().unwrap();
    assert!(
        cursor.x < 12,
        "cursor x should stay within terminal width, got {:?}",
        cursor,
    );
}

#[test]
fn multiline_input_grows_composer() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ready_state();
    state.input = "first\nsecond\nthird".to_string();
    state.cursor_pos = state.input.chars().count();
    draw(&mut terminal, &mut state);

    let text = all_text(&terminal);
    assert!(text.contains("first"));
    assert!(text.contains("third"));
    let cursor = terminal.get_cursor_position().unwrap();
    assert_eq!(cursor.x, 5, "cursor should sit after 'third'");
}
