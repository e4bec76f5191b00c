// ABOUTME: Keyboard input handling for the TUI: translates key events into actions.
// ABOUTME: Handles composer editing, roadmap sidebar navigation, and global shortcuts.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::state::{Focus, TuiState};

/// The result of processing a key event.
#[derive(Debug, PartialEq)]
pub enum InputResult {
    /// No action needed.
    None,
    /// User submitted a message.
    Send(String),
    /// User opened a roadmap step.
    SelectStep(u8),
    /// Re-send the most recent failed message.
    Retry,
    NewChat,
    /// Download the templates offered by the latest reply.
    DownloadTemplates,
    Quit,
}

/// Process a key event against the current TUI state and return the resulting action.
pub fn handle_key(state: &mut TuiState, key: KeyEvent) -> InputResult {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return InputResult::Quit,
            KeyCode::Char('r') => return InputResult::Retry,
            KeyCode::Char('n') => return InputResult::NewChat,
            KeyCode::Char('d') => return InputResult::DownloadTemplates,
            _ => {}
        }
    }

    // PageUp/PageDown always scroll, regardless of focus.
    if handle_scroll_key(state, key.code) {
        return InputResult::None;
    }

    match key.code {
        KeyCode::Esc => return InputResult::Quit,
        KeyCode::Tab | KeyCode::BackTab => {
            state.toggle_focus();
            return InputResult::None;
        }
        _ => {}
    }

    match state.focus {
        Focus::Steps => handle_steps_key(state, key),
        Focus::Composer => handle_composer_key(state, key),
    }
}

fn handle_steps_key(state: &mut TuiState, key: KeyEvent) -> InputResult {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => state.step_cursor_up(),
        KeyCode::Down | KeyCode::Char('j') => state.step_cursor_down(),
        KeyCode::Enter if !state.waiting => return InputResult::SelectStep(state.step_cursor),
        _ => {}
    }
    InputResult::None
}

fn handle_composer_key(state: &mut TuiState, key: KeyEvent) -> InputResult {
    match key.code {
        // Move within multiline input first, then fall back to transcript scrolling.
        KeyCode::Up => {
            if !state.move_cursor_up_in_input() {
                state.scroll_offset = state.scroll_offset.saturating_add(1);
            }
            InputResult::None
        }
        KeyCode::Down => {
            if !state.move_cursor_down_in_input() {
                state.scroll_offset = state.scroll_offset.saturating_sub(1);
            }
            InputResult::None
        }
        // Shift+Enter (or Alt+Enter on terminals that swallow Shift) inserts a newline.
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            state.insert_char_at_cursor('\n');
            InputResult::None
        }
        KeyCode::Enter => {
            // Keep the draft while a request is in flight or sending is blocked.
            if !state.can_send() {
                return InputResult::None;
            }
            match state.submit_input() {
                Some(text) => InputResult::Send(text),
                None => InputResult::None,
            }
        }
        KeyCode::Char(c) => {
            state.insert_char_at_cursor(c);
            InputResult::None
        }
        KeyCode::Backspace => {
            state.backspace_char();
            InputResult::None
        }
        KeyCode::Delete => {
            state.delete_char_at_cursor();
            InputResult::None
        }
        KeyCode::Left => {
            state.move_cursor_left();
            InputResult::None
        }
        KeyCode::Right => {
            state.move_cursor_right();
            InputResult::None
        }
        KeyCode::Home => {
            state.move_cursor_home();
            InputResult::None
        }
        KeyCode::End => {
            state.move_cursor_end();
            InputResult::None
        }
        _ => InputResult::None,
    }
}

fn handle_scroll_key(state: &mut TuiState, key: KeyCode) -> bool {
    match key {
        KeyCode::PageUp => {
            state.scroll_offset = state.scroll_offset.saturating_add(10);
            true
        }
        KeyCode::PageDown => {
            state.scroll_offset = state.scroll_offset.saturating_sub(10);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn ready_state() -> TuiState {
        let mut state = TuiState::new();
        state.waiting = false;
        state
    }

    fn type_text(state: &mut TuiState, text: &str) {
        for c in text.chars() {
            handle_key(state, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_trimmed_text() {
        let mut state = ready_state();
        type_text(&mut state, " hello ");
        assert_eq!(
            handle_key(&mut state, key(KeyCode::Enter)),
            InputResult::Send("hello".to_string())
        );
        assert!(state.input.is_empty());
    }

    #[test]
    fn enter_keeps_draft_while_waiting() {
        let mut state = TuiState::new();
        type_text(&mut state, "queued");
        assert_eq!(handle_key(&mut state, key(KeyCode::Enter)), InputResult::None);
        assert_eq!(state.input, "queued");
    }

    #[test]
    fn enter_blocked_when_send_disabled() {
        let mut state = ready_state();
        state.send_disabled = true;
        type_text(&mut state, "more please");
        assert_eq!(handle_key(&mut state, key(KeyCode::Enter)), InputResult::None);
        assert_eq!(state.input, "more please");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut state = ready_state();
        type_text(&mut state, "a");
        handle_key(&mut state, KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut state, "b");
        assert_eq!(state.input, "a\nb");
    }

    #[test]
    fn control_shortcuts() {
        let mut state = ready_state();
        assert_eq!(handle_key(&mut state, ctrl('c')), InputResult::Quit);
        assert_eq!(handle_key(&mut state, ctrl('r')), InputResult::Retry);
        assert_eq!(handle_key(&mut state, ctrl('n')), InputResult::NewChat);
        assert_eq!(handle_key(&mut state, ctrl('d')), InputResult::DownloadTemplates);
        assert!(state.input.is_empty());
    }

    #[test]
    fn escape_quits() {
        let mut state = ready_state();
        assert_eq!(handle_key(&mut state, key(KeyCode::Esc)), InputResult::Quit);
    }

    #[test]
    fn sidebar_navigation_selects_step() {
        let mut state = ready_state();
        handle_key(&mut state, key(KeyCode::Tab));
        assert_eq!(state.focus, Focus::Steps);

        handle_key(&mut state, key(KeyCode::Down));
        handle_key(&mut state, key(KeyCode::Down));
        assert_eq!(
            handle_key(&mut state, key(KeyCode::Enter)),
            InputResult::SelectStep(3)
        );
        // Typing in the sidebar does not reach the composer.
        handle_key(&mut state, key(KeyCode::Char('x')));
        assert!(state.input.is_empty());
    }

    #[test]
    fn sidebar_enter_ignored_while_waiting() {
        let mut state = TuiState::new();
        state.focus = Focus::Steps;
        assert_eq!(handle_key(&mut state, key(KeyCode::Enter)), InputResult::None);
    }

    #[test]
    fn page_keys_scroll() {
        let mut state = ready_state();
        handle_key(&mut state, key(KeyCode::PageUp));
        assert_eq!(state.scroll_offset, 10);
        handle_key(&mut state, key(KeyCode::PageDown));
        assert_eq!(state.scroll_offset, 0);
    }

    #[test]
    fn up_scrolls_when_on_first_line() {
        let mut state = ready_state();
        handle_key(&mut state, key(KeyCode::Up));
        assert_eq!(state.scroll_offset, 1);
        handle_key(&mut state, key(KeyCode::Down));
        assert_eq!(state.scroll_offset, 0);
    }
}
