// ABOUTME: TUI state types: transcript, composer buffer, roadmap focus, usage, and worker events.
// ABOUTME: Drives the TUI rendering and bridges the conversation worker to the display.

use std::path::PathBuf;
use std::time::Instant;

use crate::api::types::{ChatMessage, ChatSession, NewChat, Sender, TokenStats};
use crate::steps::{FIRST_STEP, ROADMAP_STEPS};

/// Events sent from the conversation worker to the TUI.
#[derive(Debug)]
pub enum ChatEvent {
    /// An AI reply to append to the transcript.
    Reply(ChatMessage),
    /// A user message could not be delivered.
    MessageFailed { message_id: String },
    /// A previously failed message went through on retry.
    MessageRecovered { message_id: String },
    /// The backend refused the send for lack of tokens.
    PaymentRequired(String),
    TokenStats(TokenStats),
    ChatsListed(Vec<ChatSession>),
    ChatCreated(NewChat),
    HistoryLoaded {
        chat_id: String,
        messages: Vec<ChatMessage>,
    },
    TemplateSaved(PathBuf),
    /// User-facing error text.
    Error(String),
    /// No session could be established; the user must sign in again here.
    ReauthRequired(String),
    /// The worker finished handling the last request.
    Done,
}

/// Events sent from the TUI to the conversation worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    Send {
        message_id: String,
        text: String,
        step: u8,
    },
    Retry {
        message_id: String,
        text: String,
        step: u8,
    },
    /// Open a roadmap step; the worker greets the agent for that step.
    SelectStep { message_id: String, step: u8 },
    NewChat,
    DownloadTemplates(Vec<String>),
    Quit,
}

/// Which pane receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Composer,
    Steps,
}

/// A one-line notice shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

/// Full TUI application state.
pub struct TuiState {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub cursor_pos: usize,
    pub scroll_offset: u16,
    /// A request is in flight.
    pub waiting: bool,
    pub focus: Focus,
    /// Highlighted row in the roadmap sidebar (1-based).
    pub step_cursor: u8,
    /// Step sent with every message (1-based).
    pub active_step: u8,
    pub token_stats: TokenStats,
    /// Set after a 402; cleared by starting a new chat.
    pub send_disabled: bool,
    pub notice: Option<Notice>,
    pub chats: Vec<ChatSession>,
    pub current_chat: Option<String>,
    /// Templates offered by the latest AI reply.
    pub offered_templates: Vec<String>,
    pub reauth_url: Option<String>,
    pub should_quit: bool,
    pub session_start: Instant,
    next_local_id: u64,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    /// Create a new empty TUI state. The worker bootstraps on start, so the
    /// state begins in the waiting mode.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            cursor_pos: 0,
            scroll_offset: 0,
            waiting: true,
            focus: Focus::Composer,
            step_cursor: FIRST_STEP,
            active_step: FIRST_STEP,
            token_stats: TokenStats::default(),
            send_disabled: false,
            notice: None,
            chats: Vec::new(),
            current_chat: None,
            offered_templates: Vec::new(),
            reauth_url: None,
            should_quit: false,
            session_start: Instant::now(),
            next_local_id: 0,
        }
    }

    /// Restore a saved composer draft, placing the cursor at its end.
    pub fn with_draft(mut self, draft: Option<String>) -> Self {
        if let Some(draft) = draft {
            self.input = draft;
            self.move_cursor_end();
        }
        self
    }

    /// Add a message to the transcript and reset scroll to bottom.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.scroll_offset = 0;
    }

    /// Append a user message and return its local id.
    pub fn push_user_message(&mut self, text: &str) -> String {
        self.next_local_id += 1;
        let id = format!("local-{}", self.next_local_id);
        self.push_message(ChatMessage::new(id.clone(), Sender::User, text));
        id
    }

    pub fn set_failed(&mut self, message_id: &str, failed: bool) {
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
            msg.failed = failed;
        }
    }

    /// The most recent user message whose send failed.
    pub fn last_failed_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::User && m.failed)
    }

    pub fn set_notice(&mut self, text: impl Into<String>, is_error: bool) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error,
        });
    }

    /// Whether Enter should submit right now.
    pub fn can_send(&self) -> bool {
        !self.waiting && !self.send_disabled
    }

    /// Clear the transcript and per-chat state for a fresh conversation.
    pub fn reset_for_new_chat(&mut self) {
        self.messages.clear();
        self.input.clear();
        self.cursor_pos = 0;
        self.scroll_offset = 0;
        self.active_step = FIRST_STEP;
        self.step_cursor = FIRST_STEP;
        self.notice = None;
        self.send_disabled = false;
        self.current_chat = None;
        self.offered_templates.clear();
    }

    pub fn step_cursor_up(&mut self) {
        self.step_cursor = self.step_cursor.saturating_sub(1).max(FIRST_STEP);
    }

    pub fn step_cursor_down(&mut self) {
        let last = ROADMAP_STEPS.len() as u8;
        self.step_cursor = (self.step_cursor + 1).min(last);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Composer => Focus::Steps,
            Focus::Steps => {
                self.step_cursor = self.active_step;
                Focus::Composer
            }
        };
    }

    /// Submit the current input buffer. Returns the trimmed text if non-empty.
    pub fn submit_input(&mut self) -> Option<String> {
        let trimmed = self.input.trim().to_string();
        if trimmed.is_empty() {
            return None;
        }
        self.input.clear();
        self.cursor_pos = 0;
        Some(trimmed)
    }

    /// Clamp the cursor position to the valid character range of the input buffer.
    pub fn clamp_cursor(&mut self) {
        self.cursor_pos = self.cursor_pos.min(self.input_char_len());
    }

    /// Return the current cursor byte index in the UTF-8 input buffer.
    pub fn cursor_byte_index(&self) -> usize {
        char_index_to_byte_index(&self.input, self.cursor_pos)
    }

    /// Return the total number of characters in the input buffer.
    pub fn input_char_len(&self) -> usize {
        self.input.chars().count()
    }

    /// Insert a character at the cursor and advance by one character.
    pub fn insert_char_at_cursor(&mut self, c: char) {
        self.clamp_cursor();
        let byte_index = self.cursor_byte_index();
        self.input.insert(byte_index, c);
        self.cursor_pos += 1;
    }

    /// Delete the character before the cursor (backspace behavior).
    pub fn backspace_char(&mut self) {
        self.clamp_cursor();
        if self.cursor_pos == 0 {
            return;
        }

        let end = self.cursor_byte_index();
        let start = char_index_to_byte_index(&self.input, self.cursor_pos - 1);
        self.input.replace_range(start..end, "");
        self.cursor_pos -= 1;
    }

    /// Delete the character at the cursor (delete behavior).
    pub fn delete_char_at_cursor(&mut self) {
        self.clamp_cursor();
        if self.cursor_pos >= self.input_char_len() {
            return;
        }

        let start = self.cursor_byte_index();
        let end = char_index_to_byte_index(&self.input, self.cursor_pos + 1);
        self.input.replace_range(start..end, "");
    }

    pub fn move_cursor_left(&mut self) {
        self.clamp_cursor();
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.clamp_cursor();
        if self.cursor_pos < self.input_char_len() {
            self.cursor_pos += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_pos = self.input_char_len();
    }

    /// Input split on newlines; always at least one (possibly empty) line.
    pub fn input_lines(&self) -> Vec<&str> {
        self.input.split('\n').collect()
    }

    pub fn input_line_count(&self) -> usize {
        self.input.split('\n').count()
    }

    /// Zero-based line index of the cursor.
    pub fn cursor_line(&self) -> usize {
        self.input
            .chars()
            .take(self.cursor_pos)
            .filter(|c| *c == '\n')
            .count()
    }

    /// Zero-based character column of the cursor within its line.
    pub fn cursor_column(&self) -> usize {
        self.input
            .chars()
            .take(self.cursor_pos)
            .collect::<Vec<_>>()
            .iter()
            .rev()
            .take_while(|c| **c != '\n')
            .count()
    }

    /// Move the cursor up one line. Returns false when already on the first line.
    pub fn move_cursor_up_in_input(&mut self) -> bool {
        self.clamp_cursor();
        let line = self.cursor_line();
        if line == 0 {
            return false;
        }
        let column = self.cursor_column();
        self.cursor_pos = self.line_start(line - 1) + column.min(self.line_len(line - 1));
        true
    }

    /// Move the cursor down one line. Returns false when already on the last line.
    pub fn move_cursor_down_in_input(&mut self) -> bool {
        self.clamp_cursor();
        let line = self.cursor_line();
        if line + 1 >= self.input_line_count() {
            return false;
        }
        let column = self.cursor_column();
        self.cursor_pos = self.line_start(line + 1) + column.min(self.line_len(line + 1));
        true
    }

    /// Character index where `line` begins.
    fn line_start(&self, line: usize) -> usize {
        self.input_lines()
            .iter()
            .take(line)
            .map(|l| l.chars().count() + 1)
            .sum()
    }

    fn line_len(&self, line: usize) -> usize {
        self.input_lines()
            .get(line)
            .map(|l| l.chars().count())
            .unwrap_or(0)
    }
}

fn char_index_to_byte_index(s: &str, char_index: usize) -> usize {
    if char_index == 0 {
        return 0;
    }

    match s.char_indices().nth(char_index) {
        Some((idx, _)) => idx,
        None => s.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_waits_for_bootstrap() {
        let state = TuiState::new();
        assert!(state.messages.is_empty());
        assert!(state.waiting);
        assert!(!state.can_send());
        assert_eq!(state.active_step, 1);
        assert_eq!(state.focus, Focus::Composer);
    }

    #[test]
    fn draft_is_restored_with_cursor_at_end() {
        let state = TuiState::new().with_draft(Some("héllo".to_string()));
        assert_eq!(state.input, "héllo");
        assert_eq!(state.cursor_pos, 5);
    }

    #[test]
    fn user_messages_get_unique_ids() {
        let mut state = TuiState::new();
        let a = state.push_user_message("one");
        let b = state.push_user_message("two");
        assert_ne!(a, b);
        assert_eq!(state.messages.len(), 2);
    }

    #[test]
    fn last_failed_message_finds_newest_failure() {
        let mut state = TuiState::new();
        let first = state.push_user_message("first");
        let second = state.push_user_message("second");
        state.set_failed(&first, true);
        state.set_failed(&second, true);
        assert_eq!(state.last_failed_message().map(|m| m.text.as_str()), Some("second"));

        state.set_failed(&second, false);
        assert_eq!(state.last_failed_message().map(|m| m.text.as_str()), Some("first"));
    }

    #[test]
    fn reset_for_new_chat_clears_chat_state() {
        let mut state = TuiState::new();
        state.push_user_message("hello");
        state.input = "draft".to_string();
        state.active_step = 5;
        state.send_disabled = true;
        state.current_chat = Some("7".to_string());
        state.set_notice("boom", true);

        state.reset_for_new_chat();
        assert!(state.messages.is_empty());
        assert!(state.input.is_empty());
        assert_eq!(state.active_step, 1);
        assert!(!state.send_disabled);
        assert!(state.current_chat.is_none());
        assert!(state.notice.is_none());
    }

    #[test]
    fn step_cursor_stays_in_range() {
        let mut state = TuiState::new();
        state.step_cursor_up();
        assert_eq!(state.step_cursor, 1);
        for _ in 0..10 {
            state.step_cursor_down();
        }
        assert_eq!(state.step_cursor, 7);
    }

    #[test]
    fn toggling_back_to_composer_resyncs_cursor() {
        let mut state = TuiState::new();
        state.active_step = 3;
        state.toggle_focus();
        assert_eq!(state.focus, Focus::Steps);
        state.step_cursor_down();
        state.toggle_focus();
        assert_eq!(state.focus, Focus::Composer);
        assert_eq!(state.step_cursor, 3);
    }

    #[test]
    fn insert_and_backspace_multibyte() {
        let mut state = TuiState::new();
        for c in "añb".chars() {
            state.insert_char_at_cursor(c);
        }
        state.move_cursor_left();
        state.backspace_char();
        assert_eq!(state.input, "ab");
        assert_eq!(state.cursor_pos, 1);
    }

    #[test]
    fn cursor_line_and_column() {
        let mut state = TuiState::new();
        state.input = "ab\ncde\nf".to_string();
        state.cursor_pos = 5;
        assert_eq!(state.cursor_line(), 1);
        assert_eq!(state.cursor_column(), 2);
        assert_eq!(state.input_line_count(), 3);
    }

    #[test]
    fn vertical_cursor_moves_clamp_column() {
        let mut state = TuiState::new();
        state.input = "abcd\nx\nlonger".to_string();
        state.cursor_pos = 4;

        assert!(state.move_cursor_down_in_input());
        assert_eq!(state.cursor_line(), 1);
        assert_eq!(state.cursor_column(), 1);

        assert!(state.move_cursor_down_in_input());
        assert_eq!(state.cursor_line(), 2);
        assert_eq!(state.cursor_column(), 1);
        assert!(!state.move_cursor_down_in_input());

        assert!(state.move_cursor_up_in_input());
        assert!(state.move_cursor_up_in_input());
        assert_eq!(state.cursor_pos, 1);
        assert!(!state.move_cursor_up_in_input());
    }

    #[test]
    fn submit_trims_and_clears() {
        let mut state = TuiState::new();
        state.input = "  idea  ".to_string();
        state.cursor_pos = 8;
        assert_eq!(state.submit_input().as_deref(), Some("idea"));
        assert!(state.input.is_empty());
        assert_eq!(state.cursor_pos, 0);

        state.input = "   ".to_string();
        assert_eq!(state.submit_input(), None);
    }
}
