// ABOUTME: State transitions for the TUI: user actions become worker requests, worker events update state.
// ABOUTME: Kept free of terminal I/O so every transition can be tested directly.

use crate::api::format::template_names;
use crate::api::types::Sender;
use crate::tui::input::InputResult;
use crate::tui::state::{ChatEvent, TuiState, UserEvent};

const EXHAUSTED_NOTICE: &str = "Token consumed, add more tokens to continue.";

/// Apply a key action to the state, returning the request for the worker, if any.
pub fn handle_input(state: &mut TuiState, result: InputResult) -> Option<UserEvent> {
    match result {
        InputResult::None => None,
        InputResult::Quit => {
            state.should_quit = true;
            Some(UserEvent::Quit)
        }
        InputResult::Send(text) => {
            let message_id = state.push_user_message(&text);
            state.waiting = true;
            state.notice = None;
            Some(UserEvent::Send {
                message_id,
                text,
                step: state.active_step,
            })
        }
        InputResult::SelectStep(step) => {
            if state.waiting {
                return None;
            }
            state.active_step = step;
            let message_id = state.push_user_message(crate::steps::STEP_GREETING);
            state.waiting = true;
            state.notice = None;
            Some(UserEvent::SelectStep { message_id, step })
        }
        InputResult::Retry => {
            if state.waiting {
                return None;
            }
            let Some(failed) = state.last_failed_message() else {
                state.set_notice("Nothing to retry", false);
                return None;
            };
            let event = UserEvent::Retry {
                message_id: failed.id.clone(),
                text: failed.text.clone(),
                step: state.active_step,
            };
            state.waiting = true;
            state.notice = None;
            Some(event)
        }
        InputResult::NewChat => {
            if state.waiting {
                return None;
            }
            state.reset_for_new_chat();
            state.waiting = true;
            Some(UserEvent::NewChat)
        }
        InputResult::DownloadTemplates => {
            if state.offered_templates.is_empty() {
                state.set_notice("No templates offered by the latest reply", false);
                return None;
            }
            let names = state.offered_templates.clone();
            state.set_notice(format!("Downloading {} template(s)...", names.len()), false);
            state.waiting = true;
            Some(UserEvent::DownloadTemplates(names))
        }
    }
}

/// Apply an event from the conversation worker.
pub fn apply_chat_event(state: &mut TuiState, event: ChatEvent) {
    match event {
        ChatEvent::Reply(message) => {
            state.offered_templates = template_names(&message);
            state.push_message(message);
        }
        ChatEvent::MessageFailed { message_id } => state.set_failed(&message_id, true),
        ChatEvent::MessageRecovered { message_id } => state.set_failed(&message_id, false),
        ChatEvent::PaymentRequired(notice) => {
            state.send_disabled = true;
            state.set_notice(notice, true);
        }
        ChatEvent::TokenStats(stats) => {
            let exhausted = !stats.skip_token_usage
                && stats.used.is_some()
                && stats.total.is_some_and(|t| t > 0)
                && stats.exhausted();
            state.token_stats = stats;
            if exhausted {
                state.set_notice(EXHAUSTED_NOTICE, true);
            }
        }
        ChatEvent::ChatsListed(chats) => state.chats = chats,
        ChatEvent::ChatCreated(chat) => state.current_chat = Some(chat.chat_id),
        ChatEvent::HistoryLoaded { chat_id, messages } => {
            state.offered_templates = messages
                .iter()
                .rev()
                .find(|m| m.sender == Sender::Ai)
                .map(template_names)
                .unwrap_or_default();
            state.messages = messages;
            state.scroll_offset = 0;
            state.current_chat = Some(chat_id);
        }
        ChatEvent::TemplateSaved(path) => {
            state.set_notice(format!("Saved {}", path.display()), false);
        }
        ChatEvent::Error(text) => state.set_notice(text, true),
        ChatEvent::ReauthRequired(url) => {
            state.reauth_url = Some(url);
            state.should_quit = true;
        }
        ChatEvent::Done => state.waiting = false,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::api::envelope::Envelope;
    use crate::api::types::{ChatMessage, NewChat, TokenStats};

    fn ready_state() -> TuiState {
        let mut state = TuiState::new();
        state.waiting = false;
        state
    }

    #[test]
    fn send_appends_user_message_with_active_step() {
        let mut state = ready_state();
        state.active_step = 4;
        let event = handle_input(&mut state, InputResult::Send("hello".into()));

        assert_eq!(state.messages.len(), 1);
        assert!(state.waiting);
        match event {
            Some(UserEvent::Send { message_id, text, step }) => {
                assert_eq!(message_id, state.messages[0].id);
                assert_eq!(text, "hello");
                assert_eq!(step, 4);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn select_step_greets_and_activates() {
        let mut state = ready_state();
        let event = handle_input(&mut state, InputResult::SelectStep(6));
        assert_eq!(state.active_step, 6);
        assert_eq!(state.messages[0].text, "Hi");
        assert!(matches!(event, Some(UserEvent::SelectStep { step: 6, .. })));
    }

    #[test]
    fn retry_targets_last_failed_message() {
        let mut state = ready_state();
        let id = state.push_user_message("lost message");
        apply_chat_event(&mut state, ChatEvent::MessageFailed { message_id: id.clone() });

        let event = handle_input(&mut state, InputResult::Retry);
        assert_eq!(
            event,
            Some(UserEvent::Retry {
                message_id: id.clone(),
                text: "lost message".into(),
                step: 1
            })
        );

        apply_chat_event(&mut state, ChatEvent::MessageRecovered { message_id: id });
        assert!(state.last_failed_message().is_none());
    }

    #[test]
    fn retry_without_failure_sets_notice() {
        let mut state = ready_state();
        assert_eq!(handle_input(&mut state, InputResult::Retry), None);
        assert!(state.notice.is_some());
    }

    #[test]
    fn payment_required_disables_sending_until_new_chat() {
        let mut state = ready_state();
        apply_chat_event(&mut state, ChatEvent::PaymentRequired("Buy tokens".into()));
        assert!(state.send_disabled);
        assert_eq!(state.notice.as_ref().map(|n| n.text.as_str()), Some("Buy tokens"));

        let event = handle_input(&mut state, InputResult::NewChat);
        assert_eq!(event, Some(UserEvent::NewChat));
        assert!(!state.send_disabled);
        assert!(state.notice.is_none());

        apply_chat_event(
            &mut state,
            ChatEvent::ChatCreated(NewChat {
                chat_id: "9".into(),
                chat_name: "New Chat".into(),
            }),
        );
        assert_eq!(state.current_chat.as_deref(), Some("9"));
    }

    #[test]
    fn replies_offer_templates_for_download() {
        let mut state = ready_state();
        let reply = ChatMessage::new("1-ai", Sender::Ai, "").with_envelope(Envelope::passthrough(json!({
            "type": "entrepreneurial_response",
            "data": { "roadmap": [ { "title": "Plan", "templates": ["plan.docx"] } ] }
        })));
        apply_chat_event(&mut state, ChatEvent::Reply(reply));
        assert_eq!(state.offered_templates, vec!["plan.docx"]);

        let event = handle_input(&mut state, InputResult::DownloadTemplates);
        assert_eq!(event, Some(UserEvent::DownloadTemplates(vec!["plan.docx".into()])));

        apply_chat_event(&mut state, ChatEvent::TemplateSaved(PathBuf::from("/tmp/plan.docx")));
        assert_eq!(
            state.notice.as_ref().map(|n| n.text.as_str()),
            Some("Saved /tmp/plan.docx")
        );
    }

    #[test]
    fn download_without_templates_is_a_notice() {
        let mut state = ready_state();
        assert_eq!(handle_input(&mut state, InputResult::DownloadTemplates), None);
        assert!(state.notice.is_some());
    }

    #[test]
    fn exhausted_stats_raise_notice() {
        let mut state = ready_state();
        apply_chat_event(
            &mut state,
            ChatEvent::TokenStats(TokenStats {
                used: Some(500),
                total: Some(500),
                ..Default::default()
            }),
        );
        assert!(state.notice.as_ref().is_some_and(|n| n.is_error));

        let mut state = ready_state();
        apply_chat_event(
            &mut state,
            ChatEvent::TokenStats(TokenStats {
                used: Some(500),
                total: Some(500),
                skip_token_usage: true,
                ..Default::default()
            }),
        );
        assert!(state.notice.is_none());
    }

    #[test]
    fn history_replaces_transcript() {
        let mut state = ready_state();
        state.push_user_message("stale");
        apply_chat_event(
            &mut state,
            ChatEvent::HistoryLoaded {
                chat_id: "3".into(),
                messages: vec![ChatMessage::new("user-0", Sender::User, "earlier")],
            },
        );
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].text, "earlier");
        assert_eq!(state.current_chat.as_deref(), Some("3"));
    }

    #[test]
    fn reauth_quits_with_url() {
        let mut state = ready_state();
        apply_chat_event(&mut state, ChatEvent::ReauthRequired("https://dash".into()));
        assert!(state.should_quit);
        assert_eq!(state.reauth_url.as_deref(), Some("https://dash"));
    }

    #[test]
    fn done_clears_waiting() {
        let mut state = TuiState::new();
        apply_chat_event(&mut state, ChatEvent::Done);
        assert!(!state.waiting);
    }
}
