// ABOUTME: Conversation worker: turns TUI requests into backend calls and reports the results.
// ABOUTME: Owns the current chat id; requests are handled strictly one at a time.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::ChatBackend;
use crate::api::envelope::{ResponseKind, StructuredReply, agent_text};
use crate::api::types::{ChatMessage, Sender};
use crate::error::{ClientError, GENERIC_ERROR_MESSAGE, clean_error_message};
use crate::steps::{STEP_GREETING, step_param};
use crate::tui::state::{ChatEvent, UserEvent};

/// Bundled parameters for the conversation worker.
pub struct ConversationParams {
    pub backend: Arc<dyn ChatBackend>,
    pub templates_dir: PathBuf,
}

struct Worker {
    backend: Arc<dyn ChatBackend>,
    templates_dir: PathBuf,
    chat_id: Option<String>,
    events: mpsc::Sender<ChatEvent>,
}

/// Run the worker until the user quits or the channel closes.
///
/// On start it loads token stats, the chat list, and the most recent chat's
/// history. Every handled request ends with `ChatEvent::Done`.
pub async fn run_conversation_loop(
    params: ConversationParams,
    mut user_rx: mpsc::Receiver<UserEvent>,
    event_tx: mpsc::Sender<ChatEvent>,
) {
    let mut worker = Worker {
        backend: params.backend,
        templates_dir: params.templates_dir,
        chat_id: None,
        events: event_tx,
    };

    worker.bootstrap().await;
    worker.emit(ChatEvent::Done).await;

    while let Some(event) = user_rx.recv().await {
        match event {
            UserEvent::Quit => break,
            UserEvent::Send {
                message_id,
                text,
                step,
            } => worker.send(&message_id, &text, step, false).await,
            UserEvent::Retry {
                message_id,
                text,
                step,
            } => worker.send(&message_id, &text, step, true).await,
            UserEvent::SelectStep { message_id, step } => {
                worker.send(&message_id, STEP_GREETING, step, false).await
            }
            UserEvent::NewChat => worker.new_chat().await,
            UserEvent::DownloadTemplates(names) => worker.download_templates(&names).await,
        }
        worker.emit(ChatEvent::Done).await;
    }
    debug!("conversation worker stopped");
}

impl Worker {
    async fn emit(&self, event: ChatEvent) {
        if self.events.send(event).await.is_err() {
            debug!("TUI channel closed");
        }
    }

    async fn bootstrap(&mut self) {
        self.refresh_token_stats().await;

        let chats = match self.backend.list_chats().await {
            Ok(chats) => chats,
            Err(e) => {
                if self.report_reauth(&e).await {
                    return;
                }
                warn!("failed to list chats: {}", e);
                Vec::new()
            }
        };
        let latest = chats.last().map(|c| c.id.clone());
        self.emit(ChatEvent::ChatsListed(chats)).await;

        if let Some(chat_id) = latest {
            self.load_history(chat_id).await;
        }
    }

    async fn load_history(&mut self, chat_id: String) {
        match self.backend.chat_history(&chat_id).await {
            Ok(messages) => {
                info!(chat_id = %chat_id, count = messages.len(), "loaded chat history");
                self.chat_id = Some(chat_id.clone());
                self.emit(ChatEvent::HistoryLoaded { chat_id, messages })
                    .await;
            }
            Err(e) => {
                warn!("failed to load chat history: {}", e);
                if !self.report_reauth(&e).await {
                    self.emit(ChatEvent::Error(user_message(
                        &e,
                        "Failed to load chat history. Please try again.",
                    )))
                    .await;
                }
            }
        }
    }

    async fn refresh_token_stats(&self) {
        match self.backend.token_stats().await {
            Ok(stats) => self.emit(ChatEvent::TokenStats(stats)).await,
            Err(e) => debug!("token stats unavailable: {}", e),
        }
    }

    /// Chat id to send to, creating a chat first when there is none.
    async fn ensure_chat(&mut self) -> Result<String, ClientError> {
        if let Some(id) = &self.chat_id {
            return Ok(id.clone());
        }
        let chat = self.backend.create_chat().await?;
        self.chat_id = Some(chat.chat_id.clone());
        let id = chat.chat_id.clone();
        self.emit(ChatEvent::ChatCreated(chat)).await;
        if let Ok(chats) = self.backend.list_chats().await {
            self.emit(ChatEvent::ChatsListed(chats)).await;
        }
        Ok(id)
    }

    async fn send(&mut self, message_id: &str, text: &str, step: u8, is_retry: bool) {
        // A retry targets the chat its first attempt went to; the message
        // stays marked failed when that chat is gone.
        if is_retry && self.chat_id.is_none() {
            debug!(message_id, "retry without an active chat ignored");
            return;
        }
        let chat_id = match self.ensure_chat().await {
            Ok(id) => id,
            Err(e) => {
                warn!("failed to create chat: {}", e);
                self.fail_message(message_id, &e, "Failed to create chat. Please try again.")
                    .await;
                return;
            }
        };

        let step = step_param(step);
        debug!(chat_id = %chat_id, step = %step, retry = is_retry, "sending message");
        match self
            .backend
            .send_structured(&chat_id, text, Some(&step))
            .await
        {
            Ok(reply) => {
                if is_retry {
                    self.emit(ChatEvent::MessageRecovered {
                        message_id: message_id.to_string(),
                    })
                    .await;
                }
                self.emit(ChatEvent::Reply(reply_message(&reply))).await;
                self.refresh_token_stats().await;
            }
            Err(e) => {
                warn!("send failed: {}", e);
                self.fail_message(message_id, &e, "Failed to send message. Please try again.")
                    .await;
            }
        }
    }

    async fn fail_message(&self, message_id: &str, error: &ClientError, fallback: &str) {
        self.emit(ChatEvent::MessageFailed {
            message_id: message_id.to_string(),
        })
        .await;
        if let ClientError::PaymentRequired { notice } = error {
            self.emit(ChatEvent::PaymentRequired(notice.clone())).await;
            return;
        }
        if !self.report_reauth(error).await {
            self.emit(ChatEvent::Error(user_message(error, fallback))).await;
        }
    }

    async fn new_chat(&mut self) {
        self.chat_id = None;
        match self.backend.create_chat().await {
            Ok(chat) => {
                self.chat_id = Some(chat.chat_id.clone());
                self.emit(ChatEvent::ChatCreated(chat)).await;
                if let Ok(chats) = self.backend.list_chats().await {
                    self.emit(ChatEvent::ChatsListed(chats)).await;
                }
            }
            Err(e) => {
                warn!("failed to create new chat: {}", e);
                if !self.report_reauth(&e).await {
                    self.emit(ChatEvent::Error(user_message(
                        &e,
                        "Failed to create new chat. Please try again.",
                    )))
                    .await;
                }
            }
        }
    }

    async fn download_templates(&self, names: &[String]) {
        for name in names {
            match self
                .backend
                .download_template(name, &self.templates_dir)
                .await
            {
                Ok(path) => self.emit(ChatEvent::TemplateSaved(path)).await,
                Err(e) => {
                    warn!("template download failed for {}: {}", name, e);
                    if self.report_reauth(&e).await {
                        return;
                    }
                    self.emit(ChatEvent::Error(format!(
                        "Failed to download template {}: {}",
                        name,
                        clean_error_message(&e.to_string())
                    )))
                    .await;
                }
            }
        }
    }

    /// Forward a re-authentication demand. Returns true when `error` was one.
    async fn report_reauth(&self, error: &ClientError) -> bool {
        if let ClientError::ReauthRequired { redirect_url } = error {
            self.emit(ChatEvent::ReauthRequired(redirect_url.clone()))
                .await;
            return true;
        }
        false
    }
}

/// Transcript entry for a structured reply. Only general responses carry
/// text; other kinds render from their payload.
pub fn reply_message(reply: &StructuredReply) -> ChatMessage {
    let envelope = reply.envelope.clone();
    let text = match envelope.kind {
        ResponseKind::General => agent_text(envelope.data.as_ref().unwrap_or(&Value::Null)),
        _ => String::new(),
    };
    let id = format!("{}-ai", Utc::now().timestamp_millis());
    ChatMessage::new(id, Sender::Ai, text).with_envelope(envelope)
}

/// Error text for the status bar. Raw HTTP failures get the action-specific
/// fallback rather than a response body.
fn user_message(error: &ClientError, fallback: &str) -> String {
    if matches!(error, ClientError::Status { .. }) {
        return fallback.to_string();
    }
    let cleaned = clean_error_message(&error.to_string());
    if cleaned == GENERIC_ERROR_MESSAGE {
        fallback.to_string()
    } else {
        cleaned
    }
}
