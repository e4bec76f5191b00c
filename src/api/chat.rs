// ABOUTME: HTTP implementation of ChatBackend on top of the authenticated fetch wrapper.
// ABOUTME: Chat list/creation, structured sends, history, token stats, and template downloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::api::ChatBackend;
use crate::api::envelope::{Envelope, StructuredReply, history_messages, normalize_body, truthy};
use crate::api::types::{ChatMessage, ChatSession, NewChat, TokenStats, id_string};
use crate::auth::{ApiRequest, AuthClient};
use crate::error::{ClientError, DEFAULT_PAYMENT_NOTICE, Result};

const DEFAULT_CHAT_NAME: &str = "New Chat";

/// Backend client for the `/api/chat/*` endpoints.
pub struct ChatApi {
    client: Arc<AuthClient>,
    base_url: String,
}

impl ChatApi {
    pub fn new(client: Arc<AuthClient>, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn template_url(&self, name: &str) -> Result<String> {
        let mut url = Url::parse(&self.endpoint("/api/chat/template/"))
            .map_err(|e| ClientError::Config(format!("invalid base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(name)
            .push("");
        Ok(url.to_string())
    }

    async fn get_json(&self, request: ApiRequest) -> Result<Value> {
        let response = self.client.send(&request).await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Unstructured agent call, retried up to `retries` extra times.
    pub async fn send_simple(&self, text: &str, retries: u32) -> Result<Envelope> {
        let request = ApiRequest::post(
            self.endpoint("/api/chat/agent/"),
            json!({ "user_input": text }),
        );

        let mut attempt = 0;
        loop {
            match self.simple_once(&request).await {
                Ok(envelope) => return Ok(envelope),
                Err(e @ ClientError::ReauthRequired { .. }) => return Err(e),
                Err(e) if attempt >= retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    warn!("agent request failed (attempt {}/{}): {}", attempt, retries + 1, e);
                }
            }
        }
    }

    async fn simple_once(&self, request: &ApiRequest) -> Result<Envelope> {
        let response = self.client.send(request).await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        Ok(normalize_body(&body))
    }
}

#[async_trait]
impl ChatBackend for ChatApi {
    async fn list_chats(&self) -> Result<Vec<ChatSession>> {
        let body = self
            .get_json(ApiRequest::get(self.endpoint("/api/chat/history/")))
            .await?;
        let chats = body
            .get("message")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let detail = entry.get("detail")?;
                        let id = id_string(detail.get("chat_id")?)?;
                        Some(ChatSession::new(id, chat_name(detail)))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        debug!(count = chats.len(), "listed chats");
        Ok(chats)
    }

    async fn create_chat(&self) -> Result<NewChat> {
        let body = self
            .get_json(ApiRequest::get(self.endpoint("/api/chat/new-chat/")))
            .await?;
        let message = body.get("message").unwrap_or(&Value::Null);
        let chat_id = message
            .get("chat_id")
            .and_then(id_string)
            .ok_or_else(|| ClientError::Parse("no chat id in new-chat response".to_string()))?;
        info!(chat_id = %chat_id, "created chat");
        Ok(NewChat {
            chat_id,
            chat_name: chat_name(message),
        })
    }

    async fn send_structured(
        &self,
        chat_id: &str,
        input: &str,
        step: Option<&str>,
    ) -> Result<StructuredReply> {
        let mut body = json!({ "user_input": input });
        if let Some(step) = step.filter(|s| !s.is_empty()) {
            body["step"] = json!(step);
        }
        let request = ApiRequest::post(self.endpoint("/api/chat/structured-agent/"), body)
            .query("chat-id", chat_id);

        let response = self.client.send(&request).await?;
        if response.status() == StatusCode::PAYMENT_REQUIRED {
            let text = response.text().await.unwrap_or_default();
            let notice = payment_notice(&text);
            warn!("send refused: {}", notice);
            return Err(ClientError::PaymentRequired { notice });
        }
        let response = ensure_success(response).await?;
        let body: Value = response.json().await?;
        Ok(StructuredReply::from_body(&body))
    }

    async fn chat_history(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let body = self
            .get_json(ApiRequest::get(self.endpoint("/api/chat/history/")).query("chat-id", chat_id))
            .await?;
        Ok(history_messages(&body))
    }

    async fn token_stats(&self) -> Result<TokenStats> {
        let body = self
            .get_json(ApiRequest::get(self.endpoint("/api/chat/token/")))
            .await?;
        Ok(TokenStats::from_body(&body))
    }

    async fn download_template(&self, name: &str, dir: &Path) -> Result<PathBuf> {
        let file_name = safe_file_name(name)
            .ok_or_else(|| ClientError::Parse(format!("invalid template name: {name}")))?;

        let response = self
            .client
            .send(&ApiRequest::get(self.template_url(name)?))
            .await?;
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ClientError::Parse(format!("template {name} is empty")));
        }

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        let tmp_path = dir.join(format!(".{file_name}.part"));
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        info!(path = %path.display(), "template saved");
        Ok(path)
    }
}

/// Turn a non-2xx response into `ClientError::Status`.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

fn chat_name(detail: &Value) -> String {
    detail
        .get("chat_name")
        .filter(|v| truthy(v))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CHAT_NAME)
        .to_string()
}

/// Notice from a 402 body (`notifiy` is a known backend typo).
fn payment_notice(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["notifiy", "notify"].iter().find_map(|key| {
                v.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| DEFAULT_PAYMENT_NOTICE.to_string())
}

/// Keep only the final path component so a name cannot escape the target dir.
fn safe_file_name(name: &str) -> Option<&str> {
    let candidate = name.rsplit(['/', '\\']).next()?.trim();
    match candidate {
        "" | "." | ".." => None,
        other => Some(other),
    }
}
