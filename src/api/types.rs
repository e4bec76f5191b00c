// ABOUTME: Domain types shared by the chat API, the conversation worker, and the TUI.
// ABOUTME: Chat sessions, transcript messages, and token usage statistics.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::api::envelope::Envelope;

/// Usage ceiling assumed when the server does not report one.
pub const DEFAULT_TOKEN_TOTAL: u64 = 20_000;

/// An entry in the chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: String,
    pub name: String,
    /// When this client first saw the chat; the list endpoint carries no date.
    pub created_at: DateTime<Local>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Local::now(),
        }
    }
}

/// A freshly created chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChat {
    pub chat_id: String,
    pub chat_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
    System,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    /// The normalized response behind an AI message.
    pub envelope: Option<Envelope>,
    pub timestamp: String,
    /// Set on user messages whose send failed; cleared by a successful retry.
    pub failed: bool,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender,
            text: text.into(),
            envelope: None,
            timestamp: display_timestamp(),
            failed: false,
        }
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }
}

/// Local time in the transcript's `Mar 4, 3:07 PM` style.
pub fn display_timestamp() -> String {
    Local::now().format("%b %-d, %-I:%M %p").to_string()
}

/// Token usage for the signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStats {
    pub used: Option<u64>,
    pub total: Option<u64>,
    pub created_at: Option<String>,
    pub renewable_date: Option<String>,
    pub skip_token_usage: bool,
}

impl TokenStats {
    /// Decode the token endpoint body. Field names vary between backend
    /// versions, so several aliases are accepted.
    pub fn from_body(body: &Value) -> Self {
        let payload = match body.get("message") {
            Some(Value::Null) | None => body,
            Some(message) => message,
        };

        Self {
            used: first_number(payload, &["used", "tokens_used", "used_tokens", "token_used"]),
            total: first_number(
                payload,
                &["total", "total_tokens", "tokens_total", "total_token"],
            ),
            created_at: payload
                .get("created_at")
                .and_then(Value::as_str)
                .map(str::to_string),
            renewable_date: payload
                .get("renewable_date")
                .and_then(Value::as_str)
                .map(str::to_string),
            skip_token_usage: payload
                .get("skip_token_usage")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    pub fn used_or_zero(&self) -> u64 {
        self.used.unwrap_or(0)
    }

    pub fn effective_total(&self) -> u64 {
        self.total.filter(|t| *t > 0).unwrap_or(DEFAULT_TOKEN_TOTAL)
    }

    pub fn exhausted(&self) -> bool {
        self.used_or_zero() >= self.effective_total()
    }

    /// Used fraction in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        (self.used_or_zero() as f64 / self.effective_total() as f64).clamp(0.0, 1.0)
    }
}

fn first_number(payload: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match payload.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Identifiers arrive as strings or numbers.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_stats_reads_message_payload() {
        let stats = TokenStats::from_body(&json!({
            "message": {
                "tokens_used": 1200,
                "total_tokens": 5000,
                "created_at": "2026-01-01",
                "renewable_date": "2026-02-01",
                "skip_token_usage": false
            }
        }));
        assert_eq!(stats.used, Some(1200));
        assert_eq!(stats.total, Some(5000));
        assert_eq!(stats.renewable_date.as_deref(), Some("2026-02-01"));
        assert!(!stats.exhausted());
    }

    #[test]
    fn token_stats_falls_back_to_body() {
        let stats = TokenStats::from_body(&json!({ "used": 10, "total": 10 }));
        assert_eq!(stats.used, Some(10));
        assert!(stats.exhausted());
    }

    #[test]
    fn token_stats_alias_order() {
        let stats = TokenStats::from_body(&json!({ "token_used": 3, "used_tokens": 2 }));
        assert_eq!(stats.used, Some(2));
    }

    #[test]
    fn missing_total_defaults() {
        let stats = TokenStats::from_body(&json!({ "used": 5000 }));
        assert_eq!(stats.total, None);
        assert_eq!(stats.effective_total(), DEFAULT_TOKEN_TOTAL);
        assert!((stats.ratio() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn skip_token_usage_flag() {
        let stats = TokenStats::from_body(&json!({ "message": { "skip_token_usage": true } }));
        assert!(stats.skip_token_usage);
        assert_eq!(stats.used, None);
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        assert_eq!(id_string(&json!(42)).as_deref(), Some("42"));
        assert_eq!(id_string(&json!("abc")).as_deref(), Some("abc"));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&Value::Null), None);
    }
}
