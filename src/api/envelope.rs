// ABOUTME: Response envelope normalization: heterogeneous backend bodies become Envelope values.
// ABOUTME: Rules are applied in a fixed order; structured-agent replies and history entries decode here too.

use serde_json::{Map, Value, json};

use crate::api::types::{ChatMessage, Sender};

/// Response types the backend emits in the `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    General,
    Entrepreneurial,
    Image,
    Unknown,
    Other(String),
}

impl ResponseKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "general_response" => Self::General,
            "entrepreneurial_response" => Self::Entrepreneurial,
            "image_response" => Self::Image,
            "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::General => "general_response",
            Self::Entrepreneurial => "entrepreneurial_response",
            Self::Image => "image_response",
            Self::Unknown => "unknown",
            Self::Other(tag) => tag,
        }
    }
}

/// A normalized AI response.
///
/// `raw` is the full payload object as it should be rendered; for passthrough
/// bodies it is exactly what the server sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: ResponseKind,
    pub data: Option<Value>,
    pub raw: Value,
}

impl Envelope {
    pub fn general(data: Value) -> Self {
        Self::tagged(ResponseKind::General, data)
    }

    pub fn unknown(data: Value) -> Self {
        Self::tagged(ResponseKind::Unknown, data)
    }

    fn tagged(kind: ResponseKind, data: Value) -> Self {
        let raw = json!({ "type": kind.as_str(), "data": data });
        Self {
            kind,
            data: Some(data),
            raw,
        }
    }

    /// Keep a server-provided payload intact, reading its kind from `type`.
    pub fn passthrough(raw: Value) -> Self {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(ResponseKind::from_tag)
            .unwrap_or(ResponseKind::Unknown);
        let data = raw.get("data").cloned();
        Self { kind, data, raw }
    }

    /// Plain text for the envelope: string data as-is, other data as JSON,
    /// and the whole payload as JSON when there is no data.
    pub fn display_text(&self) -> String {
        match &self.data {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => self.raw.to_string(),
        }
    }
}

/// JavaScript-style truthiness, which the backend's optional fields rely on.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| truthy(v))
}

/// Normalize a parsed response body.
pub fn normalize(body: &Value) -> Envelope {
    if let Some(message) = truthy_field(body, "message") {
        return match message {
            Value::String(s) => normalize_string(s),
            other => Envelope::passthrough(other.clone()),
        };
    }

    match body.get("text") {
        Some(text @ Value::Object(_)) => return Envelope::passthrough(text.clone()),
        Some(Value::String(s)) => return Envelope::general(Value::String(s.clone())),
        _ => {}
    }

    match body {
        Value::String(s) => normalize_string(s),
        other => Envelope::unknown(other.clone()),
    }
}

/// Normalize raw response text; text that is not JSON is handled as a string body.
pub fn normalize_body(text: &str) -> Envelope {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => normalize(&value),
        Err(_) => normalize_string(text),
    }
}

/// A string payload may itself be JSON.
fn normalize_string(raw: &str) -> Envelope {
    let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
        return Envelope::general(Value::String(raw.to_string()));
    };

    if truthy_field(&parsed, "type").is_some() && parsed.get("data").is_some() {
        return Envelope::passthrough(parsed);
    }
    if let Some(text) = truthy_field(&parsed, "text") {
        return Envelope::general(text.clone());
    }
    Envelope::general(parsed)
}

/// Reply from the structured agent endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredReply {
    pub envelope: Envelope,
    pub step: Option<String>,
}

impl StructuredReply {
    /// Decode `{message: {type?, response?, data?, step?, ...}}`.
    ///
    /// Fields the server sends win; `type` defaults to `general_response` and
    /// `data` to `response` (or `""`). A non-object `message` falls back to
    /// the general normalization rules.
    pub fn from_body(body: &Value) -> Self {
        let message = match truthy_field(body, "message") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Self {
                    envelope: normalize(body),
                    step: None,
                };
            }
        };

        let step = message
            .get("step")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut payload = message;
        if !payload.get("type").is_some_and(truthy) {
            payload.insert("type".to_string(), json!("general_response"));
        }
        if !payload.contains_key("data") {
            let data = payload
                .get("response")
                .filter(|v| truthy(v))
                .cloned()
                .unwrap_or_else(|| json!(""));
            payload.insert("data".to_string(), data);
        }

        Self {
            envelope: Envelope::passthrough(Value::Object(payload)),
            step,
        }
    }
}

/// Readable text for an agent payload: `data.text`, `data.message`, or pretty JSON.
pub fn agent_text(data: &Value) -> String {
    match data {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => truthy_field(data, "text")
            .or_else(|| truthy_field(data, "message"))
            .map(value_text)
            .unwrap_or_else(|| serde_json::to_string_pretty(data).unwrap_or_default()),
        other => other.to_string(),
    }
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert `{message: [{user} | {agent}, ...]}` into transcript messages.
pub fn history_messages(body: &Value) -> Vec<ChatMessage> {
    let Some(entries) = body.get("message").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if let Some(user) = truthy_field(entry, "user") {
                return Some(ChatMessage::new(
                    format!("user-{index}"),
                    Sender::User,
                    value_text(user),
                ));
            }
            let agent = truthy_field(entry, "agent")?;
            let (kind, text) = match agent {
                Value::String(s) => (ResponseKind::General, s.clone()),
                _ => match truthy_field(agent, "type").and_then(Value::as_str) {
                    Some(tag) => (
                        ResponseKind::from_tag(tag),
                        agent_text(agent.get("data").unwrap_or(&Value::Null)),
                    ),
                    None => (
                        ResponseKind::General,
                        truthy_field(agent, "text")
                            .or_else(|| truthy_field(agent, "message"))
                            .map(value_text)
                            .unwrap_or_else(|| agent.to_string()),
                    ),
                },
            };
            let envelope = Envelope {
                kind,
                data: agent.get("data").cloned(),
                raw: agent.clone(),
            };
            Some(ChatMessage::new(format!("agent-{index}"), Sender::Ai, text).with_envelope(envelope))
        })
        .collect()
}
