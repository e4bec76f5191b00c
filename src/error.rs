// ABOUTME: Error taxonomy for the co-founder API client.
// ABOUTME: Library code returns ClientError; the binary wraps it in anyhow at the edge.

use thiserror::Error;

/// Fallback notice when a 402 body carries no `notify` field.
pub const DEFAULT_PAYMENT_NOTICE: &str = "Token consumed, please buy the tokens";

/// Shown when an error message cleans down to nothing.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Two consecutive 401 cycles without a successful recovery.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{notice}")]
    PaymentRequired { notice: String },

    #[error("{0}")]
    Auth(String),

    /// No usable credentials; the caller should send the user to `redirect_url`.
    #[error("re-authentication required at {redirect_url}")]
    ReauthRequired { redirect_url: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// HTTP status associated with the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Unauthorized => Some(401),
            ClientError::PaymentRequired { .. } => Some(402),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Strip status codes and technical prefixes from an error message before
/// showing it to the user.
pub fn clean_error_message(message: &str) -> String {
    let mut words: Vec<&str> = message.split_whitespace().collect();

    // Leading "Error:" / "Failed:" style prefix.
    if let Some(first) = words.first() {
        let lowered = first.to_ascii_lowercase();
        if ["error:", "failed:", "network:", "request:", "response:"].contains(&lowered.as_str()) {
            words.remove(0);
        }
    }

    let mut cleaned: Vec<&str> = Vec::with_capacity(words.len());
    let mut skip_next_number = false;
    for word in words {
        if skip_next_number {
            skip_next_number = false;
            if word.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
        }
        if word.eq_ignore_ascii_case("status:") {
            skip_next_number = true;
            continue;
        }
        if is_status_code_token(word) {
            continue;
        }
        cleaned.push(word);
    }

    let joined = cleaned.join(" ");
    let trimmed = joined.trim_end_matches(':').trim();
    if trimmed.is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A bare or parenthesised three-digit number, optionally followed by `:`.
fn is_status_code_token(word: &str) -> bool {
    let inner = word
        .trim_end_matches([':', ',', '.'])
        .trim_start_matches('(')
        .trim_end_matches(')');
    inner.len() == 3 && inner.chars().all(|c| c.is_ascii_digit())
}
