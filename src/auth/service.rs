// ABOUTME: Authentication flow: SID exchange, refresh exchange, and startup token resolution.
// ABOUTME: Never navigates anywhere itself; a missing session surfaces as AuthOutcome::RequiresReauth.

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::auth::sid::sid_from_url;
use crate::auth::store::CredentialStore;
use crate::error::{ClientError, Result};

/// Result of resolving credentials at startup or before a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(String),
    /// Nothing to authenticate with; the shell should send the user here.
    RequiresReauth { redirect_url: String },
}

/// Tokens returned by the SID or refresh endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Talks to the `/api/bubble/*` endpoints and keeps the credential store current.
pub struct AuthService {
    http: Client,
    base_url: String,
    store: CredentialStore,
    launch_url: Option<String>,
    dashboard_url: Option<String>,
}

impl AuthService {
    pub fn new(http: Client, base_url: &str, store: CredentialStore) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            launch_url: None,
            dashboard_url: None,
        }
    }

    /// URL the client was launched with; its `sid` is used when none is stored.
    pub fn with_launch_url(mut self, url: Option<String>) -> Self {
        self.launch_url = url;
        self
    }

    pub fn with_dashboard_url(mut self, url: Option<String>) -> Self {
        self.dashboard_url = url.filter(|u| !u.is_empty());
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn dashboard_url(&self) -> Option<&str> {
        self.dashboard_url.as_deref()
    }

    fn auth_endpoint(&self) -> String {
        format!("{}/api/bubble/auth/", self.base_url)
    }

    fn refresh_endpoint(&self) -> String {
        format!("{}/api/bubble/refresh/", self.base_url)
    }

    /// Stored SID, else the one in the launch URL (persisted once found).
    pub fn sid_for_auth(&self) -> Option<String> {
        if let Some(sid) = self.store.sid() {
            debug!("using stored sid");
            return Some(sid);
        }
        let sid = self.launch_url.as_deref().and_then(sid_from_url)?;
        debug!("sid found in launch url; persisting");
        self.store.set_sid(&sid);
        Some(sid)
    }

    /// Exchange a SID for backend tokens.
    pub async fn authenticate_with_sid(&self, sid: &str) -> Result<TokenPair> {
        let response = self
            .http
            .get(self.auth_endpoint())
            .query(&[("sid", sid)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Auth(format!(
                "authentication failed: {}",
                response.status().as_u16()
            )));
        }

        let data: Value = response.json().await?;
        let access_token = first_string(
            &data,
            &[&["messsage", "access"], &["message", "access"], &["access"]],
        )
        .ok_or_else(|| ClientError::Auth("no access token received from server".to_string()))?;
        let refresh_token = first_string(
            &data,
            &[&["messsage", "refresh"], &["message", "refresh"], &["refresh"]],
        );

        info!("authenticated with sid");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token. The refresh token is
    /// rotated only when the server returns a new one.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair> {
        let response = self
            .http
            .post(self.refresh_endpoint())
            .json(&json!({ "refresh": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Auth(format!(
                "token refresh failed: {}",
                response.status().as_u16()
            )));
        }

        let data: Value = response.json().await?;
        let access_token = first_string(
            &data,
            &[&["message", "access"], &["access"], &["token"], &["jwt"]],
        )
        .ok_or_else(|| ClientError::Auth("no access token received from refresh".to_string()))?;
        let refresh_token = first_string(&data, &[&["message", "refresh"], &["refresh"]])
            .unwrap_or_else(|| refresh_token.to_string());

        info!("access token refreshed");
        Ok(TokenPair {
            access_token,
            refresh_token: Some(refresh_token),
        })
    }

    /// Resolve an access token: SID exchange first, then stored tokens, then
    /// re-authentication via the dashboard.
    pub async fn initialize(&self) -> Result<AuthOutcome> {
        if let Some(sid) = self.sid_for_auth() {
            let pair = self.authenticate_with_sid(&sid).await?;
            self.store.set_tokens(
                Some(&pair.access_token),
                pair.refresh_token.as_deref(),
                Some(&sid),
            );
            return Ok(AuthOutcome::Authenticated(pair.access_token));
        }

        // Stored tokens are returned without a freshness check; a stale token
        // is recovered through the 401 path.
        if let (Some(access), Some(_)) = (self.store.access_token(), self.store.refresh_token()) {
            debug!("no sid; reusing stored tokens");
            return Ok(AuthOutcome::Authenticated(access));
        }

        if let Some(url) = &self.dashboard_url {
            warn!("no sid and no stored tokens; re-authentication required");
            return Ok(AuthOutcome::RequiresReauth {
                redirect_url: url.clone(),
            });
        }

        Err(ClientError::Auth("missing session id (sid)".to_string()))
    }

    pub fn logout(&self) {
        self.store.clear_tokens();
        info!("credentials cleared");
    }
}

/// First non-empty string found along any of the given key paths.
fn first_string(value: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(value, |current, key| current.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
