// ABOUTME: Authenticated fetch wrapper: attaches the bearer token and recovers from HTTP 401.
// ABOUTME: The unauthorized counter is per client; recovery is serialized behind an async mutex.

use std::sync::Mutex;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::service::{AuthOutcome, AuthService};
use crate::error::{ClientError, Result};

/// Consecutive 401s tolerated before giving up with `ClientError::Unauthorized`.
pub const MAX_UNAUTHORIZED_ATTEMPTS: u32 = 2;

/// A request description that can be replayed after token recovery.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Default)]
struct RetryState {
    unauthorized_attempts: u32,
}

/// HTTP client for authenticated backend calls.
pub struct AuthClient {
    http: Client,
    auth: AuthService,
    state: Mutex<RetryState>,
    recovery: tokio::sync::Mutex<()>,
}

impl AuthClient {
    pub fn new(http: Client, auth: AuthService) -> Self {
        Self {
            http,
            auth,
            state: Mutex::new(RetryState::default()),
            recovery: tokio::sync::Mutex::new(()),
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn unauthorized_attempts(&self) -> u32 {
        self.state
            .lock()
            .map(|s| s.unauthorized_attempts)
            .unwrap_or_default()
    }

    /// Send `request` with the current bearer token.
    ///
    /// Non-401 responses are returned whatever their status; callers decide
    /// what a 4xx/5xx means for them.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response> {
        let token = self.resolve_token().await?;

        let response = self.dispatch(request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            self.reset_attempts();
            return Ok(response);
        }

        warn!(url = %request.url, "request unauthorized");
        let fresh = self.recover(token.as_deref()).await?;
        self.dispatch(request, Some(&fresh)).await
    }

    /// Stored token, or one obtained by running the authentication flow.
    async fn resolve_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.auth.store().access_token() {
            return Ok(Some(token));
        }

        debug!("no access token; running authentication flow");
        match self.auth.initialize().await {
            Ok(AuthOutcome::Authenticated(token)) => Ok(Some(token)),
            Ok(AuthOutcome::RequiresReauth { redirect_url }) => {
                Err(ClientError::ReauthRequired { redirect_url })
            }
            Err(e) => match self.auth.dashboard_url() {
                Some(url) => {
                    warn!("authentication failed: {}", e);
                    Err(ClientError::ReauthRequired {
                        redirect_url: url.to_string(),
                    })
                }
                None => {
                    warn!("authentication failed, continuing without a token: {}", e);
                    Ok(None)
                }
            },
        }
    }

    /// Obtain a new access token after a 401: refresh first, SID second.
    ///
    /// Runs under the recovery lock. A caller whose failed token was already
    /// replaced by a concurrent recovery gets the stored token without
    /// counting its 401. Only a caller that actually recovers bumps the
    /// counter, and it resets the counter once recovery succeeds.
    async fn recover(&self, failed_token: Option<&str>) -> Result<String> {
        let _guard = self.recovery.lock().await;

        if let Some(current) = self.auth.store().access_token() {
            if Some(current.as_str()) != failed_token {
                debug!("token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let attempts = self.bump_attempts();
        if attempts >= MAX_UNAUTHORIZED_ATTEMPTS {
            warn!(attempts, "giving up after repeated 401s");
            return Err(ClientError::Unauthorized);
        }

        let fresh = self.recover_token().await?;
        self.reset_attempts();
        Ok(fresh)
    }

    async fn recover_token(&self) -> Result<String> {
        let store = self.auth.store();
        if let Some(refresh) = store.refresh_token() {
            match self.auth.refresh_access_token(&refresh).await {
                Ok(pair) => {
                    store.set_tokens(
                        Some(&pair.access_token),
                        pair.refresh_token.as_deref(),
                        None,
                    );
                    return Ok(pair.access_token);
                }
                Err(e) => warn!("token refresh failed, falling back to sid: {}", e),
            }
        }

        let sid = self
            .auth
            .sid_for_auth()
            .ok_or_else(|| ClientError::Auth("no sid".to_string()))?;
        let pair = self.auth.authenticate_with_sid(&sid).await?;
        store.set_tokens(
            Some(&pair.access_token),
            pair.refresh_token.as_deref(),
            Some(&sid),
        );
        info!("re-authenticated with sid after 401");
        Ok(pair.access_token)
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    fn bump_attempts(&self) -> u32 {
        match self.state.lock() {
            Ok(mut state) => {
                state.unauthorized_attempts += 1;
                state.unauthorized_attempts
            }
            Err(_) => MAX_UNAUTHORIZED_ATTEMPTS,
        }
    }

    fn reset_attempts(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.unauthorized_attempts = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::CredentialStore;

    #[test]
    fn api_request_builders() {
        let req = ApiRequest::get("http://localhost/api/chat/history/").query("chat-id", "7");
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query, vec![("chat-id".to_string(), "7".to_string())]);
        assert!(req.body.is_none());

        let req = ApiRequest::post("http://localhost/api/chat/agent/", serde_json::json!({"x": 1}));
        assert_eq!(req.method, Method::POST);
        assert!(req.body.is_some());
    }

    #[tokio::test]
    async fn missing_credentials_with_dashboard_short_circuits() {
        let auth = AuthService::new(Client::new(), "http://127.0.0.1:9", CredentialStore::in_memory())
            .with_dashboard_url(Some("https://dashboard.example.com".to_string()));
        let client = AuthClient::new(Client::new(), auth);

        let err = client
            .send(&ApiRequest::get("http://127.0.0.1:9/api/chat/token/"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::ReauthRequired { ref redirect_url } if redirect_url == "https://dashboard.example.com"
        ));
        assert_eq!(client.unauthorized_attempts(), 0);
    }
}
