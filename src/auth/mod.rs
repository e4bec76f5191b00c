// ABOUTME: Authentication module: credential storage, SID discovery, token exchange, and
// ABOUTME: the bearer-token fetch wrapper used by every backend call.

pub mod fetch;
pub mod service;
pub mod sid;
pub mod store;

pub use fetch::{ApiRequest, AuthClient, MAX_UNAUTHORIZED_ATTEMPTS};
pub use service::{AuthOutcome, AuthService, TokenPair};
pub use sid::sid_from_url;
pub use store::CredentialStore;
