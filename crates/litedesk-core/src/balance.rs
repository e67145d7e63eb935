//! Login and balance lookup against the billing endpoint.
//!
//! Login trades a username/password for a bearer token; the token is then
//! used to read a preformatted balance figure.

use std::time::Duration;

use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONNECTION, USER_AGENT,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::BalanceError;
use crate::util::http;

/// Pause before re-reading the balance after a chat completion, so the
/// usage ledger has caught up.
pub const BALANCE_REFRESH_DELAY: Duration = Duration::from_secs(3);

/// Browser-like User-Agent the billing endpoint is known to accept.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Paths searched for a token in a login response, first match wins.
const TOKEN_PATHS: &[&[&str]] = &[
    &["accessToken"],
    &["token"],
    &["data", "token"],
    &["data", "access_token"],
];

/// Strip any `Bearer ` prefix. `None` when no credential is left.
pub fn bare_token(token: &str) -> Option<&str> {
    let token = token.trim();
    let bare = if token.eq_ignore_ascii_case("bearer") {
        ""
    } else {
        match token.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => token[7..].trim_start(),
            _ => token,
        }
    };
    (!bare.is_empty()).then_some(bare)
}

/// Ensure the token carries the `Bearer ` prefix exactly once.
pub fn normalize_bearer(token: &str) -> Option<String> {
    bare_token(token).map(|bare| format!("Bearer {bare}"))
}

/// Find the token in a login response.
pub fn extract_token(body: &Value) -> Option<String> {
    TOKEN_PATHS.iter().find_map(|path| {
        let value = path.iter().try_fold(body, |v, key| v.get(key))?;
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    })
}

/// Pull `balance.formatted` out of a balance response.
pub fn extract_formatted_balance(body: &Value) -> Option<String> {
    match body.get("balance")?.get("formatted")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Client for the login and balance endpoints.
#[derive(Debug, Clone)]
pub struct BalanceClient {
    client: Client,
    user_agent: String,
}

impl BalanceClient {
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self::new(http::client().clone(), user_agent)
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(
        &self,
        login_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, BalanceError> {
        debug!("Login request to {} as {}", login_url, username);

        let response = self
            .client
            .post(login_url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!("Login rejected with {}", status);
            return Err(BalanceError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|_| BalanceError::TokenNotFound)?;
        let token = extract_token(&body)
            .filter(|t| bare_token(t).is_some())
            .ok_or(BalanceError::TokenNotFound)?;
        info!("Login succeeded for {}", username);
        Ok(token)
    }

    /// Fetch the formatted balance for `token`.
    pub async fn fetch(&self, balance_url: &str, token: &str) -> Result<String, BalanceError> {
        debug!("Balance request to {}", balance_url);

        let response = self
            .client
            .get(balance_url)
            .headers(self.headers(token)?)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(BalanceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|_| BalanceError::MissingBalance)?;
        extract_formatted_balance(&body).ok_or(BalanceError::MissingBalance)
    }

    fn headers(&self, token: &str) -> Result<HeaderMap, BalanceError> {
        let mut headers = HeaderMap::new();
        let bearer = normalize_bearer(token).ok_or(BalanceError::NotLoggedIn)?;
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer)?);
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        Ok(headers)
    }
}
