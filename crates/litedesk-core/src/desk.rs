//! The session context every user action runs against.
//!
//! A `Desk` owns the current configuration and the session state. Each public
//! method is one submitted form: it reads state, makes its call and writes the
//! outcome back before returning. The only work that outlives a handler is the
//! deferred balance refresh after a chat turn, which runs as a spawned task
//! and is folded back into the session by [`Desk::wait_refresh`].

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::admin::{AdminAction, AdminClient};
use crate::api::{ApiResponse, HttpAdapter};
use crate::balance::{bare_token, BalanceClient, BALANCE_REFRESH_DELAY};
use crate::chat;
use crate::config::Config;
use crate::error::{BalanceError, DeskError, Result};
use crate::provider;
use crate::session::Session;
use crate::util::is_filled;

/// Formatted balance figure, or why it could not be read.
pub type BalanceOutcome = std::result::Result<String, BalanceError>;

pub struct Desk {
    config: Config,
    session: Session,
    http: HttpAdapter,
    refresh_delay: Duration,
    pending_refresh: Option<JoinHandle<BalanceOutcome>>,
}

impl Desk {
    pub fn new(config: Config) -> Self {
        let mut session = Session::new(
            config.balance.balance_url.clone(),
            config.balance.login_url.clone(),
        );
        let cached = config.balance.token.as_deref();
        if let Some(token) = cached.filter(|t| bare_token(t).is_some()) {
            session.balance.set_token(token);
        }

        Self {
            config,
            session,
            http: HttpAdapter::default(),
            refresh_delay: BALANCE_REFRESH_DELAY,
            pending_refresh: None,
        }
    }

    /// Override the pause before the post-chat balance refresh.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Change one setting and mirror it into the session where it lives there too.
    ///
    /// Changing the token or either billing URL drops a pending refresh, since
    /// its figure would belong to the old account or endpoint.
    pub fn set(&mut self, field: &str, value: &str) -> Result<&'static str> {
        let field = self.config.set(field, value)?;
        let balance = &mut self.session.balance;
        match field {
            "balance_url" => balance.balance_url = self.config.balance.balance_url.clone(),
            "login_url" => balance.login_url = self.config.balance.login_url.clone(),
            "token" => match self.config.balance.token.as_deref() {
                Some(token) if bare_token(token).is_some() => balance.set_token(token),
                _ => balance.clear_token(),
            },
            _ => return Ok(field),
        }
        self.cancel_refresh();
        Ok(field)
    }

    /// Session start: load the balance if a token is already cached.
    pub async fn start(&mut self) -> Option<BalanceOutcome> {
        self.session.balance.token()?;
        info!(session = %self.session.id, "Cached token found, loading balance");
        Some(self.refresh_balance().await)
    }

    /// Run one admin action and hand back the raw answer.
    pub async fn admin(&self, action: &AdminAction) -> Result<ApiResponse> {
        AdminClient::new(&self.http, &self.config.connection)
            .execute(action)
            .await
    }

    /// Log in and immediately load the balance.
    ///
    /// The outer error means the login failed and the session is unchanged.
    /// The inner result is the balance fetch that follows a successful login.
    pub async fn login(&mut self) -> Result<BalanceOutcome> {
        let creds = &self.config.balance;
        let login_url = &self.session.balance.login_url;
        if !is_filled(login_url) {
            return Err(DeskError::MissingField("login_url"));
        }
        if !is_filled(&creds.username) {
            return Err(DeskError::MissingField("username"));
        }
        if !is_filled(&creds.password) {
            return Err(DeskError::MissingField("password"));
        }

        let token = self
            .balance_client()
            .login(login_url, &creds.username, &creds.password)
            .await?;
        // A refresh queued for the previous account must not land on this one.
        self.cancel_refresh();
        self.session.balance.set_token(token);
        info!(session = %self.session.id, "Logged in");

        Ok(self.refresh_balance().await)
    }

    /// Fetch the balance now with the cached token.
    pub async fn refresh_balance(&mut self) -> BalanceOutcome {
        let Some(token) = self.session.balance.token().map(str::to_string) else {
            return Err(BalanceError::NotLoggedIn);
        };
        let result = self
            .balance_client()
            .fetch(&self.session.balance.balance_url, &token)
            .await;
        self.apply_balance(result)
    }

    /// Send one chat message, record the exchange and schedule a balance refresh.
    pub async fn send_chat(&mut self, message: &str) -> Result<String> {
        if !is_filled(message) {
            return Err(DeskError::MissingField("message"));
        }

        let connection = &self.config.connection;
        let provider = provider::create_provider(&connection.auth_token, &connection.base_url);
        let reply =
            chat::complete_single_turn(provider.as_ref(), &self.config.chat.model, message).await?;

        self.session.transcript.push_exchange(message, &reply);
        self.schedule_refresh();
        Ok(reply)
    }

    pub fn has_pending_refresh(&self) -> bool {
        self.pending_refresh.is_some()
    }

    /// Wait for the deferred refresh, if any, and store its outcome.
    /// Cancel-safe: dropping the future leaves the refresh pending.
    pub async fn wait_refresh(&mut self) -> Option<BalanceOutcome> {
        let handle = self.pending_refresh.as_mut()?;
        let joined = handle.await;
        self.pending_refresh = None;
        let result = joined.unwrap_or_else(|e| Err(BalanceError::Task(e.to_string())));
        Some(self.apply_balance(result))
    }

    /// Queue a balance fetch after the refresh delay. A newer refresh replaces an older one.
    fn schedule_refresh(&mut self) -> bool {
        let Some(token) = self.session.balance.token().map(str::to_string) else {
            return false;
        };
        self.cancel_refresh();

        let client = self.balance_client();
        let url = self.session.balance.balance_url.clone();
        let delay = self.refresh_delay;
        self.pending_refresh = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            client.fetch(&url, &token).await
        }));
        true
    }

    fn cancel_refresh(&mut self) {
        if let Some(handle) = self.pending_refresh.take() {
            handle.abort();
        }
    }

    fn apply_balance(&mut self, result: BalanceOutcome) -> BalanceOutcome {
        match result {
            Ok(formatted) => {
                self.session.balance.set_formatted(&formatted);
                Ok(self.session.balance.display().to_string())
            }
            Err(e) => {
                warn!(session = %self.session.id, "Balance fetch failed: {}", e);
                self.session.balance.set_error();
                Err(e)
            }
        }
    }

    fn balance_client(&self) -> BalanceClient {
        BalanceClient::new(self.http.client().clone(), &self.config.balance.user_agent)
    }
}

impl Drop for Desk {
    fn drop(&mut self) {
        self.cancel_refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{LoginState, BALANCE_PLACEHOLDER};

    #[test]
    fn test_new_desk_seeds_cached_token() {
        let mut cfg = Config::default();
        cfg.balance.token = Some("cached".into());
        let desk = Desk::new(cfg);
        assert_eq!(desk.session().balance.state(), LoginState::LoggedIn);
        assert_eq!(desk.session().balance.display(), BALANCE_PLACEHOLDER);
    }

    #[test]
    fn test_blank_cached_token_is_ignored() {
        let mut cfg = Config::default();
        cfg.balance.token = Some("  ".into());
        let desk = Desk::new(cfg);
        assert_eq!(desk.session().balance.state(), LoginState::LoggedOut);
    }

    #[test]
    fn test_set_mirrors_session_fields() {
        let mut desk = Desk::new(Config::default());
        desk.set("balance_url", "https://b.test/me").unwrap();
        desk.set("token", "t1").unwrap();
        assert_eq!(desk.session().balance.balance_url, "https://b.test/me");
        assert_eq!(desk.session().balance.token(), Some("t1"));

        desk.set("model", "gpt-4o").unwrap();
        assert_eq!(desk.session().balance.token(), Some("t1"));

        desk.set("token", "").unwrap();
        assert_eq!(desk.session().balance.state(), LoginState::LoggedOut);
        assert!(desk.set("nope", "x").is_err());
    }

    #[test]
    fn test_bare_bearer_token_is_ignored() {
        let mut cfg = Config::default();
        cfg.balance.token = Some("Bearer".into());
        let mut desk = Desk::new(cfg);
        assert_eq!(desk.session().balance.state(), LoginState::LoggedOut);

        desk.set("token", "bearer ").unwrap();
        assert_eq!(desk.session().balance.state(), LoginState::LoggedOut);
    }

    fn desk_with_parked_refresh() -> Desk {
        let mut cfg = Config::default();
        cfg.balance.token = Some("t1".into());
        cfg.balance.balance_url = "http://127.0.0.1:9/balance".into();
        let mut desk = Desk::new(cfg).with_refresh_delay(Duration::from_secs(3600));
        assert!(desk.schedule_refresh());
        assert!(desk.has_pending_refresh());
        desk
    }

    #[tokio::test]
    async fn test_account_changes_drop_pending_refresh() {
        for (field, value) in [
            ("token", ""),
            ("token", "t2"),
            ("balance_url", "http://127.0.0.1:9/other"),
            ("login_url", "http://127.0.0.1:9/login"),
        ] {
            let mut desk = desk_with_parked_refresh();
            desk.set(field, value).unwrap();
            assert!(!desk.has_pending_refresh(), "{field}={value:?}");
            assert!(desk.wait_refresh().await.is_none());
            assert_eq!(desk.session().balance.display(), BALANCE_PLACEHOLDER);
        }
    }

    #[tokio::test]
    async fn test_unrelated_setting_keeps_pending_refresh() {
        let mut desk = desk_with_parked_refresh();
        desk.set("model", "gpt-4o").unwrap();
        assert!(desk.has_pending_refresh());
    }

    #[tokio::test]
    async fn test_start_without_token_does_nothing() {
        let mut desk = Desk::new(Config::default());
        assert!(desk.start().await.is_none());
        assert!(matches!(
            desk.refresh_balance().await,
            Err(BalanceError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_rejected() {
        let mut desk = Desk::new(Config::default());
        let err = desk.send_chat("   ").await.unwrap_err();
        assert!(matches!(err, DeskError::MissingField("message")));
        assert!(desk.session().transcript.is_empty());
        assert!(!desk.has_pending_refresh());
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let mut cfg = Config::default();
        cfg.balance.login_url = "http://127.0.0.1:9/login".into();
        cfg.balance.username = "alice".into();
        let mut desk = Desk::new(cfg);
        let err = desk.login().await.unwrap_err();
        assert!(matches!(err, DeskError::MissingField("password")));
        assert_eq!(desk.session().balance.state(), LoginState::LoggedOut);
    }
}
