//! Per-session state: balance display, cached login token and chat transcript.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Shown until a balance has been fetched.
pub const BALANCE_PLACEHOLDER: &str = "Balance: not loaded";
/// Shown after a failed balance fetch.
pub const BALANCE_ERROR: &str = "Balance: unavailable";

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Bot => write!(f, "bot"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only chat log. Insertion order is display order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Record one completed exchange.
    pub fn push_exchange(&mut self, user: &str, bot: &str) {
        self.push(Speaker::User, user);
        self.push(Speaker::Bot, bot);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    LoggedOut,
    LoggedIn,
}

/// Balance display plus the token used to read it.
#[derive(Debug, Clone)]
pub struct BalanceSession {
    display: String,
    token: Option<String>,
    pub balance_url: String,
    pub login_url: String,
}

impl BalanceSession {
    pub fn new(balance_url: impl Into<String>, login_url: impl Into<String>) -> Self {
        Self {
            display: BALANCE_PLACEHOLDER.to_string(),
            token: None,
            balance_url: balance_url.into(),
            login_url: login_url.into(),
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn state(&self) -> LoginState {
        if self.token.is_some() {
            LoginState::LoggedIn
        } else {
            LoginState::LoggedOut
        }
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Store a freshly fetched figure, replacing whatever was shown.
    pub fn set_formatted(&mut self, formatted: &str) {
        self.display = format!("Balance: {formatted}");
    }

    pub fn set_error(&mut self) {
        self.display = BALANCE_ERROR.to_string();
    }
}

/// Everything one interactive session owns.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub balance: BalanceSession,
    pub transcript: Transcript,
}

impl Session {
    pub fn new(balance_url: impl Into<String>, login_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            balance: BalanceSession::new(balance_url, login_url),
            transcript: Transcript::default(),
        }
    }
}
