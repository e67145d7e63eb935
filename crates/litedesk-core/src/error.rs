use std::path::PathBuf;

/// Core error types for litedesk.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Field '{0}' must not be empty")]
    MissingField(&'static str),

    #[error("Balance error: {0}")]
    Balance(#[from] BalanceError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown setting: {0}")]
    UnknownField(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid token header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Login rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Token not found in login response")]
    TokenNotFound,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Balance endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response has no balance.formatted field")]
    MissingBalance,

    #[error("Balance refresh task failed: {0}")]
    Task(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Api { status: Option<u16>, message: String },

    #[error("Unexpected error: {0}")]
    Other(String),
}

impl ChatError {
    /// Classify a non-success HTTP answer from a chat endpoint.
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 401 {
            ChatError::Auth(message)
        } else {
            ChatError::Api {
                status: Some(status),
                message,
            }
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return ChatError::Other(e.to_string());
        }
        match e.status() {
            Some(status) => ChatError::from_status(status.as_u16(), e.to_string()),
            None => ChatError::Api {
                status: None,
                message: e.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
