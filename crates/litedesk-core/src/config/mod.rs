use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::balance::DEFAULT_USER_AGENT;
use crate::error::ConfigError;

/// Root configuration for litedesk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub chat: ChatConfig,
    pub balance: BalanceConfig,
    pub admin: AdminDefaults,
}

impl Config {
    /// Update a single setting by name, as typed in the dashboard.
    /// Returns the canonical name of the field that changed.
    pub fn set(&mut self, field: &str, value: &str) -> Result<&'static str, ConfigError> {
        let value = value.trim().to_string();
        let canonical = match field.to_ascii_lowercase().replace('-', "_").as_str() {
            "base_url" => {
                self.connection.base_url = value;
                "base_url"
            }
            "api_token" | "auth_token" => {
                self.connection.auth_token = value;
                "api_token"
            }
            "model" | "model_name" => {
                self.chat.model = value;
                "model"
            }
            "balance_url" => {
                self.balance.balance_url = value;
                "balance_url"
            }
            "login_url" => {
                self.balance.login_url = value;
                "login_url"
            }
            "username" | "login_user" => {
                self.balance.username = value;
                "username"
            }
            "password" | "login_pass" => {
                self.balance.password = value;
                "password"
            }
            "token" | "balance_token" => {
                self.balance.token = if value.is_empty() { None } else { Some(value) };
                "token"
            }
            "user_agent" => {
                self.balance.user_agent = value;
                "user_agent"
            }
            other => return Err(ConfigError::UnknownField(other.to_string())),
        };
        Ok(canonical)
    }
}

/// Admin API endpoint and its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub auth_token: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            auth_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatConfig {
    pub model: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceConfig {
    pub balance_url: String,
    pub login_url: String,
    pub username: String,
    pub password: String,
    /// Token cached from an earlier login.
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            balance_url: String::new(),
            login_url: String::new(),
            username: String::new(),
            password: String::new(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Prefilled values for the admin forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminDefaults {
    pub user_budget: f64,
    pub key_alias: String,
    pub key_budget: f64,
}

impl Default for AdminDefaults {
    fn default() -> Self {
        Self {
            user_budget: 10.0,
            key_alias: "default-key".to_string(),
            key_budget: 5.0,
        }
    }
}

// ====== Config loading ======

/// Load configuration from environment variables.
///
/// Priority:
/// 1. `LITEDESK_CONFIG` env var, a full JSON config
/// 2. File fallback (`~/.litedesk/config.json` or `config_path`)
/// 3. Individual env vars merged on top
pub fn load_config_from_env(config_path: Option<&Path>) -> Config {
    if let Ok(json) = std::env::var("LITEDESK_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Failed to parse LITEDESK_CONFIG: {}", e);
            }
        }
    }

    let mut cfg = load_config(config_path);
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    cfg
}

/// Overlay individual variables on top of `cfg`. Empty values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("BASE_URL") {
        cfg.connection.base_url = v;
    }
    if let Some(v) = var("API_TOKEN") {
        cfg.connection.auth_token = v;
    }
    if let Some(v) = var("MODEL_NAME") {
        cfg.chat.model = v;
    }
    if let Some(v) = var("BALANCE_URL") {
        cfg.balance.balance_url = v;
    }
    if let Some(v) = var("LOGIN_URL") {
        cfg.balance.login_url = v;
    }
    if let Some(v) = var("LOGIN_USER") {
        cfg.balance.username = v;
    }
    if let Some(v) = var("LOGIN_PASS") {
        cfg.balance.password = v;
    }
    if let Some(v) = var("BALANCE_TOKEN") {
        cfg.balance.token = Some(v);
    }
    if let Some(v) = var("BALANCE_USER_AGENT") {
        cfg.balance.user_agent = v;
    }
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".litedesk")
        .join("config.json")
}

/// Load configuration from file, or defaults when it is absent or broken.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if !path.exists() {
        return Config::default();
    }

    match read_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{} ({})", e, path.display());
            tracing::warn!("Using default configuration.");
            Config::default()
        }
    }
}

/// Read and parse a config file, reporting why it could not be used.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str::<Config>(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.connection.base_url, "http://localhost:4000");
        assert!(cfg.connection.auth_token.is_empty());
        assert_eq!(cfg.admin.user_budget, 10.0);
        assert_eq!(cfg.admin.key_alias, "default-key");
        assert_eq!(cfg.admin.key_budget, 5.0);
        assert!(cfg.balance.token.is_none());
        assert_eq!(cfg.balance.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_config_camelcase_compat() {
        let json = r#"{
            "connection": {
                "baseUrl": "https://proxy.example.com",
                "authToken": "sk-admin"
            },
            "balance": {
                "balanceUrl": "https://billing.example.com/me",
                "loginUrl": "https://billing.example.com/login"
            },
            "admin": { "keyBudget": 7.5 }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.connection.base_url, "https://proxy.example.com");
        assert_eq!(cfg.connection.auth_token, "sk-admin");
        assert_eq!(cfg.balance.balance_url, "https://billing.example.com/me");
        assert_eq!(cfg.admin.key_budget, 7.5);
        assert_eq!(cfg.admin.key_alias, "default-key");
        assert_eq!(cfg.chat.model, "gpt-4o-mini");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BASE_URL", "https://proxy.test"),
            ("API_TOKEN", "sk-env"),
            ("MODEL_NAME", "gpt-4o"),
            ("BALANCE_URL", "https://bal.test/me"),
            ("LOGIN_URL", "https://bal.test/login"),
            ("LOGIN_USER", "alice"),
            ("LOGIN_PASS", "s3cret"),
            ("BALANCE_TOKEN", "tok"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.connection.base_url, "https://proxy.test");
        assert_eq!(cfg.connection.auth_token, "sk-env");
        assert_eq!(cfg.chat.model, "gpt-4o");
        assert_eq!(cfg.balance.balance_url, "https://bal.test/me");
        assert_eq!(cfg.balance.login_url, "https://bal.test/login");
        assert_eq!(cfg.balance.username, "alice");
        assert_eq!(cfg.balance.password, "s3cret");
        assert_eq!(cfg.balance.token.as_deref(), Some("tok"));
        assert_eq!(cfg.balance.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_env_overrides_skip_empty() {
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, |k| (k == "BASE_URL").then(|| "  ".to_string()));
        assert_eq!(cfg.connection.base_url, "http://localhost:4000");
    }

    #[test]
    fn test_set_field() {
        let mut cfg = Config::default();
        assert_eq!(cfg.set("base-url", "https://x.test").unwrap(), "base_url");
        assert_eq!(cfg.set("MODEL", "gpt-4.1").unwrap(), "model");
        cfg.set("token", "abc").unwrap();
        assert_eq!(cfg.connection.base_url, "https://x.test");
        assert_eq!(cfg.chat.model, "gpt-4.1");
        assert_eq!(cfg.balance.token.as_deref(), Some("abc"));

        cfg.set("token", "").unwrap();
        assert!(cfg.balance.token.is_none());

        assert!(matches!(
            cfg.set("colour", "red"),
            Err(ConfigError::UnknownField(_))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"chat": {"model": "test-model"}}"#).unwrap();

        let loaded = load_config(Some(path.as_path()));
        assert_eq!(loaded.chat.model, "test-model");
    }

    #[test]
    fn test_load_config_missing_file() {
        let path = Path::new("/tmp/nonexistent_litedesk_test.json");
        let cfg = load_config(Some(path));
        assert_eq!(cfg.chat.model, "gpt-4o-mini");
        assert!(matches!(read_config(path), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_config_broken_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(read_config(&path), Err(ConfigError::Parse(_))));
        assert_eq!(load_config(Some(path.as_path())).chat.model, "gpt-4o-mini");
    }
}
