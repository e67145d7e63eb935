//! User and key management against the proxy admin API.
//!
//! Every action turns into exactly one request. Responses are not interpreted:
//! the caller gets the status code and body as the server sent them.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;

use super::{bearer_headers, ApiResponse, HttpAdapter};
use crate::config::ConnectionConfig;
use crate::error::{DeskError, Result};
use crate::util::{is_filled, join_url};

/// Team every new user is enrolled in.
pub const DEFAULT_TEAM_ID: &str = "46f41e55-1133-40e9-9687-bd8197f2d957";
pub const USER_ROLE: &str = "internal_user";
pub const BUDGET_DURATION: &str = "30d";

/// One admin form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    CheckUser {
        user_id: String,
    },
    CreateUser {
        user_id: String,
        user_alias: String,
        max_budget: f64,
    },
    ListKeys {
        user_id: String,
    },
    GenerateKey {
        user_id: String,
        key_alias: String,
        max_budget: f64,
    },
    DisableKey {
        key: String,
    },
    DeleteKey {
        key: String,
    },
}

/// A fully built request, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl AdminAction {
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::CheckUser { .. } => "check user",
            AdminAction::CreateUser { .. } => "create user",
            AdminAction::ListKeys { .. } => "list keys",
            AdminAction::GenerateKey { .. } => "generate key",
            AdminAction::DisableKey { .. } => "disable key",
            AdminAction::DeleteKey { .. } => "delete key",
        }
    }

    /// The free-text field that must be filled before the action may fire.
    fn required_field(&self) -> (&'static str, &str) {
        match self {
            AdminAction::CheckUser { user_id }
            | AdminAction::CreateUser { user_id, .. }
            | AdminAction::ListKeys { user_id }
            | AdminAction::GenerateKey { user_id, .. } => ("user_id", user_id),
            AdminAction::DisableKey { key } | AdminAction::DeleteKey { key } => ("key", key),
        }
    }

    /// Build the request. Fails without side effects when the required field is empty.
    pub fn build(&self) -> Result<AdminRequest> {
        let (field, value) = self.required_field();
        if !is_filled(value) {
            return Err(DeskError::MissingField(field));
        }

        let request = match self {
            AdminAction::CheckUser { user_id } => AdminRequest {
                method: Method::GET,
                path: format!("/user/info?user_id={}", urlencoding::encode(user_id.trim())),
                body: None,
            },
            AdminAction::CreateUser {
                user_id,
                user_alias,
                max_budget,
            } => AdminRequest {
                method: Method::POST,
                path: "/user/new".to_string(),
                body: Some(json!({
                    "user_email": user_id,
                    "user_id": user_id,
                    "user_alias": user_alias,
                    "user_role": USER_ROLE,
                    "teams": [DEFAULT_TEAM_ID],
                    "max_budget": max_budget,
                    "budget_duration": BUDGET_DURATION,
                })),
            },
            AdminAction::ListKeys { user_id } => AdminRequest {
                method: Method::GET,
                path: format!("/key/list?user_id={}", urlencoding::encode(user_id.trim())),
                body: None,
            },
            AdminAction::GenerateKey {
                user_id,
                key_alias,
                max_budget,
            } => AdminRequest {
                method: Method::POST,
                path: "/key/generate".to_string(),
                body: Some(json!({
                    "user_id": user_id,
                    "key_alias": key_alias,
                    "max_budget": max_budget,
                })),
            },
            AdminAction::DisableKey { key } => AdminRequest {
                method: Method::PATCH,
                path: "/key/disable".to_string(),
                body: Some(json!({ "key": key })),
            },
            AdminAction::DeleteKey { key } => AdminRequest {
                method: Method::POST,
                path: "/key/delete".to_string(),
                body: Some(json!({ "key": key })),
            },
        };
        Ok(request)
    }
}

/// Sends admin actions to one proxy with one admin token.
pub struct AdminClient<'a> {
    http: &'a HttpAdapter,
    connection: &'a ConnectionConfig,
}

impl<'a> AdminClient<'a> {
    pub fn new(http: &'a HttpAdapter, connection: &'a ConnectionConfig) -> Self {
        Self { http, connection }
    }

    pub async fn execute(&self, action: &AdminAction) -> Result<ApiResponse> {
        let request = action.build()?;
        let url = join_url(&self.connection.base_url, &request.path);
        let headers = bearer_headers(&self.connection.auth_token)?;

        info!(action = action.name(), "{} {}", request.method, request.path);
        self.http
            .call(request.method, &url, headers, request.body.as_ref())
            .await
    }
}
