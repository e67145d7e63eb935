pub mod admin;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::util::http;

/// Body of an HTTP answer: parsed JSON when the text parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }
}

/// Status code and body of one call, shown to the user unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as display text: pretty JSON or the raw string.
    pub fn body_text(&self) -> String {
        match &self.body {
            ResponseBody::Json(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
            ResponseBody::Text(t) => t.clone(),
        }
    }
}

impl std::fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        write!(f, "{}", self.body_text())
    }
}

/// Headers carrying `Authorization: Bearer <token>`.
pub fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token.trim()))?,
    );
    Ok(headers)
}

/// Thin wrapper over reqwest that turns every answer into an [`ApiResponse`].
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: Client,
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new(http::client().clone())
    }
}

impl HttpAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send one request. Transport failures propagate; any HTTP status is a result.
    pub async fn call(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!("-> {} ({} bytes)", status, text.len());

        Ok(ApiResponse {
            status,
            body: ResponseBody::from_text(text),
        })
    }
}
