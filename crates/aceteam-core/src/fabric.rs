//! Fabric client: remote workflow execution over HTTP.
//!
//! Endpoints (relative to the configured base URL):
//!
//! | Operation  | Method | Path                         |
//! |------------|--------|------------------------------|
//! | `discover` | GET    | `/api/fabric/discover/nodes` |
//! | `status`   | GET    | `/api/fabric/nodes/load`     |
//! | `enqueue`  | POST   | `/api/fabric/call`           |
//!
//! Every request carries `Authorization: Bearer <key>` and runs inside
//! [`with_retry`] with the transient-error policy, so 429/502/503/504 and
//! transport failures are retried while other statuses fail immediately.

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{AceError, Result};
use crate::result::ExecutionResult;
use crate::retry::{is_transient_error, with_retry, RetryOptions};
use crate::workflow::InputBindings;

/// Service name embedded in API error messages.
pub const FABRIC_SERVICE: &str = "Fabric";

const DISCOVER_PATH: &str = "/api/fabric/discover/nodes";
const STATUS_PATH: &str = "/api/fabric/nodes/load";
const CALL_PATH: &str = "/api/fabric/call";

/// A compute node as reported by the Fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricNode {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<f64>,
    /// Fields this client does not interpret, kept for display.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct FabricClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    retry: RetryOptions,
}

impl FabricClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            retry: RetryOptions::default(),
        }
    }

    /// Build a client from the config file and `ACETEAM_API_*` overrides.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.fabric_api_key().ok_or_else(|| {
            AceError::Credentials("no API key in config or ACETEAM_API_KEY".to_string())
        })?;
        Ok(Self::new(&config.fabric_api_url(), api_key))
    }

    pub fn with_retry_options(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List nodes, optionally only those advertising `capability`.
    pub async fn discover(&self, capability: Option<&str>) -> Result<Vec<FabricNode>> {
        let query = capability.map(|c| ("capability", c));
        let value = self.request(Method::GET, DISCOVER_PATH, query, None).await?;
        parse_node_list(value)
    }

    /// Current load per node.
    pub async fn status(&self) -> Result<Vec<FabricNode>> {
        let value = self.request(Method::GET, STATUS_PATH, None, None).await?;
        parse_node_list(value)
    }

    /// Submit a workflow for remote execution and wait for its result.
    pub async fn enqueue(&self, workflow: &Value, inputs: &InputBindings) -> Result<ExecutionResult> {
        let body = serde_json::json!({
            "workflow": workflow,
            "input": inputs,
        });
        let value = self.request(Method::POST, CALL_PATH, None, Some(&body)).await?;
        Ok(ExecutionResult::from_value(value.clone()).unwrap_or_else(|| {
            ExecutionResult::failed(format!("Unexpected {} response: {}", FABRIC_SERVICE, value))
        }))
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<(&str, &str)>,
        body: Option<&Value>,
    ) -> Result<Value> {
        with_retry(&self.retry, is_transient_error, move || {
            self.send_once(method.clone(), path, query, body)
        })
        .await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        query: Option<(&str, &str)>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("[Fabric] {} {}", method, url);

        let mut req = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json");
        if let Some(pair) = query {
            req = req.query(&[pair]);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(describe_transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                text.trim().to_string()
            };
            return Err(AceError::Api {
                service: FABRIC_SERVICE,
                status: status.as_u16(),
                detail,
            });
        }

        let text = resp.text().await.map_err(describe_transport_error)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Map a reqwest failure onto the retry taxonomy. Only failures on the wire
/// become `Network` (transient); a URL that cannot even be built is a
/// configuration problem and fails on the first attempt.
///
/// reqwest's top-level message hides the cause ("error sending request"), so
/// the source chain is appended to keep DNS/connect failures recognizable.
fn describe_transport_error(err: reqwest::Error) -> AceError {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    if err.is_builder() {
        AceError::InvalidUrl(message)
    } else if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        AceError::Network(message)
    } else {
        AceError::Http(message)
    }
}

/// Accept either a bare array or `{"nodes": [...]}`.
fn parse_node_list(value: Value) -> Result<Vec<FabricNode>> {
    let list = match value {
        Value::Object(mut obj) => obj.remove("nodes").unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    Ok(serde_json::from_value(list)?)
}
