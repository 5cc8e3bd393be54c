//! Uniform outcome of a local or remote workflow execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,

    /// Output name → value; present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,

    /// Structured per-field errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,

    /// Free-text diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(output: Map<String, Value>) -> Self {
        Self {
            success: true,
            output: Some(output),
            errors: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            errors: None,
            error: Some(error.into()),
        }
    }

    /// Accept a JSON value only if it is an object with a boolean `success`.
    /// Such an object with ill-typed fields is still a result, reported as a
    /// failure naming the problem.
    pub fn from_value(value: Value) -> Option<Self> {
        let has_success = value
            .as_object()
            .and_then(|o| o.get("success"))
            .map(Value::is_boolean)
            .unwrap_or(false);
        if !has_success {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(result) => Some(result),
            Err(e) => Some(Self::failed(format!("Malformed workflow result ({}): {}", e, value))),
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str::<Value>(text.trim())
            .ok()
            .and_then(Self::from_value)
    }

    /// Diagnostic text for classification and display.
    pub fn error_text(&self) -> String {
        if let Some(error) = self.error.as_deref().filter(|e| !e.trim().is_empty()) {
            return error.to_string();
        }
        match &self.errors {
            Some(Value::Object(fields)) if !fields.is_empty() => fields
                .iter()
                .map(|(field, detail)| match detail {
                    Value::String(s) => format!("{}: {}", field, s),
                    other => format!("{}: {}", field, other),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Some(other) if !other.is_null() => other.to_string(),
            _ => "Workflow failed without an error message".to_string(),
        }
    }
}
