//! Error classification — turns raw runtime diagnostics (usually a Python
//! traceback on stderr) into a short user-facing message plus an optional
//! remediation hint.
//!
//! Rules are checked in order and the first match wins; some markers are
//! substrings of others (`429` appears in plenty of unrelated text), so the
//! order is significant.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::runtime::DEPENDENCY_MODULE;

const INIT_COMMAND: &str = "aceteam init";
const MAX_FALLBACK_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingDependency,
    Authentication,
    Validation,
    Connection,
    NotFound,
    Timeout,
    RateLimited,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, message: impl Into<String>, suggestion: Option<&str>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
        }
    }
}

fn module_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ModuleNotFoundError: No module named '([^']+)'").unwrap())
}

fn api_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)api[ _-]?key[^\n]*(required|incorrect|invalid|missing|not set|not provided)")
            .unwrap()
    })
}

fn detail_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {2}\S").unwrap())
}

fn type_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\[type=[^\]]*\]").unwrap())
}

fn missing_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)no such file or directory:\s*'([^'\n]+)'|not found:\s*'?([^'\s]+)'?")
            .unwrap()
    })
}

/// Classify raw diagnostic text. Never fails and never returns an empty message.
pub fn classify(raw: &str) -> ClassifiedError {
    let lower = raw.to_lowercase();

    // 1. Missing Python module
    if let Some(caps) = module_re().captures(raw) {
        let module = &caps[1];
        let root = module.split('.').next().unwrap_or(module);
        if root == DEPENDENCY_MODULE {
            return ClassifiedError::new(
                ErrorKind::MissingDependency,
                format!("Python module '{}' is not installed", module),
                Some(&format!("Run `{}` to set up the Python environment", INIT_COMMAND)),
            );
        }
        return ClassifiedError::new(
            ErrorKind::MissingDependency,
            format!("Missing Python module '{}'", module),
            Some(&format!("Run `{}` to reinstall dependencies", INIT_COMMAND)),
        );
    }

    // 2. Authentication
    if raw.contains("AuthenticationError")
        || raw.contains("401 Unauthorized")
        || api_key_re().is_match(raw)
    {
        return ClassifiedError::new(
            ErrorKind::Authentication,
            "Authentication failed: the LLM provider rejected or did not receive an API key",
            Some("Set OPENAI_API_KEY, ANTHROPIC_API_KEY or GOOGLE_API_KEY in your environment"),
        );
    }

    // 3. Structured field validation
    if raw.contains("ValidationError") && lower.contains("validation error") {
        let fields = extract_validation_fields(raw);
        let message = if fields.is_empty() {
            "Input validation failed".to_string()
        } else {
            let bullets: Vec<String> = fields.iter().map(|f| format!("  - {}", f)).collect();
            format!("Input validation failed:\n{}", bullets.join("\n"))
        };
        return ClassifiedError::new(
            ErrorKind::Validation,
            message,
            Some("Check the --input values against the workflow's declared inputs"),
        );
    }

    // 4. Connection
    if raw.contains("ConnectionError")
        || raw.contains("ConnectError")
        || raw.contains("ECONNREFUSED")
        || lower.contains("connection refused")
        || lower.contains("failed to establish a new connection")
    {
        return ClassifiedError::new(
            ErrorKind::Connection,
            "Could not connect to the LLM provider",
            Some("Check your internet connection and proxy settings"),
        );
    }

    // 5. Missing file
    if raw.contains("FileNotFoundError")
        || raw.contains("ENOENT")
        || lower.contains("no such file or directory")
    {
        let path = missing_file_re()
            .captures(raw)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string());
        let message = match path {
            Some(p) => format!("File not found: {}", p),
            None => "File not found".to_string(),
        };
        return ClassifiedError::new(
            ErrorKind::NotFound,
            message,
            Some("Check that the file path is correct"),
        );
    }

    // 6. Timeout
    if raw.contains("TimeoutError") || lower.contains("timed out") || lower.contains("timeout") {
        return ClassifiedError::new(
            ErrorKind::Timeout,
            "The request timed out",
            Some("Try again; the provider may be under heavy load"),
        );
    }

    // 7. Rate limit
    if raw.contains("RateLimitError") || lower.contains("rate limit") || raw.contains("429") {
        return ClassifiedError::new(
            ErrorKind::RateLimited,
            "Rate limited by the LLM provider",
            Some("Wait a minute and try again"),
        );
    }

    // 8. Fallback: last meaningful line of the traceback
    ClassifiedError::new(ErrorKind::Unclassified, last_meaningful_line(raw), None)
}

/// Pairs of `field` / `  detail` lines from a pydantic-style validation report.
fn extract_validation_fields(raw: &str) -> Vec<String> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut fields = Vec::new();
    let mut i = 0;
    while i + 1 < lines.len() {
        let field = lines[i];
        let detail = lines[i + 1];
        let is_field = !field.trim().is_empty()
            && !field.starts_with(char::is_whitespace)
            && !field.contains("ValidationError")
            && !field.contains("validation error");
        if is_field && detail_line_re().is_match(detail) {
            let detail = type_tag_re().replace_all(detail.trim(), "");
            fields.push(format!("{}: {}", field.trim(), detail.trim()));
            i += 2;
        } else {
            i += 1;
        }
    }
    fields
}

fn is_traceback_noise(line: &str) -> bool {
    line.starts_with("Traceback")
        || line.starts_with("File \"")
        || line.starts_with('^')
        || line.starts_with('~')
        || line.to_lowercase().contains("during handling")
}

fn last_meaningful_line(raw: &str) -> String {
    let meaningful = raw
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !is_traceback_noise(line));
    if let Some(line) = meaningful {
        return line.to_string();
    }
    let trimmed: String = raw.trim().chars().take(MAX_FALLBACK_CHARS).collect();
    if trimmed.is_empty() {
        "Workflow execution failed with no error output".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_runtime_package() {
        let raw = "Traceback (most recent call last):\n  File \"<string>\", line 1\nModuleNotFoundError: No module named 'aceteam_nodes'";
        let err = classify(raw);
        assert_eq!(err.kind, ErrorKind::MissingDependency);
        assert!(err.message.contains("aceteam_nodes"));
        assert!(err.suggestion.unwrap().contains("aceteam init"));
    }

    #[test]
    fn test_missing_other_module() {
        let err = classify("ModuleNotFoundError: No module named 'httpx'");
        assert!(err.message.contains("httpx"));
        assert!(err.suggestion.unwrap().contains("reinstall"));
    }

    #[test]
    fn test_authentication() {
        let err = classify("openai.AuthenticationError: Error code: 401 - Incorrect API key provided");
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(err.suggestion.unwrap().contains("OPENAI_API_KEY"));

        let err = classify("ValueError: API key is required for provider anthropic");
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn test_validation_fields_extracted() {
        let raw = "pydantic_core._pydantic_core.ValidationError: 2 validation errors for LLMInput\n\
prompt\n  Field required [type=missing, input_value={}, input_type=dict]\n    For further information visit https://errors.pydantic.dev/2.5/v/missing\n\
temperature\n  Input should be a valid number [type=float_parsing, input_value='hot', input_type=str]";
        let err = classify(raw);
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("- prompt: Field required"));
        assert!(err.message.contains("- temperature: Input should be a valid number"));
        assert!(!err.message.contains("[type="));
        assert!(!err.message.contains("For further information"));
    }

    #[test]
    fn test_validation_without_fields() {
        let err = classify("ValidationError: 1 validation error for Workflow");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "Input validation failed");
    }

    #[test]
    fn test_connection() {
        let err = classify("httpx.ConnectError: [Errno 111] Connection refused");
        assert_eq!(err.kind, ErrorKind::Connection);
    }

    #[test]
    fn test_file_not_found_extracts_path() {
        let err = classify("FileNotFoundError: [Errno 2] No such file or directory: 'flows/missing.json'");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "File not found: flows/missing.json");
    }

    #[test]
    fn test_timeout_before_rate_limit() {
        let err = classify("httpx.ReadTimeout: timed out after 429 seconds");
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_rate_limit() {
        let err = classify("openai.RateLimitError: Error code: 429");
        assert_eq!(err.kind, ErrorKind::RateLimited);
        let err = classify("HTTP 429 Too Many Requests");
        assert_eq!(err.kind, ErrorKind::RateLimited);
    }

    #[test]
    fn test_fallback_strips_traceback() {
        let raw = "Traceback (most recent call last):\n  File \"run.py\", line 3, in <module>\n    main()\n    ^^^^^^\nRuntimeError: node graph has a cycle\n";
        let err = classify(raw);
        assert_eq!(err.kind, ErrorKind::Unclassified);
        assert_eq!(err.message, "RuntimeError: node graph has a cycle");
        assert!(err.suggestion.is_none());
    }

    #[test]
    fn test_empty_input() {
        let err = classify("");
        assert!(!err.message.is_empty());
        let err = classify("   \n\n");
        assert!(!err.message.is_empty());
    }
}
