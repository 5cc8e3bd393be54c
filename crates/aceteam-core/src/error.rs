//! Core error type for the AceTeam CLI.
//!
//! `AceError` is used throughout the core (runtime discovery, local and
//! remote execution, configuration). Fatal variants carry enough context for
//! the command layer to print a one-line remediation via [`AceError::suggestion`].

#[derive(Debug, thiserror::Error)]
pub enum AceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid workflow: {0}")]
    Workflow(String),

    #[error("No suitable Python runtime found: {0}")]
    RuntimeNotFound(String),

    #[error("Failed to install dependencies: {0}")]
    Install(String),

    #[error("Failed to start runtime: {0}")]
    Spawn(String),

    #[error("Fabric credentials missing: {0}")]
    Credentials(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid Fabric URL: {0}")]
    InvalidUrl(String),

    /// A response that arrived but could not be used (bad body, redirect loop).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-2xx HTTP response. The rendered form `"<service> API error (<status>): <detail>"`
    /// is what the transient-error policy inspects for retryable status codes.
    #[error("{service} API error ({status}): {detail}")]
    Api {
        service: &'static str,
        status: u16,
        detail: String,
    },
}

impl AceError {
    /// A one-line remediation hint for fatal command paths.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AceError::RuntimeNotFound(_) => Some(format!(
                "Install Python {}.{}+ and run `aceteam init`",
                crate::runtime::REQUIRED_MAJOR,
                crate::runtime::REQUIRED_MINOR,
            )),
            AceError::Install(_) => {
                Some("Run `aceteam init` to recreate the Python environment".to_string())
            }
            AceError::Spawn(_) => {
                Some("Check `python_path` in your config or run `aceteam init`".to_string())
            }
            AceError::Credentials(_) => Some(
                "Run `aceteam fabric login --api-key <KEY>` or set ACETEAM_API_KEY".to_string(),
            ),
            AceError::Network(_) => Some("Check your internet connection".to_string()),
            AceError::InvalidUrl(_) => Some(
                "Set fabric.api_url (or ACETEAM_API_URL) to a full http(s):// URL".to_string(),
            ),
            AceError::Api { status: 401, .. } | AceError::Api { status: 403, .. } => {
                Some("Run `aceteam fabric login --api-key <KEY>` to update credentials".to_string())
            }
            AceError::Config(_) => Some(format!(
                "Check {}",
                crate::config::config_path().display()
            )),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AceError>;
