//! AceTeam Core — run AI workflows locally or on the AceTeam Fabric.
//!
//! The crate has no terminal or CLI dependency. It provides:
//!
//! - `runtime` — locating a Python 3.12+ interpreter and provisioning the
//!   managed environment that holds `aceteam-nodes`
//! - `local` — the subprocess protocol (argv, progress on stderr, JSON result on stdout)
//! - `fabric` — the authenticated HTTP client for remote execution
//! - `retry` / `classify` — transient-error retry and user-facing error classification
//!
//! The `aceteam-cli` crate wires these into commands.

pub mod classify;
pub mod config;
pub mod error;
pub mod fabric;
pub mod local;
pub mod progress;
pub mod result;
pub mod retry;
pub mod runtime;
pub mod shell_env;
pub mod workflow;

#[cfg(all(test, unix))]
mod testing;

// Convenience re-exports
pub use classify::{classify, ClassifiedError, ErrorKind};
pub use config::Config;
pub use error::{AceError, Result};
pub use fabric::{FabricClient, FabricNode};
pub use local::{ExecuteOptions, LocalExecutor};
pub use progress::ProgressEvent;
pub use result::ExecutionResult;
pub use retry::{with_retry, RetryOptions};
pub use runtime::RuntimeHandle;
pub use workflow::InputBindings;
