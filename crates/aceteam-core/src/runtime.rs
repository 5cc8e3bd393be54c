//! Python runtime discovery and provisioning.
//!
//! Workflows execute inside the `aceteam_nodes` Python package, so every local
//! command needs an interpreter that (a) is Python 3.12+ and (b) can import
//! that package.
//!
//! Resolution priority ([`resolve_runtime`]):
//!   1. `python_path` from the config file, if it exists and has the package
//!   2. the managed environment at `venv_dir`, if valid and has the package
//!   3. PATH discovery ([`locate`]), installing the package on demand
//!
//! Nothing here is cached; each command invocation re-resolves from scratch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AceError, Result};
use crate::shell_env;

/// Import name of the workflow runtime package.
pub const DEPENDENCY_MODULE: &str = "aceteam_nodes";
/// Distribution name passed to pip.
pub const DEPENDENCY_PACKAGE: &str = "aceteam-nodes";

pub const REQUIRED_MAJOR: u32 = 3;
pub const REQUIRED_MINOR: u32 = 12;

/// Interpreter names searched on PATH, most specific first.
pub const PYTHON_CANDIDATES: &[&str] = &["python3.13", "python3.12", "python3", "python"];

// ─── Version ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+\s+(\d+)\.(\d+)\.(\d+)").unwrap())
}

impl RuntimeVersion {
    /// Parse `"Name X.Y.Z"`-shaped output, e.g. `Python 3.12.4`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = version_re().captures(text)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
        })
    }

    pub fn is_supported(&self) -> bool {
        self.major == REQUIRED_MAJOR && self.minor >= REQUIRED_MINOR
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ─── Handle ────────────────────────────────────────────────────────────────

/// An interpreter that can run workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeHandle {
    pub path: PathBuf,
    pub version: Option<RuntimeVersion>,
}

/// Run `{path} --version` and parse the result. Never fails; `None` means the
/// binary could not be run or printed something unexpected.
pub async fn probe_version(path: &Path) -> Option<RuntimeVersion> {
    let output = tokio::process::Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    // Python 2 prints its version on stderr
    let combined = String::from_utf8_lossy(&output.stdout).to_string()
        + &String::from_utf8_lossy(&output.stderr);
    RuntimeVersion::parse(combined.trim())
}

/// Search PATH for a supported interpreter.
pub async fn locate() -> Option<RuntimeHandle> {
    locate_in(&shell_env::search_dirs()).await
}

/// Like [`locate`], over an explicit directory list.
pub async fn locate_in(dirs: &[PathBuf]) -> Option<RuntimeHandle> {
    for name in PYTHON_CANDIDATES {
        let Some(path) = shell_env::which_in(name, dirs) else {
            continue;
        };
        match probe_version(&path).await {
            Some(version) if version.is_supported() => {
                tracing::debug!("[Runtime] Found {} ({})", path.display(), version);
                return Some(RuntimeHandle {
                    path,
                    version: Some(version),
                });
            }
            Some(version) => {
                tracing::debug!(
                    "[Runtime] Skipping {} ({} < {}.{})",
                    path.display(),
                    version,
                    REQUIRED_MAJOR,
                    REQUIRED_MINOR
                );
            }
            None => tracing::debug!("[Runtime] Could not probe {}", path.display()),
        }
    }
    None
}

// ─── Managed environment ───────────────────────────────────────────────────

/// Interpreter location inside a virtual environment directory.
pub fn environment_runtime_path(dir: &Path) -> PathBuf {
    if cfg!(windows) {
        dir.join("Scripts").join("python.exe")
    } else {
        dir.join("bin").join("python")
    }
}

/// A venv is considered valid iff its interpreter exists; nothing deeper is checked.
pub fn is_environment_valid(dir: &Path) -> bool {
    environment_runtime_path(dir).exists()
}

/// An isolated virtual environment owned by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedEnvironment {
    directory: PathBuf,
}

impl ManagedEnvironment {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn runtime_path(&self) -> PathBuf {
        environment_runtime_path(&self.directory)
    }

    pub fn is_valid(&self) -> bool {
        is_environment_valid(&self.directory)
    }

    /// `{base} -m venv {dir}`. Blocking; any failure is returned, never retried.
    pub fn create(base: &Path, dir: &Path) -> Result<Self> {
        tracing::info!(
            "[Runtime] Creating environment at {} using {}",
            dir.display(),
            base.display()
        );
        let output = std::process::Command::new(base)
            .args(["-m", "venv"])
            .arg(dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| AceError::Install(format!("failed to run {}: {}", base.display(), e)))?;

        if !output.status.success() {
            return Err(AceError::Install(format!(
                "`{} -m venv {}` failed: {}",
                base.display(),
                dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(Self::new(dir))
    }
}

// ─── Dependency ────────────────────────────────────────────────────────────

/// True iff `runtime` can import the workflow package.
pub async fn is_dependency_installed(runtime: &Path) -> bool {
    tokio::process::Command::new(runtime)
        .args(["-c", &format!("import {}", DEPENDENCY_MODULE)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// `pip install` the workflow package. pip's output goes straight to the terminal.
pub async fn install_dependency(runtime: &Path) -> Result<()> {
    tracing::info!(
        "[Runtime] Installing {} into {}",
        DEPENDENCY_PACKAGE,
        runtime.display()
    );
    let status = tokio::process::Command::new(runtime)
        .args(["-m", "pip", "install", "--upgrade", DEPENDENCY_PACKAGE])
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| AceError::Install(format!("failed to run {}: {}", runtime.display(), e)))?;

    if !status.success() {
        return Err(AceError::Install(format!(
            "pip install {} exited with {}",
            DEPENDENCY_PACKAGE, status
        )));
    }
    Ok(())
}

// ─── Resolution ────────────────────────────────────────────────────────────

async fn handle_for(path: PathBuf) -> RuntimeHandle {
    let version = probe_version(&path).await;
    RuntimeHandle { path, version }
}

/// Pick the interpreter for this invocation. See the module docs for the order.
pub async fn resolve_runtime(config: &Config) -> Result<RuntimeHandle> {
    if let Some(path) = &config.python_path {
        if path.exists() && is_dependency_installed(path).await {
            return Ok(handle_for(path.clone()).await);
        }
        tracing::warn!(
            "[Runtime] Configured python_path {} is unusable, falling back",
            path.display()
        );
    }

    if let Some(dir) = &config.venv_dir {
        let env = ManagedEnvironment::new(dir);
        if env.is_valid() && is_dependency_installed(&env.runtime_path()).await {
            return Ok(handle_for(env.runtime_path()).await);
        }
        tracing::warn!(
            "[Runtime] Managed environment {} is missing or incomplete",
            dir.display()
        );
    }

    let handle = locate().await.ok_or_else(|| {
        AceError::RuntimeNotFound(format!(
            "none of {} on PATH is Python {}.{}+",
            PYTHON_CANDIDATES.join(", "),
            REQUIRED_MAJOR,
            REQUIRED_MINOR
        ))
    })?;

    if !is_dependency_installed(&handle.path).await {
        install_dependency(&handle.path).await?;
    }
    Ok(handle)
}

/// Create (or repair) the managed environment at `dir` and install the
/// workflow package into it.
pub async fn provision(dir: &Path) -> Result<RuntimeHandle> {
    let env = ManagedEnvironment::new(dir);

    if !env.is_valid() {
        let base = locate().await.ok_or_else(|| {
            AceError::RuntimeNotFound(format!(
                "need Python {}.{}+ to create {}",
                REQUIRED_MAJOR,
                REQUIRED_MINOR,
                dir.display()
            ))
        })?;
        let base_path = base.path.clone();
        let target = dir.to_path_buf();
        tokio::task::spawn_blocking(move || ManagedEnvironment::create(&base_path, &target))
            .await
            .map_err(|e| AceError::Install(format!("environment task panicked: {}", e)))??;
    }

    let runtime = env.runtime_path();
    if !is_dependency_installed(&runtime).await {
        install_dependency(&runtime).await?;
    }
    Ok(handle_for(runtime).await)
}
