//! `aceteam validate` — check a workflow without running it.

use std::path::Path;

use aceteam_core::config::load_config;
use aceteam_core::runtime::resolve_runtime;
use aceteam_core::workflow::load_workflow;
use aceteam_core::{ExecutionResult, LocalExecutor};
use console::style;

use super::{print_json, CommandError, CommandResult};

/// Structural three-key check first, then the runtime's own validation.
pub async fn run(workflow_file: &Path) -> CommandResult {
    load_workflow(workflow_file)?;
    println!(
        "{} {} has input, output and nodes",
        style("✓").green(),
        workflow_file.display()
    );

    let config = load_config()?;
    let handle = resolve_runtime(&config).await?;
    let report = LocalExecutor::from_handle(&handle)
        .validate(workflow_file)
        .await?;
    check_report(&report)?;
    print_json(&report);
    Ok(())
}

/// The runtime reports problems as `{"success": false, ...}` or `{"valid": false, ...}`.
pub fn check_report(report: &serde_json::Value) -> Result<(), CommandError> {
    let rejected = report.get("success") == Some(&serde_json::Value::Bool(false))
        || report.get("valid") == Some(&serde_json::Value::Bool(false));
    if !rejected {
        return Ok(());
    }
    let text = ExecutionResult::from_value(report.clone())
        .map(|r| r.error_text())
        .unwrap_or_else(|| report.to_string());
    Err(CommandError {
        message: format!("Workflow is invalid: {}", text),
        suggestion: None,
    })
}
