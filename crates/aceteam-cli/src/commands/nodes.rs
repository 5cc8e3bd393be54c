//! `aceteam list-nodes` — node types the installed runtime provides.

use aceteam_core::config::load_config;
use aceteam_core::runtime::resolve_runtime;
use aceteam_core::LocalExecutor;

use super::{print_json, CommandError, CommandResult};

pub async fn list() -> CommandResult {
    let config = load_config()?;
    let handle = resolve_runtime(&config).await?;
    let nodes = LocalExecutor::from_handle(&handle).list_nodes().await?;

    if nodes.get("success") == Some(&serde_json::Value::Bool(false)) {
        let raw = nodes
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("list-nodes failed");
        return Err(CommandError::from(aceteam_core::classify(raw)));
    }
    print_json(&nodes);
    Ok(())
}
