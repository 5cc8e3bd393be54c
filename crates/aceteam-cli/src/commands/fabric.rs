//! `aceteam fabric` — credentials and node discovery for remote execution.
//!
//! Provides:
//!   - `aceteam fabric login --api-key <KEY> [--url <URL>]` — save credentials
//!   - `aceteam fabric discover [--capability <TAG>]` — list available nodes
//!   - `aceteam fabric status` — per-node load

use aceteam_core::config::{config_path, load_config, save_config};
use aceteam_core::{FabricClient, FabricNode};
use console::style;

use super::{CommandError, CommandResult};

pub fn login(api_key: &str, url: Option<&str>) -> CommandResult {
    if api_key.trim().is_empty() {
        return Err(CommandError::new("API key must not be empty"));
    }
    let mut config = load_config()?;
    config.fabric.api_key = Some(api_key.trim().to_string());
    if let Some(url) = url {
        config.fabric.api_url = Some(url.trim_end_matches('/').to_string());
    }
    save_config(&config)?;
    println!(
        "{} Fabric credentials saved to {}",
        style("✓").green(),
        config_path().display()
    );
    Ok(())
}

pub async fn discover(capability: Option<&str>) -> CommandResult {
    let client = FabricClient::from_config(&load_config()?)?;
    let nodes = client.discover(capability).await?;
    if nodes.is_empty() {
        match capability {
            Some(tag) => println!("No Fabric nodes advertise '{}'", tag),
            None => println!("No Fabric nodes available"),
        }
        return Ok(());
    }
    print_nodes(&nodes);
    Ok(())
}

pub async fn status() -> CommandResult {
    let client = FabricClient::from_config(&load_config()?)?;
    let nodes = client.status().await?;
    println!("Fabric: {}", client.base_url());
    print_nodes(&nodes);
    Ok(())
}

fn print_nodes(nodes: &[FabricNode]) {
    for node in nodes {
        println!("{}", format_node(node));
    }
}

pub fn format_node(node: &FabricNode) -> String {
    let mut line = match &node.name {
        Some(name) if name != &node.id => format!("{} ({})", style(&node.id).bold(), name),
        _ => style(&node.id).bold().to_string(),
    };
    if let Some(load) = node.load {
        line.push_str(&format!("  load {:.0}%", load * 100.0));
    }
    if !node.capabilities.is_empty() {
        line.push_str(&format!("  [{}]", node.capabilities.join(", ")));
    }
    line
}
