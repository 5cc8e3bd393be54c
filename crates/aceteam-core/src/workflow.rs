//! Workflow files and input bindings.
//!
//! Workflows are opaque JSON to this crate; the only structural check is the
//! presence of the top-level keys the runtime and the Fabric both require.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{AceError, Result};

/// Top-level keys every workflow definition must carry.
pub const REQUIRED_KEYS: &[&str] = &["input", "output", "nodes"];

/// Named workflow inputs. Keys are unique by construction.
pub type InputBindings = BTreeMap<String, String>;

/// Check the three-key shape of an in-memory workflow.
pub fn check_structure(workflow: &Value) -> Result<()> {
    let object = workflow
        .as_object()
        .ok_or_else(|| AceError::Workflow("expected a JSON object".to_string()))?;
    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|k| !object.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(AceError::Workflow(format!(
            "missing required key(s): {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Read and structurally check a workflow JSON file.
pub fn load_workflow(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AceError::Workflow(format!("{}: {}", path.display(), e)))?;
    let workflow: Value = serde_json::from_str(&content)
        .map_err(|e| AceError::Workflow(format!("{}: {}", path.display(), e)))?;
    check_structure(&workflow)?;
    Ok(workflow)
}

/// Parse `key=value` pairs. Values may contain `=`; duplicate keys are rejected.
pub fn parse_input_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<InputBindings> {
    let mut inputs = InputBindings::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            AceError::Workflow(format!("input '{}' is not in key=value form", pair))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AceError::Workflow(format!("input '{}' has an empty name", pair)));
        }
        if inputs.insert(key.to_string(), value.to_string()).is_some() {
            return Err(AceError::Workflow(format!("input '{}' given more than once", key)));
        }
    }
    Ok(inputs)
}
