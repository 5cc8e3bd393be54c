//! `aceteam run` — execute a workflow locally or on the Fabric.

use std::path::{Path, PathBuf};

use aceteam_core::config::load_config;
use aceteam_core::local::ProgressObserver;
use aceteam_core::runtime::resolve_runtime;
use aceteam_core::workflow::{load_workflow, parse_input_pairs};
use aceteam_core::{
    classify, ExecuteOptions, ExecutionResult, FabricClient, InputBindings, LocalExecutor,
    ProgressEvent,
};
use console::style;
use serde_json::Value;

use super::{print_json, CommandError, CommandResult};

pub struct RunArgs {
    pub workflow: PathBuf,
    pub inputs: Vec<String>,
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
    pub remote: bool,
}

pub async fn run(args: RunArgs) -> CommandResult {
    let workflow = load_workflow(&args.workflow)?;
    let inputs = parse_input_pairs(args.inputs.as_slice())?;
    let config = load_config()?;

    let result = if args.remote {
        let client = FabricClient::from_config(&config)?;
        println!(
            "{} Submitting {} to {}",
            style("→").cyan(),
            args.workflow.display(),
            client.base_url()
        );
        client.enqueue(&workflow, &inputs).await?
    } else {
        let handle = resolve_runtime(&config).await?;
        tracing::info!("[run] Using runtime {}", handle.path.display());
        let executor = LocalExecutor::from_handle(&handle);
        execute_local(
            &executor,
            &args.workflow,
            &inputs,
            args.config_path.as_deref(),
            args.verbose,
        )
        .await?
    };

    let output = finish(result)?;
    print_json(&output);
    Ok(())
}

/// Run through the local runtime, rendering progress lines as they arrive.
pub async fn execute_local(
    executor: &LocalExecutor,
    workflow: &Path,
    inputs: &InputBindings,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<ExecutionResult, CommandError> {
    let on_progress: ProgressObserver =
        Box::new(|event: &ProgressEvent| eprintln!("{}", render_progress(event)));
    let options = ExecuteOptions {
        verbose,
        config_path: config_path.map(Path::to_path_buf),
        on_progress: Some(on_progress),
    };
    Ok(executor.execute(workflow, inputs, options).await?)
}

/// Turn a finished execution into the output to print, or a classified error.
pub fn finish(result: ExecutionResult) -> Result<Value, CommandError> {
    if result.success {
        return Ok(Value::Object(result.output.unwrap_or_default()));
    }
    Err(classify(&result.error_text()).into())
}

pub fn render_progress(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Started { total_nodes } => format!(
            "{} Workflow started ({} node{})",
            style("▶").cyan(),
            total_nodes,
            if *total_nodes == 1 { "" } else { "s" }
        ),
        ProgressEvent::NodeRunning {
            node_name,
            current_index,
            total_nodes,
        } => format!(
            "{} {}",
            style(format!("[{}/{}]", current_index, total_nodes)).dim(),
            node_name
        ),
        ProgressEvent::NodeDone {
            node_name,
            current_index,
            total_nodes,
        } => format!(
            "{} {} {}",
            style(format!("[{}/{}]", current_index, total_nodes)).dim(),
            style("✓").green(),
            node_name
        ),
        ProgressEvent::NodeError { node_name, message } => {
            format!("{} {}: {}", style("✗").red(), node_name, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finish_success_prints_output_object() {
        let result = ExecutionResult::from_value(json!({
            "success": true,
            "output": {"response": "hi"}
        }))
        .unwrap();
        assert_eq!(finish(result).unwrap(), json!({"response": "hi"}));
    }

    #[test]
    fn test_finish_failure_is_classified() {
        let err = finish(ExecutionResult::failed(
            "Traceback (most recent call last):\nModuleNotFoundError: No module named 'aceteam_nodes'",
        ))
        .unwrap_err();
        assert_eq!(err.message, "Python module 'aceteam_nodes' is not installed");
        assert!(err.suggestion.unwrap().contains("aceteam init"));
    }

    #[test]
    fn test_render_progress_counts() {
        console::set_colors_enabled(false);
        let line = render_progress(&ProgressEvent::NodeRunning {
            node_name: "llm".to_string(),
            current_index: 2,
            total_nodes: 3,
        });
        assert_eq!(line, "[2/3] llm");
    }
}
