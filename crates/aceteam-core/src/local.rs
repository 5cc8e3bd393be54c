//! LocalExecutor — runs workflows through the Python runtime as a child process.
//!
//! Wire contract with the runtime:
//!   - invocation: `<python> -m aceteam_nodes.cli run <workflow> --input <json> --verbose [--config <path>]`
//!   - stdout: one JSON result object, written at or after exit; buffered in full
//!   - stderr: log output with progress lines (see [`crate::progress`]), read incrementally
//!
//! The exit code is advisory; success is decided by the output content alone.
//! Each call is a single attempt; retrying is the caller's decision.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::error::{AceError, Result};
use crate::progress::{ProgressEvent, ProgressTracker};
use crate::result::ExecutionResult;
use crate::runtime::RuntimeHandle;
use crate::workflow::InputBindings;

/// Entry module of the workflow runtime package.
pub const RUNTIME_MODULE: &str = "aceteam_nodes.cli";

/// Callback for parsed progress events.
pub type ProgressObserver = Box<dyn FnMut(&ProgressEvent) + Send>;

#[derive(Default)]
pub struct ExecuteOptions {
    /// Echo unrecognized runtime log lines to our stderr.
    pub verbose: bool,
    /// Passed to the runtime as `--config`.
    pub config_path: Option<PathBuf>,
    pub on_progress: Option<ProgressObserver>,
}

pub struct LocalExecutor {
    runtime: PathBuf,
}

impl LocalExecutor {
    pub fn new(runtime: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }

    pub fn from_handle(handle: &RuntimeHandle) -> Self {
        Self::new(handle.path.clone())
    }

    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    /// Arguments for the `run` subcommand. `--verbose` is always requested
    /// because progress is parsed from the verbose log stream.
    pub fn run_args(
        workflow: &Path,
        inputs: &InputBindings,
        config_path: Option<&Path>,
    ) -> Result<Vec<OsString>> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            RUNTIME_MODULE.into(),
            "run".into(),
            workflow.as_os_str().to_owned(),
            "--input".into(),
            serde_json::to_string(inputs)?.into(),
            "--verbose".into(),
        ];
        if let Some(config) = config_path {
            args.push("--config".into());
            args.push(config.as_os_str().to_owned());
        }
        Ok(args)
    }

    /// Run a workflow file to completion.
    ///
    /// Returns `Err` only when the runtime could not be started or its pipes
    /// failed; every outcome of a started process is an [`ExecutionResult`].
    pub async fn execute(
        &self,
        workflow: &Path,
        inputs: &InputBindings,
        mut options: ExecuteOptions,
    ) -> Result<ExecutionResult> {
        let args = Self::run_args(workflow, inputs, options.config_path.as_deref())?;

        tracing::info!(
            "[LocalExecutor] Running {} with {}",
            workflow.display(),
            self.runtime.display()
        );

        let mut child = tokio::process::Command::new(&self.runtime)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AceError::Spawn(format!("'{}': {}", self.runtime.display(), e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AceError::Spawn("No stdout on child process".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AceError::Spawn("No stderr on child process".to_string()))?;

        // stdout is only interpreted after exit, so drain it in the background
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });

        let diagnostics = pump_diagnostics(stderr, &mut options, &mut std::io::stderr()).await?;

        let status = child.wait().await?;
        let stdout_bytes = stdout_task
            .await
            .map_err(|e| AceError::Spawn(format!("stdout reader failed: {}", e)))??;

        tracing::debug!("[LocalExecutor] Runtime exited with {}", status);
        Ok(interpret_output(
            &String::from_utf8_lossy(&stdout_bytes),
            &diagnostics,
            status.code(),
        ))
    }

    /// `validate <workflow>` — the runtime's own structural check.
    pub async fn validate(&self, workflow: &Path) -> Result<Value> {
        self.run_json_command(&["validate".into(), workflow.as_os_str().to_owned()])
            .await
    }

    /// `list-nodes` — node types the installed runtime provides.
    pub async fn list_nodes(&self) -> Result<Value> {
        self.run_json_command(&["list-nodes".into()]).await
    }

    /// Run an auxiliary subcommand that prints one JSON object. Malformed
    /// output becomes `{"success": false, "error": <raw>}`.
    async fn run_json_command(&self, args: &[OsString]) -> Result<Value> {
        let output = tokio::process::Command::new(&self.runtime)
            .args(["-m", RUNTIME_MODULE])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AceError::Spawn(format!("'{}': {}", self.runtime.display(), e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match serde_json::from_str::<Value>(stdout.trim()) {
            Ok(value) if value.is_object() => Ok(value),
            _ => {
                let raw = if stdout.trim().is_empty() {
                    String::from_utf8_lossy(&output.stderr).trim().to_string()
                } else {
                    stdout.trim().to_string()
                };
                Ok(serde_json::json!({ "success": false, "error": raw }))
            }
        }
    }
}

/// Read the runtime's stderr to the end. Progress lines go to the observer;
/// with `verbose`, every other line is echoed verbatim to `echo`. Returns the
/// full diagnostic text.
async fn pump_diagnostics<R, W>(
    reader: R,
    options: &mut ExecuteOptions,
    echo: &mut W,
) -> Result<String>
where
    R: AsyncRead + Unpin + Send,
    W: Write + Send,
{
    let mut tracker = ProgressTracker::default();
    let mut diagnostics = String::new();
    let mut segments = BufReader::new(reader).split(b'\n');
    while let Some(segment) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&segment);
        let line = line.trim_end_matches('\r');
        match tracker.observe(line) {
            Some(event) => {
                tracing::debug!("[LocalExecutor] {:?}", event);
                if let Some(observer) = options.on_progress.as_mut() {
                    observer(&event);
                }
            }
            None if options.verbose => {
                // a closed terminal must not abort the run
                let _ = writeln!(echo, "{}", line);
            }
            None => {}
        }
        diagnostics.push_str(line);
        diagnostics.push('\n');
    }
    Ok(diagnostics)
}

/// Decide the result of a finished run from its two output channels.
///
/// 1. stdout holding a result object wins, whatever the exit code
/// 2. otherwise stderr: a result object, or else its raw text as the error,
///    preceded by any unparsable stdout
/// 3. otherwise non-JSON stdout as the error
/// 4. otherwise the exit code
pub fn interpret_output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> ExecutionResult {
    let stdout = stdout.trim();
    if let Some(result) = ExecutionResult::parse(stdout) {
        return result;
    }

    let stderr = stderr.trim();
    if !stderr.is_empty() {
        if let Some(result) = ExecutionResult::parse(stderr) {
            return result;
        }
        // stderr last, so the classifier's fallback still picks its final line
        if stdout.is_empty() {
            return ExecutionResult::failed(stderr);
        }
        return ExecutionResult::failed(format!("{}\n{}", stdout, stderr));
    }

    if !stdout.is_empty() {
        return ExecutionResult::failed(stdout);
    }

    match exit_code {
        Some(code) => ExecutionResult::failed(format!("Process exited with code {}", code)),
        None => ExecutionResult::failed("Process was terminated by a signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_args() {
        let mut inputs = InputBindings::new();
        inputs.insert("prompt".to_string(), "hi".to_string());
        let args = LocalExecutor::run_args(Path::new("flow.json"), &inputs, Some(Path::new("cfg.yaml")))
            .unwrap();
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(
            args,
            vec![
                "-m",
                "aceteam_nodes.cli",
                "run",
                "flow.json",
                "--input",
                r#"{"prompt":"hi"}"#,
                "--verbose",
                "--config",
                "cfg.yaml",
            ]
        );
    }

    #[test]
    fn test_interpret_prefers_stdout_result() {
        let result = interpret_output(
            r#"{"success":true,"output":{"response":"hi"}}"#,
            "Traceback: ignored",
            Some(1),
        );
        assert!(result.success);
    }

    #[test]
    fn test_interpret_structured_stderr() {
        let result = interpret_output("", r#"{"success":false,"error":"bad input"}"#, Some(1));
        assert_eq!(result.error.as_deref(), Some("bad input"));
    }

    #[test]
    fn test_interpret_raw_stderr() {
        let result = interpret_output("", "\n  RuntimeError: boom \n", Some(1));
        assert_eq!(serde_json::to_value(result).unwrap(), json!({"success": false, "error": "RuntimeError: boom"}));
    }

    #[test]
    fn test_interpret_garbage_stdout() {
        let result = interpret_output("not json", "", Some(0));
        assert_eq!(result.error.as_deref(), Some("not json"));
    }

    #[test]
    fn test_interpret_keeps_garbage_stdout_alongside_stderr() {
        let result = interpret_output(
            "partial output: not json",
            "Workflow started (1 nodes)\n[LLM] running",
            Some(1),
        );
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("partial output: not json\nWorkflow started (1 nodes)\n[LLM] running")
        );
    }

    #[tokio::test]
    async fn test_verbose_echoes_only_unrecognized_lines() {
        let stderr: &[u8] = b"Workflow started (1 nodes)\nloading model\r\n[LLM] running\n[LLM] done\n";
        let seen = std::sync::Arc::new(std::sync::Mutex::new(0usize));
        let counter = seen.clone();
        let mut options = ExecuteOptions {
            verbose: true,
            on_progress: Some(Box::new(move |_: &ProgressEvent| {
                *counter.lock().unwrap() += 1;
            })),
            ..ExecuteOptions::default()
        };
        let mut echo = Vec::new();

        let diagnostics = pump_diagnostics(stderr, &mut options, &mut echo).await.unwrap();

        assert_eq!(String::from_utf8(echo).unwrap(), "loading model\n");
        assert_eq!(*seen.lock().unwrap(), 3);
        assert_eq!(
            diagnostics,
            "Workflow started (1 nodes)\nloading model\n[LLM] running\n[LLM] done\n"
        );
    }

    #[tokio::test]
    async fn test_quiet_run_echoes_nothing() {
        let stderr: &[u8] = b"loading model\nstill loading\n";
        let mut options = ExecuteOptions::default();
        let mut echo = Vec::new();
        pump_diagnostics(stderr, &mut options, &mut echo).await.unwrap();
        assert!(echo.is_empty());
    }

    #[test]
    fn test_interpret_nothing() {
        let result = interpret_output("", "", Some(1));
        assert_eq!(
            serde_json::to_value(result).unwrap(),
            json!({"success": false, "error": "Process exited with code 1"})
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let executor = LocalExecutor::new("/nonexistent/python3");
        let err = executor
            .execute(Path::new("flow.json"), &InputBindings::new(), ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AceError::Spawn(_)));
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use crate::testing::fake_runtime;
        use serde_json::json;
        use std::sync::{Arc, Mutex};

        #[tokio::test]
        async fn test_success_result_from_stdout() {
            let dir = tempfile::tempdir().unwrap();
            let runtime = fake_runtime(
                dir.path(),
                "python",
                r#"echo '{"success":true,"output":{"response":"hi"}}'"#,
            );
            let result = LocalExecutor::new(runtime)
                .execute(Path::new("flow.json"), &InputBindings::new(), ExecuteOptions::default())
                .await
                .unwrap();
            assert_eq!(
                serde_json::to_value(result).unwrap(),
                json!({"success": true, "output": {"response": "hi"}})
            );
        }

        #[tokio::test]
        async fn test_silent_failure_reports_exit_code() {
            let dir = tempfile::tempdir().unwrap();
            let runtime = fake_runtime(dir.path(), "python", "exit 1");
            let result = LocalExecutor::new(runtime)
                .execute(Path::new("flow.json"), &InputBindings::new(), ExecuteOptions::default())
                .await
                .unwrap();
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("Process exited with code 1"));
        }

        #[tokio::test]
        async fn test_progress_events_forwarded() {
            let dir = tempfile::tempdir().unwrap();
            let runtime = fake_runtime(
                dir.path(),
                "python",
                r#"echo 'Workflow started (2 nodes)' >&2
echo 'loading provider' >&2
echo '[LLM] running' >&2
echo '[LLM] done' >&2
echo '[Format] running' >&2
echo '[Format] error: bad template' >&2
echo '{"success":false,"error":"bad template"}'
exit 1"#,
            );

            let events = Arc::new(Mutex::new(Vec::new()));
            let sink = events.clone();
            let options = ExecuteOptions {
                on_progress: Some(Box::new(move |e: &ProgressEvent| {
                    sink.lock().unwrap().push(e.clone())
                })),
                ..ExecuteOptions::default()
            };

            let result = LocalExecutor::new(runtime)
                .execute(Path::new("flow.json"), &InputBindings::new(), options)
                .await
                .unwrap();
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("bad template"));

            let events = events.lock().unwrap();
            assert_eq!(
                *events,
                vec![
                    ProgressEvent::Started { total_nodes: 2 },
                    ProgressEvent::NodeRunning {
                        node_name: "LLM".to_string(),
                        current_index: 1,
                        total_nodes: 2,
                    },
                    ProgressEvent::NodeDone {
                        node_name: "LLM".to_string(),
                        current_index: 1,
                        total_nodes: 2,
                    },
                    ProgressEvent::NodeRunning {
                        node_name: "Format".to_string(),
                        current_index: 2,
                        total_nodes: 2,
                    },
                    ProgressEvent::NodeError {
                        node_name: "Format".to_string(),
                        message: "bad template".to_string(),
                    },
                ]
            );
        }

        #[tokio::test]
        async fn test_traceback_on_stderr_becomes_error() {
            let dir = tempfile::tempdir().unwrap();
            let runtime = fake_runtime(
                dir.path(),
                "python",
                r#"echo 'Traceback (most recent call last):' >&2
echo "ModuleNotFoundError: No module named 'aceteam_nodes'" >&2
exit 1"#,
            );
            let result = LocalExecutor::new(runtime)
                .execute(Path::new("flow.json"), &InputBindings::new(), ExecuteOptions::default())
                .await
                .unwrap();
            assert!(!result.success);
            assert!(result.error_text().contains("No module named 'aceteam_nodes'"));
        }

        #[tokio::test]
        async fn test_arguments_reach_runtime() {
            let dir = tempfile::tempdir().unwrap();
            let argv_file = dir.path().join("argv.txt");
            let runtime = fake_runtime(
                dir.path(),
                "python",
                &format!(
                    "printf '%s\\n' \"$@\" > '{}'\necho '{{\"success\":true,\"output\":{{}}}}'",
                    argv_file.display()
                ),
            );
            let mut inputs = InputBindings::new();
            inputs.insert("name".to_string(), "Ada".to_string());
            let options = ExecuteOptions {
                config_path: Some(PathBuf::from("/etc/ac.yaml")),
                ..ExecuteOptions::default()
            };

            let result = LocalExecutor::new(runtime)
                .execute(Path::new("flow.json"), &inputs, options)
                .await
                .unwrap();
            assert!(result.success);

            let argv = std::fs::read_to_string(&argv_file).unwrap();
            let argv: Vec<&str> = argv.lines().collect();
            assert_eq!(
                argv,
                vec![
                    "-m",
                    "aceteam_nodes.cli",
                    "run",
                    "flow.json",
                    "--input",
                    r#"{"name":"Ada"}"#,
                    "--verbose",
                    "--config",
                    "/etc/ac.yaml",
                ]
            );
        }

        #[tokio::test]
        async fn test_auxiliary_command_malformed_output() {
            let dir = tempfile::tempdir().unwrap();
            let runtime = fake_runtime(dir.path(), "python", "echo 'usage: aceteam_nodes.cli'");
            let value = LocalExecutor::new(runtime).list_nodes().await.unwrap();
            assert_eq!(value, json!({"success": false, "error": "usage: aceteam_nodes.cli"}));
        }

        #[tokio::test]
        async fn test_auxiliary_command_json_output() {
            let dir = tempfile::tempdir().unwrap();
            let runtime = fake_runtime(
                dir.path(),
                "python",
                r#"echo '{"success":true,"nodes":[{"type":"LLM"}]}'"#,
            );
            let value = LocalExecutor::new(runtime)
                .validate(Path::new("flow.json"))
                .await
                .unwrap();
            assert_eq!(value["nodes"][0]["type"], "LLM");
        }
    }
}
