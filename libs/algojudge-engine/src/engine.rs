/// Execution Sandbox - Runs One Invocation of Submitted Code
///
/// **Core Responsibility:**
/// Bind a test input to the submission's entry point, invoke it once, and
/// return the raw result together with the post-call arguments.
///
/// **Architectural Boundary:**
/// - The sandbox knows HOW to execute (which runtime, which process)
/// - It does NOT judge correctness; that is the evaluator's job
/// - It does NOT know about reference solutions or constraints
///
/// **Isolation:**
/// `NodeSandbox` spawns a fresh runtime process per invocation, so no state
/// leaks between test cases. The process is killed when the wall-clock
/// timeout expires or the run is cancelled.
///
/// **Pass-by-reference contract:**
/// Arguments are handed to the callable positionally, in input declaration
/// order. In-place problems mutate those argument objects; the harness
/// serializes them after the call and `RunOutput::args` rebinds them to
/// their names, so the judge observes exactly what the callable wrote.
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RuntimeConfig;
use crate::context::RunContext;
use crate::error::ExecutionError;
use crate::input::{parse_input, ParsedInput};
use crate::source;

/// Safety limits applied before any process is spawned
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

pub const RESULT_MARKER: &str = "__ALGOJUDGE_RESULT__";
const MARKER_ENV: &str = "ALGOJUDGE_RESULT_MARKER";
const HARNESS: &str = include_str!("harness.js");

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Return value; `undefined` arrives as `null`.
    pub result: Value,
    /// `String(result)` when the value has no JSON form (`Infinity`, `NaN`,
    /// bigint, symbol, function); `result` is then `null`.
    pub display: Option<String>,
    /// Arguments as they stood after the call returned.
    pub args: ParsedInput,
    pub func_name: String,
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Runs `code` against one test input. Console output produced by the
    /// call is appended to `ctx`.
    async fn run_code(
        &self,
        code: &str,
        input: &str,
        ctx: &mut RunContext,
    ) -> Result<RunOutput, ExecutionError>;
}

/// Reply written by the harness.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Sandbox backed by a Node.js child process per invocation.
#[derive(Debug, Clone)]
pub struct NodeSandbox {
    command: String,
    args: Vec<String>,
    timeout_ms: u64,
}

impl NodeSandbox {
    pub fn new(runtime: &RuntimeConfig) -> Self {
        Self {
            command: runtime.command.clone(),
            args: runtime.args.clone(),
            timeout_ms: runtime.timeout_ms,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Checks that the runtime can be launched at all.
    pub async fn probe(&self) -> Result<String, ExecutionError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn launch_error(&self, err: std::io::Error) -> ExecutionError {
        ExecutionError::Launch {
            command: self.command.clone(),
            reason: err.to_string(),
        }
    }

    async fn invoke(
        &self,
        payload: Vec<u8>,
        timeout_ms: u64,
        ctx: &RunContext,
    ) -> Result<std::process::Output, ExecutionError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg("-e")
            .arg(HARNESS)
            .env(MARKER_ENV, RESULT_MARKER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExecutionError::Protocol("runtime stdin unavailable".to_string()))?;

        // Dropping this future drops the child, and kill_on_drop terminates it.
        let exchange = async move {
            if let Err(e) = stdin.write_all(&payload).await {
                debug!(error = %e, "runtime closed stdin early");
            }
            drop(stdin);
            child.wait_with_output().await
        };

        let cancel = ctx.cancel.clone();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
            outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), exchange) => outcome,
        };

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ExecutionError::Protocol(format!(
                "failed to collect runtime output: {}",
                e
            ))),
            Err(_) => {
                warn!(run_id = %ctx.run_id, timeout_ms, "execution timed out, killing runtime");
                Err(ExecutionError::TimeLimitExceeded { timeout_ms })
            }
        }
    }
}

#[async_trait]
impl Sandbox for NodeSandbox {
    #[tracing::instrument(skip(self, code, input, ctx), fields(run_id = %ctx.run_id))]
    async fn run_code(
        &self,
        code: &str,
        input: &str,
        ctx: &mut RunContext,
    ) -> Result<RunOutput, ExecutionError> {
        // GUARDRAIL: reject pathological sizes before spawning anything
        if code.len() > MAX_SOURCE_CODE_BYTES {
            return Err(ExecutionError::SourceTooLarge {
                limit: MAX_SOURCE_CODE_BYTES,
            });
        }
        if input.len() > MAX_TEST_INPUT_BYTES {
            return Err(ExecutionError::InputTooLarge {
                limit: MAX_TEST_INPUT_BYTES,
            });
        }
        if ctx.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let program = source::analyze(code)?;
        let func_name = program.entry.callable_name().to_string();
        let parsed = parse_input(input);

        let payload = serde_json::to_vec(&json!({
            "source": program.source,
            "entry": program.entry,
            "args": parsed.args(),
        }))
        .map_err(|e| ExecutionError::Protocol(format!("failed to encode payload: {}", e)))?;

        let timeout_ms = ctx.timeout_ms().unwrap_or(self.timeout_ms);
        let start_time = Instant::now();
        let output = self.invoke(payload, timeout_ms, ctx).await?;
        let execution_ms = start_time.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let envelope = match read_envelope(&stdout) {
            Some(envelope) => envelope?,
            None => {
                let detail = stderr
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("runtime exited with {} and no result", output.status)
                    });
                return Err(ExecutionError::Protocol(detail));
            }
        };

        debug!(func_name = %func_name, execution_ms, ok = envelope.ok, "invocation finished");
        ctx.extend(envelope.logs);

        if !envelope.ok {
            return Err(ExecutionError::Runtime(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(RunOutput {
            result: envelope.result,
            display: envelope.display,
            args: ParsedInput::from_parts(parsed.names(), envelope.args),
            func_name,
        })
    }
}

/// Finds the last marker line on stdout; anything the submission printed
/// directly to stdout before it is ignored.
fn read_envelope(stdout: &str) -> Option<Result<Envelope, ExecutionError>> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(RESULT_MARKER))?;
    Some(
        serde_json::from_str(line)
            .map_err(|e| ExecutionError::Protocol(format!("malformed result envelope: {}", e))),
    )
}
