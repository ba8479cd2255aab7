// Source-to-JavaScript transpilation ahead of execution
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{LanguageConfigManager, TranspileCommand};
use crate::error::CompileError;

#[async_trait]
pub trait Transpiler: Send + Sync {
    /// Returns executable JavaScript for `source` written in `language`.
    /// Gives up as soon as `cancel` fires.
    async fn transpile(
        &self,
        source: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CompileError>;
}

/// Transpiler driven by the `transpile` entries of languages.json.
#[derive(Debug, Clone)]
pub struct ConfiguredTranspiler {
    languages: Arc<LanguageConfigManager>,
}

impl ConfiguredTranspiler {
    pub fn new(languages: Arc<LanguageConfigManager>) -> Self {
        Self { languages }
    }
}

#[async_trait]
impl Transpiler for ConfiguredTranspiler {
    async fn transpile(
        &self,
        source: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CompileError> {
        let config = self
            .languages
            .get_config(language)
            .map_err(|_| CompileError::new(format!("Unsupported language: {}", language)))?;

        match &config.transpile {
            None => Ok(source.to_string()),
            Some(command) => {
                debug!(
                    language = %config.name,
                    command = %command.command,
                    "transpiling submission"
                );
                run_transpile_command(command, source, cancel).await
            }
        }
    }
}

async fn run_transpile_command(
    command: &TranspileCommand,
    source: &str,
    cancel: &CancellationToken,
) -> Result<String, CompileError> {
    if cancel.is_cancelled() {
        return Err(CompileError::new("Cancelled"));
    }

    let mut child = Command::new(&command.command)
        .args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            CompileError::new(format!("failed to launch `{}`: {}", command.command, e))
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| CompileError::new("transpiler stdin unavailable"))?;
    let input = source.as_bytes().to_vec();

    // A transpiler that exits early closes the pipe; its exit status and
    // stderr carry the real diagnosis.
    let feed = async move {
        if let Err(e) = stdin.write_all(&input).await {
            debug!(error = %e, "transpiler closed stdin early");
        }
        drop(stdin);
    };

    // stdin is written while stdout and stderr are drained. Dropping this
    // future drops the child, and kill_on_drop terminates it.
    let exchange = async move {
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        output
    };

    let timeout_ms = command.timeout_ms;
    let outcome = tokio::select! {
        _ = cancel.cancelled() => return Err(CompileError::new("Cancelled")),
        outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), exchange) => outcome,
    };

    let output = match outcome {
        Ok(output) => output
            .map_err(|e| CompileError::new(format!("transpiler did not finish: {}", e)))?,
        Err(_) => {
            warn!(command = %command.command, timeout_ms, "transpiler timed out, killing it");
            return Err(CompileError::new(format!(
                "transpiler did not finish within {}ms",
                timeout_ms
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CompileError::new(if stderr.is_empty() {
            format!("transpiler exited with {}", output.status)
        } else {
            stderr
        }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
