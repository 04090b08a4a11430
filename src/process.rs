use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::binary::ToolCommand;
use crate::error::InvocationError;

/// What a finished tool process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the generation tool once per prompt.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    tool: ToolCommand,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(tool: ToolCommand, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    /// Spawns the chat command, writes `prompt` plus a newline to its stdin,
    /// closes stdin and waits for exit while collecting stdout and stderr.
    ///
    /// A non-zero exit is still `Ok`; only spawn failures, I/O failures and
    /// the timeout are errors. The child is killed when the timeout fires or
    /// when the returned future is dropped (client went away).
    pub async fn invoke(&self, prompt: &str) -> Result<InvocationResult, InvocationError> {
        tracing::debug!(command = %self.tool.display(), prompt_length = prompt.len(), "Spawning generation tool");

        let mut child = self.tool.chat().spawn().map_err(|source| InvocationError::Spawn {
            program: self.tool.program.clone(),
            source,
        })?;

        let mut stdin = child.stdin.take();
        let input = format!("{}\n", prompt);
        let feed = async move {
            if let Some(stdin) = stdin.as_mut() {
                stdin.write_all(input.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            // dropping stdin closes the pipe
            drop(stdin);
            Ok::<(), std::io::Error>(())
        };

        let run = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            if let Err(e) = fed {
                // the tool may exit without reading its input; its exit status decides
                tracing::debug!(error = %e, "Failed to write prompt to tool stdin");
            }
            output
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| InvocationError::Timeout(self.timeout))??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("tool stderr: {}", stderr.trim());
        }

        let result = InvocationResult {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        };

        tracing::debug!(
            exit_code = ?result.exit_code,
            stdout_length = result.stdout.len(),
            "Generation tool finished"
        );

        Ok(result)
    }
}
