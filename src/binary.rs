use anyhow::{Context, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How to reach the external generation tool.
///
/// The tool is used through two command forms: a version check that needs no
/// input, and a chat mode that reads a prompt on stdin and answers on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub chat_args: Vec<String>,
    pub version_args: Vec<String>,
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            chat_args: vec!["codex".into(), "chat".into(), "--json".into()],
            version_args: vec!["codex".into(), "--version".into()],
        }
    }
}

impl ToolCommand {
    /// Chat-mode command with all three standard streams piped.
    pub fn chat(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.chat_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Runs the version command and returns its trimmed stdout.
    ///
    /// Fails on spawn errors, non-zero exit, or when `timeout` elapses. The
    /// child is killed if the wait is abandoned.
    pub async fn version(&self, timeout: Duration) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.version_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, output)
            .await
            .with_context(|| format!("Version check timed out after {:?}", timeout))?
            .with_context(|| format!("Failed to execute {}", self.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Version check failed ({}): {}", output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Human readable chat command line, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.chat_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
