use clap::Args;
use std::time::Duration;

use crate::binary::ToolCommand;

/// Runtime settings shared by the server, the prober and the invoker.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub tool: ToolCommand,
    /// Model id reported in every completion response.
    pub model: String,
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
    pub invoke_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tool: ToolCommand::default(),
            model: "codex-cli".to_string(),
            probe_interval: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(15),
            invoke_timeout: Duration::from_secs(300),
        }
    }
}

/// Command-line / environment view of [`BridgeConfig`].
#[derive(Debug, Clone, Args)]
pub struct ToolArgs {
    /// Program used to reach the generation tool
    #[arg(long, env = "CODEX_BRIDGE_TOOL", default_value = "npx")]
    pub tool: String,

    /// Arguments for chat mode, whitespace separated
    #[arg(
        long,
        env = "CODEX_BRIDGE_CHAT_ARGS",
        default_value = "codex chat --json",
        value_delimiter = ' ',
        allow_hyphen_values = true
    )]
    pub chat_args: Vec<String>,

    /// Arguments for the version check, whitespace separated
    #[arg(
        long,
        env = "CODEX_BRIDGE_VERSION_ARGS",
        default_value = "codex --version",
        value_delimiter = ' ',
        allow_hyphen_values = true
    )]
    pub version_args: Vec<String>,

    /// Model id reported in responses
    #[arg(long, env = "CODEX_BRIDGE_MODEL", default_value = "codex-cli")]
    pub model: String,

    #[arg(long, env = "CODEX_BRIDGE_PROBE_INTERVAL_SECS", default_value_t = 300)]
    pub probe_interval_secs: u64,

    #[arg(long, env = "CODEX_BRIDGE_PROBE_TIMEOUT_SECS", default_value_t = 15)]
    pub probe_timeout_secs: u64,

    #[arg(long, env = "CODEX_BRIDGE_INVOKE_TIMEOUT_SECS", default_value_t = 300)]
    pub invoke_timeout_secs: u64,
}

impl From<ToolArgs> for BridgeConfig {
    fn from(args: ToolArgs) -> Self {
        let clean = |v: Vec<String>| v.into_iter().filter(|a| !a.is_empty()).collect();
        Self {
            tool: ToolCommand {
                program: args.tool,
                chat_args: clean(args.chat_args),
                version_args: clean(args.version_args),
            },
            model: args.model,
            // a zero interval would make tokio's interval panic
            probe_interval: Duration::from_secs(args.probe_interval_secs.max(1)),
            probe_timeout: Duration::from_secs(args.probe_timeout_secs),
            invoke_timeout: Duration::from_secs(args.invoke_timeout_secs),
        }
    }
}
