use clap::{Parser, Subcommand};
use codex_bridge::{BridgeConfig, BridgeManager, Result, ToolArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codex-bridge")]
#[command(about = "OpenAI-compatible chat completions backed by an external CLI tool")]
struct Cli {
    #[command(flatten)]
    tool: ToolArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the OpenAI-compatible API server
    Serve {
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,
    },
    /// Check once whether the generation tool can be run
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let manager = BridgeManager::new(BridgeConfig::from(cli.tool));

    match cli.command {
        Commands::Serve { port } => manager.serve(port).await?,
        Commands::Probe => {
            if manager.probe().await {
                let version = manager.availability().version().unwrap_or_default();
                println!("available: {}", version);
            } else {
                println!("unavailable: {}", manager.config().tool.display());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
