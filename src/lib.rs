//! codex-bridge: an OpenAI-compatible chat completion endpoint backed by an
//! external command-line generation tool.
//!
//! This library provides:
//! - Background availability probing of the tool
//! - Prompt flattening from role-tagged messages
//! - One-shot subprocess invocation with timeout and kill-on-drop
//! - Normalization of JSON or plain-text tool output into the canonical
//!   chat completion shape, with a labelled simulated fallback
//! - The HTTP router (`/health`, `/status`, `/v1/chat/completions`, `/v1/models`)
//!
//! # Example
//!
//! ```no_run
//! use codex_bridge::{BridgeConfig, BridgeManager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = BridgeManager::new(BridgeConfig::default());
//!     manager.serve(8080).await?;
//!     Ok(())
//! }
//! ```

pub mod availability;
pub mod binary;
pub mod config;
pub mod error;
pub mod manager;
pub mod normalize;
pub mod process;
pub mod prompt;
pub mod server;
pub mod types;

// Re-export main types for library users
pub use availability::{Availability, AvailabilityStatus};
pub use binary::ToolCommand;
pub use config::{BridgeConfig, ToolArgs};
pub use error::{ApiError, InvocationError};
pub use manager::BridgeManager;
pub use normalize::{Normalizer, Outcome, SimulationReason, ToolOutput};
pub use process::{InvocationResult, ToolInvoker};
pub use server::{create_router, AppState};
pub use types::{ChatCompletionRequest, ChatCompletionResponse, Message};

pub type Result<T> = std::result::Result<T, anyhow::Error>;
