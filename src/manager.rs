use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::availability::{spawn_prober, Availability};
use crate::config::BridgeConfig;
use crate::normalize::{Normalizer, Outcome, SimulationReason};
use crate::process::ToolInvoker;
use crate::prompt;
use crate::server::{create_router, AppState};
use crate::types::{ChatCompletionResponse, Message};

/// Owns the availability state and drives one request through
/// format → invoke → normalize.
#[derive(Debug, Clone)]
pub struct BridgeManager {
    config: BridgeConfig,
    availability: Arc<Availability>,
    invoker: ToolInvoker,
    normalizer: Normalizer,
}

impl BridgeManager {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_availability(config, Arc::new(Availability::new()))
    }

    /// Uses an existing flag instead of a fresh, unavailable one.
    pub fn with_availability(config: BridgeConfig, availability: Arc<Availability>) -> Self {
        let invoker = ToolInvoker::new(config.tool.clone(), config.invoke_timeout);
        let normalizer = Normalizer::new(config.model.clone());
        Self {
            config,
            availability,
            invoker,
            normalizer,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn availability(&self) -> &Arc<Availability> {
        &self.availability
    }

    pub fn model(&self) -> &str {
        self.normalizer.model()
    }

    /// Probes the tool once and updates the shared flag.
    pub async fn probe(&self) -> bool {
        self.availability
            .probe(&self.config.tool, self.config.probe_timeout)
            .await
    }

    /// Runs the tool if it is available, otherwise skips straight to the
    /// simulated outcome. Never fails.
    pub async fn run_completion(&self, prompt: &str) -> Outcome {
        if !self.availability.is_available() {
            tracing::info!("Generation tool unavailable, simulating response");
            return Outcome::Simulated(SimulationReason::Unavailable);
        }

        Outcome::from_invocation(self.invoker.invoke(prompt).await)
    }

    /// Formats `messages`, runs the pipeline and builds the response. Also
    /// returns the outcome so callers can inspect the raw tool output.
    pub async fn complete(&self, messages: &[Message]) -> (ChatCompletionResponse, Outcome) {
        let prompt = prompt::format(messages);
        tracing::debug!(prompt_length = prompt.len(), "Built prompt from messages");
        tracing::trace!(prompt = %prompt, "Full prompt text");

        let outcome = self.run_completion(&prompt).await;
        let simulated = matches!(outcome, Outcome::Simulated(_));
        let response = self.normalizer.respond(&prompt, outcome.clone());

        tracing::info!(id = %response.id, simulated, "Completion ready");
        (response, outcome)
    }

    /// Binds `0.0.0.0:port` and serves until Ctrl-C.
    pub async fn serve(&self, port: u16) -> Result<()> {
        tracing::info!("Starting server on port {}", port);

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
            .await
            .context("Failed to bind to port")?;

        self.serve_listener(listener, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down");
            }
        })
        .await
    }

    /// Probes once, starts the background prober and serves HTTP on
    /// `listener` until `signal` resolves.
    pub async fn serve_listener<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.probe().await {
            tracing::warn!(
                command = %self.config.tool.display(),
                "Generation tool not available at startup, responses will be simulated"
            );
        }

        let shutdown = CancellationToken::new();
        let prober = spawn_prober(
            self.availability.clone(),
            self.config.tool.clone(),
            self.config.probe_interval,
            self.config.probe_timeout,
            shutdown.clone(),
        );

        let app = create_router(AppState {
            manager: Arc::new(self.clone()),
        });

        let addr = listener.local_addr().context("Listener has no local address")?;
        tracing::info!("Server listening on http://{}", addr);
        tracing::info!("OpenAI-compatible endpoint: http://{}/v1/chat/completions", addr);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .context("Server error");

        shutdown.cancel();
        prober.await.context("Availability prober panicked")?;
        served
    }
}
