//! Maps tool results onto the canonical chat completion response.
//!
//! Every request ends in one of two terminal states: [`Outcome::Success`]
//! with content taken from the tool, or [`Outcome::Simulated`] with a
//! labelled placeholder that echoes the prompt.

use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::InvocationError;
use crate::process::InvocationResult;
use crate::types::{ChatCompletionResponse, Choice, Message, Usage, UsageReport};

/// Tool stdout, either well-formed JSON or plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Structured(Value),
    RawText(String),
}

impl ToolOutput {
    pub fn parse(stdout: &[u8]) -> Self {
        let text = String::from_utf8_lossy(stdout);
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => Self::Structured(value),
            Err(e) => {
                tracing::debug!(error = %e, "Tool output is not JSON, using raw text");
                Self::RawText(text.trim().to_string())
            }
        }
    }
}

/// Why a request was answered with a simulated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationReason {
    Unavailable,
    /// The tool could not be started, timed out, or its output could not be read.
    InvocationFailed(String),
    /// `None` when the process was killed by a signal.
    NonZeroExit(Option<i32>),
}

impl fmt::Display for SimulationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "the generation tool is unavailable"),
            Self::InvocationFailed(_) => write!(f, "the generation tool could not be run"),
            Self::NonZeroExit(Some(code)) => write!(f, "the generation tool exited with status {}", code),
            Self::NonZeroExit(None) => write!(f, "the generation tool was terminated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { content: String, usage: UsageReport, raw: String },
    Simulated(SimulationReason),
}

impl Outcome {
    /// Folds an invocation attempt into a terminal outcome.
    pub fn from_invocation(invocation: Result<InvocationResult, InvocationError>) -> Self {
        let result = match invocation {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Tool invocation failed, simulating response");
                return Self::Simulated(SimulationReason::InvocationFailed(e.to_string()));
            }
        };

        if !result.success() {
            tracing::warn!(
                exit_code = ?result.exit_code,
                stderr = %String::from_utf8_lossy(&result.stderr).trim(),
                "Tool exited unsuccessfully, simulating response"
            );
            return Self::Simulated(SimulationReason::NonZeroExit(result.exit_code));
        }

        let raw = String::from_utf8_lossy(&result.stdout).trim().to_string();
        let (content, usage) = match ToolOutput::parse(&result.stdout) {
            ToolOutput::Structured(value) => (
                extract_content(&value).unwrap_or_else(|| raw.clone()),
                extract_usage(&value),
            ),
            ToolOutput::RawText(text) => (text, UsageReport::default()),
        };

        Self::Success { content, usage, raw }
    }
}

/// Content lookup order: `choices[0].message` (a string, or an object's
/// `content`), `choices[0].text`, then top-level `text`.
pub fn extract_content(value: &Value) -> Option<String> {
    let choice = value.get("choices").and_then(|c| c.get(0));

    let from_message = choice.and_then(|c| c.get("message")).and_then(|m| match m {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => m.get("content").and_then(Value::as_str).map(str::to_string),
        _ => None,
    });

    from_message
        .or_else(|| choice.and_then(|c| c.get("text")).and_then(Value::as_str).map(str::to_string))
        .or_else(|| value.get("text").and_then(Value::as_str).map(str::to_string))
}

/// Tool-reported `usage` object, passed through as is, or zeroed usage.
pub fn extract_usage(value: &Value) -> UsageReport {
    match value.get("usage") {
        Some(usage @ Value::Object(_)) => UsageReport::Reported(usage.clone()),
        _ => UsageReport::default(),
    }
}

/// Placeholder text for a simulated response. Always contains `prompt`
/// verbatim.
pub fn simulated_content(prompt: &str, reason: &SimulationReason) -> String {
    format!(
        "[SIMULATED RESPONSE] No completion was generated because {}. \
         This placeholder echoes the prompt that would have been processed:\n\n{}",
        reason, prompt
    )
}

/// Assembles canonical responses under a fixed model id.
#[derive(Debug, Clone)]
pub struct Normalizer {
    model: String,
}

impl Normalizer {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn respond(&self, prompt: &str, outcome: Outcome) -> ChatCompletionResponse {
        let (content, usage) = match outcome {
            Outcome::Success { content, usage, .. } => (content, usage),
            Outcome::Simulated(reason) => {
                let content = simulated_content(prompt, &reason);
                let usage = UsageReport::Counted(Usage::approximate(prompt, &content));
                (content, usage)
            }
        };

        ChatCompletionResponse {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            object: "chat.completion",
            created: unix_now(),
            model: self.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: Message::new("assistant", content),
                finish_reason: "stop".to_string(),
            }],
            usage,
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
