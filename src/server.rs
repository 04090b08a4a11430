use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::manager::BridgeManager;
use crate::normalize::Outcome;
use crate::prompt::parse_request;
use crate::types::{
    ChatCompletionChunk, ChatCompletionResponse, ChoiceChunk, Delta, ModelObject, ModelsListResponse,
};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BridgeManager>,
}

/// Liveness check. Static, whatever the tool's state.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Availability flag and the last probe's diagnostics.
pub async fn status(State(state): State<AppState>) -> Response {
    Json(state.manager.availability().status()).into_response()
}

pub async fn chat_completions(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = match body {
        Ok(Json(body)) => body,
        // without a JSON content type the body is not read at all
        Err(JsonRejection::MissingJsonContentType(_)) => Value::Object(Default::default()),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected request body");
            return Err(ApiError::InvalidBody(rejection.body_text()));
        }
    };

    let req = parse_request(&body).inspect_err(|e| {
        tracing::debug!(error = %e, "Invalid chat completion request");
    })?;

    tracing::info!(
        message_count = req.messages.len(),
        stream = req.stream,
        available = state.manager.availability().is_available(),
        "Received chat completion request"
    );

    let (response, outcome) = state.manager.complete(&req.messages).await;
    let raw = match outcome {
        Outcome::Success { raw, .. } => raw,
        Outcome::Simulated(_) => String::new(),
    };

    if req.stream {
        return stream_response(response, raw);
    }

    let bytes = serde_json::to_vec(&response).map_err(|e| ApiError::Serialization {
        details: e.to_string(),
        raw,
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

/// Replays a finished completion as `chat.completion.chunk` events: role,
/// content, finish, then `[DONE]`.
fn stream_response(response: ChatCompletionResponse, raw: String) -> Result<Response, ApiError> {
    let content = response
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .unwrap_or_default();

    let chunk = |delta: Delta, finish_reason: Option<String>| ChatCompletionChunk {
        id: response.id.clone(),
        object: "chat.completion.chunk",
        created: response.created,
        model: response.model.clone(),
        choices: vec![ChoiceChunk {
            index: 0,
            delta,
            finish_reason,
        }],
    };

    let chunks = [
        chunk(
            Delta {
                role: Some("assistant".to_string()),
                content: None,
            },
            None,
        ),
        chunk(
            Delta {
                role: None,
                content: Some(content),
            },
            None,
        ),
        chunk(Delta::default(), Some("stop".to_string())),
    ];

    let mut events = chunks
        .iter()
        .map(|c| serde_json::to_string(c).map(|data| Event::default().data(data)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Serialization {
            details: e.to_string(),
            raw,
        })?;
    events.push(Event::default().data("[DONE]"));

    tracing::debug!(id = %response.id, "Streaming completion");

    let stream = futures::stream::iter(events.into_iter().map(Ok::<Event, Infallible>));
    Ok(Sse::new(stream).into_response())
}

fn model_object(id: &str) -> ModelObject {
    ModelObject {
        id: id.to_string(),
        object: "model",
        created: 1700000000, // Static timestamp
        owned_by: "codex-bridge",
    }
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelsListResponse> {
    Json(ModelsListResponse {
        object: "list",
        data: vec![model_object(state.manager.model())],
    })
}

pub async fn get_model(State(state): State<AppState>, Path(model_id): Path<String>) -> Response {
    if model_id != state.manager.model() {
        tracing::warn!(model_id = %model_id, "Model not found");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "message": format!("Model '{}' not found", model_id),
                    "type": "invalid_request_error",
                    "code": "model_not_found"
                }
            })),
        )
            .into_response();
    }

    Json(model_object(&model_id)).into_response()
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route("/v1/models/:model", get(get_model))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
