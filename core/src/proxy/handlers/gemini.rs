//! Gemini handler
//! Handles /v1beta/models/:model_action

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;

use crate::error::ProxyError;
use crate::proxy::common::model_mapping::resolve_model_route;
use crate::proxy::mappers::{
    self,
    models::gemini::{CountTokensRequest, GenerateContentRequest},
    openai_to_gemini::{create_gemini_sse_stream, split_complete_response, sse_frame},
};
use crate::proxy::server::AppState;
use crate::proxy::upstream::client::BackendReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeminiAction {
    Generate,
    StreamGenerate,
    CountTokens,
}

/// Split `gemini-pro:generateContent` into model and action
fn parse_model_action(model_action: &str) -> Result<(&str, GeminiAction), ProxyError> {
    let (model, action) = model_action.rsplit_once(':').unwrap_or((model_action, ""));
    if model.trim().is_empty() {
        return Err(ProxyError::MissingModel);
    }
    let action = match action {
        "generateContent" => GeminiAction::Generate,
        "streamGenerateContent" => GeminiAction::StreamGenerate,
        "countTokens" => GeminiAction::CountTokens,
        other => return Err(ProxyError::UnknownAction(other.to_string())),
    };
    Ok((model, action))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProxyError> {
    serde_json::from_slice(body).map_err(|e| ProxyError::InvalidRequest(e.to_string()))
}

fn new_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Handle POST /v1beta/models/{model}:{action}
pub async fn handle_gemini_request(
    State(state): State<AppState>,
    Path(model_action): Path<String>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let trace_id = new_trace_id();
    let (model, action) = parse_model_action(&model_action).inspect_err(|e| {
        tracing::warn!("[{}] Rejected {}: {}", trace_id, model_action, e);
    })?;
    let model = resolve_model_route(model, &state.custom_mapping);

    match action {
        GeminiAction::Generate => handle_generate(&state, &model, &body, &trace_id).await,
        GeminiAction::StreamGenerate => handle_stream_generate(&state, &model, &body, trace_id).await,
        GeminiAction::CountTokens => handle_count_tokens(&state, &model, &body, &trace_id),
    }
}

async fn handle_generate(
    state: &AppState,
    model: &str,
    body: &[u8],
    trace_id: &str,
) -> Result<Response, ProxyError> {
    state.rate_limiter.check().await?;

    let request: GenerateContentRequest = parse_body(body)?;
    let payload = mappers::translate_request(&request, model, false);
    tracing::info!(
        "[{}] generateContent: {} -> {} ({} messages)",
        trace_id,
        model,
        payload.model,
        payload.messages.len()
    );
    tracing::debug!("[{}] Backend payload: {}", trace_id, serde_json::to_string(&payload).unwrap_or_default());

    match state.upstream.call_chat_completions(&payload).await? {
        BackendReply::Stream(_) => {
            tracing::error!("[{}] Backend streamed a non-streaming request", trace_id);
            Err(ProxyError::UnexpectedStreaming)
        }
        BackendReply::Complete(response) => Ok(Json(mappers::translate_response(&response)).into_response()),
    }
}

async fn handle_stream_generate(
    state: &AppState,
    model: &str,
    body: &[u8],
    trace_id: String,
) -> Result<Response, ProxyError> {
    state.rate_limiter.check().await?;

    let request: GenerateContentRequest = parse_body(body)?;
    let payload = mappers::translate_request(&request, model, true);
    tracing::info!(
        "[{}] streamGenerateContent: {} -> {} ({} messages)",
        trace_id,
        model,
        payload.model,
        payload.messages.len()
    );
    tracing::debug!("[{}] Backend payload: {}", trace_id, serde_json::to_string(&payload).unwrap_or_default());

    let body = match state.upstream.call_chat_completions(&payload).await? {
        BackendReply::Stream(response) => {
            Body::from_stream(create_gemini_sse_stream(response.bytes_stream(), trace_id))
        }
        BackendReply::Complete(response) => {
            tracing::info!("[{}] Backend answered without streaming, replaying as frames", trace_id);
            let frames: Vec<_> = split_complete_response(mappers::translate_response(&response))
                .iter()
                .map(sse_frame)
                .collect();
            Body::from_stream(futures::stream::iter(frames))
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .map_err(|e| ProxyError::Internal(e.to_string()))
}

fn handle_count_tokens(
    state: &AppState,
    model: &str,
    body: &[u8],
    trace_id: &str,
) -> Result<Response, ProxyError> {
    let request: CountTokensRequest = parse_body(body)?;
    let payload = mappers::translate_count_tokens_request(&request, model);
    let count = state.estimator.count(&payload.messages);
    tracing::info!(
        "[{}] countTokens: {} input + {} output tokens",
        trace_id,
        count.input,
        count.output
    );
    Ok(Json(mappers::translate_token_count(count.total())).into_response())
}
