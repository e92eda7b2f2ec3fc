use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::Html;
use chrono::Utc;
use leafscan_ai::Axis;
use leafscan_core::ClassificationResult;
use leafscan_remote::{RemoteError, chat_request};
use leafscan_store::Counter;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::dashboard;
use crate::error::ApiError;
use crate::policy::Upload;
use crate::state::SharedState;

const SERVICE_NAME: &str = "leafscan plant disease detection API";
const CHAT_APOLOGY: &str = "I apologize, but I encountered an error processing your request.";

pub async fn root(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "model_loaded": state.model_loaded(),
        "species_labels": state.labels.species_count(),
        "disease_labels": state.labels.disease_count(),
        "ai_takeover_enabled": state.settings.ai_takeover,
        "ai_takeover_available": state.remote_available(),
        "ml_enabled": state.settings.ml_enabled,
    }))
}

pub async fn health(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    state.usage.record(Counter::TotalRequests);
    if !state.model_loaded() {
        return Err(ApiError::Unavailable("Model not loaded".into()));
    }
    let remote = if state.remote_available() { "yes" } else { "no" };
    Ok(Json(json!({
        "status": "healthy",
        "model": "loaded",
        "species_labels": state.labels.species_count(),
        "disease_labels": state.labels.disease_count(),
        "ai_takeover_enabled": state.settings.ai_takeover,
        "ai_takeover_available": remote,
        "ml_enabled": state.settings.ml_enabled,
    })))
}

pub async fn labels(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "species": state.labels.list(Axis::Species),
        "diseases": state.labels.list(Axis::Disease),
    }))
}

pub async fn predict(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<ClassificationResult>, ApiError> {
    state.usage.record(Counter::TotalRequests);
    state.usage.record(Counter::Predictions);

    match run_prediction(&state, multipart).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            state.usage.record(Counter::Errors);
            warn!(status = e.status().as_u16(), error = %e, "prediction failed");
            Err(e)
        }
    }
}

async fn run_prediction(
    state: &SharedState,
    multipart: Multipart,
) -> Result<ClassificationResult, ApiError> {
    let policy = state.policy();
    let classifier = state.local_classifier().cloned();
    if classifier.is_none() && !policy.can_serve_without_local() {
        return Err(ApiError::Unavailable("Model not available".into()));
    }

    let bytes = read_upload(multipart).await?;
    info!(bytes = bytes.len(), "received upload");

    let preprocessor = state.preprocessor;
    let image = bytes.clone();
    let prepared = tokio::task::spawn_blocking(move || preprocessor.prepare(&image))
        .await
        .map_err(|e| ApiError::Internal(format!("Preprocessing task failed: {e}")))?
        .map_err(|e| ApiError::BadRequest(format!("Invalid image: {e}")))?;
    let upload = Upload {
        bytes: &bytes,
        mime_type: prepared.mime_type,
    };

    let Some(classifier) = classifier else {
        info!("local inference unavailable, using remote analysis only");
        return policy.remote_only(upload).await;
    };

    let tensor = prepared.tensor;
    let prediction = tokio::task::spawn_blocking(move || classifier.predict(&tensor))
        .await
        .map_err(|e| ApiError::Internal(format!("Inference task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "local inference failed");
            ApiError::Internal(format!("Prediction failed: {e}"))
        })?;

    Ok(policy.arbitrate(&prediction, upload).await)
}

/// Bytes of the `file` field, or of the first file field when none is
/// named `file`.
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    let mut first_file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let named_file = field.name() == Some("file");
        if !named_file && (first_file.is_some() || field.file_name().is_none()) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?;
        if named_file {
            return Ok(bytes);
        }
        first_file = Some(bytes);
    }
    first_file.ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub analysis_context: Option<Value>,
}

pub async fn chat(
    State(state): State<SharedState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.usage.record(Counter::TotalRequests);
    state.usage.record(Counter::ChatMessages);

    match run_chat(&state, body).await {
        Ok(text) => Ok(Json(json!({ "response": text }))),
        Err(e) => {
            state.usage.record(Counter::Errors);
            warn!(status = e.status().as_u16(), error = %e, "chat failed");
            Err(e)
        }
    }
}

async fn run_chat(
    state: &SharedState,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Some(remote) = &state.remote else {
        return Err(ApiError::Unavailable("Remote AI not configured".into()));
    };

    let request = chat_request(&req.prompt, req.analysis_context.as_ref());
    let generation = match remote.generate(&request, state.settings.chat_timeout).await {
        Ok(g) => g,
        Err(RemoteError::Timeout) => return Err(ApiError::Timeout("Request timeout".into())),
        Err(RemoteError::Server { status, .. }) => {
            return Err(ApiError::Internal(format!("Remote AI error (status {status})")));
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    if let Some(usage) = generation.usage {
        state.usage.record_tokens(usage);
        info!(total = usage.total, "chat tokens");
    }
    Ok(generation.text.unwrap_or_else(|| {
        warn!("unexpected remote response shape");
        CHAT_APOLOGY.to_string()
    }))
}

pub async fn stats_dashboard(State(state): State<SharedState>) -> Html<String> {
    Html(dashboard::render(&state.usage.snapshot(), Utc::now()))
}
