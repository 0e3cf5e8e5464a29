//! Request handlers.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::models::PredictionResponse;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::server::upload::read_upload;

/// Welcome message.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Face Emotion Classifier API! POST an image to /predict."
            .to_string(),
    })
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness check. Models are loaded before the listener binds, so a
/// responding server can always serve predictions.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Classify the face in an uploaded image (multipart field `file`).
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<PredictionResponse>> {
    let upload = read_upload(&mut multipart, "file")
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?
        .ok_or_else(|| ApiError::bad_request("No file uploaded."))?;

    if !upload.is_image() {
        return Err(ApiError::bad_request("Uploaded file is not an image."));
    }

    info!(
        filename = %upload.filename,
        bytes = upload.bytes.len(),
        "prediction requested"
    );

    let pipeline = Arc::clone(&state.pipeline);
    let bytes = upload.bytes;
    let result = tokio::task::spawn_blocking(move || pipeline.infer(&bytes))
        .await
        .map_err(|e| ApiError::internal(format!("inference task failed: {e}")))??;

    Ok(Json(PredictionResponse::new(upload.filename, &result)))
}
