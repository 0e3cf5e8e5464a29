//! Browser front end.
//!
//! Serves the static upload page and forwards uploads to the prediction
//! API, passing its JSON answer through untouched.

use std::path::Path;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{middleware, Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::server::middleware::request_logging;
use crate::server::upload::read_upload;

/// Front end state.
#[derive(Clone)]
pub struct FrontendState {
    /// Base URL of the prediction API, e.g. `http://127.0.0.1:8000`
    pub api_url: String,
    pub client: reqwest::Client,
}

impl FrontendState {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn predict_url(&self) -> String {
        format!("{}/predict", self.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct FrontendErrorBody {
    error: String,
}

impl IntoResponse for FrontendError {
    fn into_response(self) -> Response {
        let status = match &self {
            FrontendError::BadRequest(_) => StatusCode::BAD_REQUEST,
            FrontendError::Upstream(_) => {
                error!(error = %self, "prediction API call failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = FrontendErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the front end router: `/predict_flask` plus static files.
pub fn create_frontend_router(
    state: FrontendState,
    static_dir: &Path,
    max_body_size: usize,
) -> Router {
    Router::new()
        .route("/predict_flask", post(predict_flask))
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}

/// Forward an upload (multipart field `image`) to the prediction API.
pub async fn predict_flask(
    State(state): State<FrontendState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, FrontendError> {
    let upload = read_upload(&mut multipart, "image")
        .await
        .map_err(|e| FrontendError::BadRequest(format!("Malformed upload: {e}")))?
        .ok_or_else(|| FrontendError::BadRequest("No image file provided.".to_string()))?;

    if upload.filename.is_empty() {
        return Err(FrontendError::BadRequest("No selected file.".to_string()));
    }

    let mut part = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
        .file_name(upload.filename.clone());
    if let Some(content_type) = &upload.content_type {
        part = part
            .mime_str(content_type)
            .map_err(|e| FrontendError::BadRequest(format!("Invalid content type: {e}")))?;
    }
    let form = reqwest::multipart::Form::new().part("file", part);

    info!(filename = %upload.filename, api = %state.api_url, "forwarding upload");

    let response = state
        .client
        .post(state.predict_url())
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            if e.is_connect() {
                FrontendError::Upstream(format!(
                    "Could not connect to the prediction API. Please ensure it is running at {}",
                    state.api_url
                ))
            } else {
                FrontendError::Upstream(format!("Error during API request: {e}"))
            }
        })?
        .error_for_status()
        .map_err(|e| FrontendError::Upstream(format!("Error during API request: {e}")))?;

    let body = response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| FrontendError::Upstream(format!("An unexpected error occurred: {e}")))?;

    Ok(Json(body))
}
