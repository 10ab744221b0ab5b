//! HTTPサーバー
//!
//! - GET  /api/health
//! - POST /api/recognize（multipart の `image` フィールド、または JSON `{"image": base64}`）

use crate::analyzer::Recognizer;
use crate::error::{DetectiveError, Result};
use crate::normalizer::decode_base64_image;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use object_detective_common::ApiResponse;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// リクエストボディの上限
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

pub const NO_IMAGE_MESSAGE: &str = "No image provided! Please send a photo.";
pub const EMPTY_IMAGE_MESSAGE: &str = "No image selected! Please choose a photo.";
pub const NOT_FOUND_MESSAGE: &str = "Page not found!";
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong! Let's try again.";

#[derive(Clone)]
pub struct AppState {
    recognizer: Arc<Recognizer>,
}

impl AppState {
    pub fn new(recognizer: Recognizer) -> Self {
        Self {
            recognizer: Arc::new(recognizer),
        }
    }
}

/// ルーター構築（テストからも使う）
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/recognize", post(recognize_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 待ち受け開始（Ctrl+C で停止）
pub async fn serve(host: &str, port: u16, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DetectiveError::Server(format!("{} にバインドできません: {}", addr, e)))?;

    tracing::info!("Object Detective listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .map_err(|e| DetectiveError::Server(e.to_string()))
}

/// エンベロープ形式のエラーレスポンス
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DetectiveError> for ApiError {
    fn from(e: DetectiveError) -> Self {
        if e.is_user_facing() {
            Self::bad_request(e.to_string())
        } else {
            tracing::error!("request failed: {}", e);
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: INTERNAL_ERROR_MESSAGE.to_string(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::failure(self.message))).into_response()
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "message": "Object Detective is ready!",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ApiResponse::failure(NOT_FOUND_MESSAGE)))
}

#[derive(Deserialize)]
struct RecognizeBody {
    image: Option<String>,
}

async fn recognize_handler(
    State(state): State<AppState>,
    request: Request,
) -> std::result::Result<Json<ApiResponse>, ApiError> {
    let raw = extract_image(request, &state).await?;
    tracing::debug!(bytes = raw.len(), "image received");

    let outcome = state.recognizer.recognize_bytes(&raw).await?;
    Ok(Json(ApiResponse::from(outcome)))
}

/// Content-Type に応じて画像バイト列を取り出す
async fn extract_image(request: Request, state: &AppState) -> std::result::Result<Vec<u8>, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|_| ApiError::bad_request(NO_IMAGE_MESSAGE))?;
        image_from_multipart(multipart).await
    } else {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|_| ApiError::bad_request(NO_IMAGE_MESSAGE))?;
        image_from_json(&body)
    }
}

async fn image_from_multipart(mut multipart: Multipart) -> std::result::Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request(NO_IMAGE_MESSAGE))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let unnamed = field.file_name().map(|n| n.trim().is_empty()).unwrap_or(false);
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request(NO_IMAGE_MESSAGE))?;

        if unnamed || data.is_empty() {
            return Err(ApiError::bad_request(EMPTY_IMAGE_MESSAGE));
        }
        return Ok(data.to_vec());
    }

    Err(ApiError::bad_request(NO_IMAGE_MESSAGE))
}

fn image_from_json(body: &[u8]) -> std::result::Result<Vec<u8>, ApiError> {
    let parsed: RecognizeBody =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request(NO_IMAGE_MESSAGE))?;

    match parsed.image {
        Some(text) if !text.trim().is_empty() => Ok(decode_base64_image(&text)?),
        _ => Err(ApiError::bad_request(NO_IMAGE_MESSAGE)),
    }
}
