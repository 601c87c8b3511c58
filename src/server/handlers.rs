//! HTTP request handlers for the background removal API.
//!
//! # Endpoints
//!
//! - `GET /` - Upload page
//! - `GET /health` - Health check
//! - `GET /hello/{name}` - Greeting
//! - `POST /token` - Exchange username/password for a bearer token
//! - `POST /remove-background` - Remove the background from an uploaded image

use std::time::Duration;

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension, Form, Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::{TokenService, DEFAULT_TOKEN_TTL_MINUTES, TOKEN_TYPE};
use crate::error::{AuthError, ProcessingError, UploadError};
use crate::remover::{BackgroundRemover, Segmenter};

use super::auth::AuthenticatedUser;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Content type of every processed image.
pub const PNG_CONTENT_TYPE: &str = "image/png";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Built once at startup and handed to every handler via Axum's State
/// extractor.
pub struct AppState<S: Segmenter> {
    /// Background removal worker pool
    pub remover: BackgroundRemover<S>,

    /// Token issuance and validation
    pub tokens: TokenService,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,
}

impl<S: Segmenter> AppState<S> {
    /// Create application state with the default token lifetime.
    pub fn new(remover: BackgroundRemover<S>, tokens: TokenService) -> Self {
        Self {
            remover,
            tokens,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_MINUTES * 60),
        }
    }

    /// Set the lifetime of issued tokens.
    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }
}

impl<S: Segmenter> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            remover: self.remover.clone(),
            tokens: self.tokens.clone(),
            token_ttl: self.token_ttl,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Login form (`application/x-www-form-urlencoded`).
///
/// Extra OAuth2 password-grant fields (`grant_type`, `scope`, ...) are
/// accepted and ignored.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// An image received from the client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Raw encoded bytes
    pub data: Bytes,

    /// Declared MIME type, if any
    pub content_type: Option<String>,

    /// Declared file name, if any
    pub file_name: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_token", "missing_field")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Successful login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Encoded JWT
    pub access_token: String,

    /// Always "bearer"
    pub token_type: String,

    /// Seconds until the token expires
    pub expires_in: u64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Loaded segmentation model
    pub model: String,

    /// Worker pool size
    pub workers: usize,
}

/// Greeting response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Processing failures become `500` with the error message as plain text.
impl IntoResponse for ProcessingError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        error!(
            status = StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            "Error processing image: {}", message
        );

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            UploadError::Multipart(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_multipart"),
            UploadError::MissingField(_) => (StatusCode::UNPROCESSABLE_ENTITY, "missing_field"),
            UploadError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        };
        let message = self.to_string();

        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

/// Errors from the remove-background endpoint.
#[derive(Debug)]
pub enum RemoveBackgroundError {
    Upload(UploadError),
    Processing(ProcessingError),
}

impl IntoResponse for RemoveBackgroundError {
    fn into_response(self) -> Response {
        match self {
            RemoveBackgroundError::Upload(err) => err.into_response(),
            RemoveBackgroundError::Processing(err) => err.into_response(),
        }
    }
}

impl From<UploadError> for RemoveBackgroundError {
    fn from(err: UploadError) -> Self {
        RemoveBackgroundError::Upload(err)
    }
}

impl From<ProcessingError> for RemoveBackgroundError {
    fn from(err: ProcessingError) -> Self {
        RemoveBackgroundError::Processing(err)
    }
}

fn upload_error(err: MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::PayloadTooLarge(err.body_text())
    } else {
        UploadError::Multipart(err.body_text())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve the upload page.
///
/// `GET /` (and `HEAD /`)
pub async fn index_handler() -> Html<&'static str> {
    Html(super::page::INDEX_HTML)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "model": "u2net",
///   "workers": 4
/// }
/// ```
pub async fn health_handler<S: Segmenter>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.remover.segmenter().name().to_string(),
        workers: state.remover.workers(),
    })
}

/// Greet by name.
///
/// `GET /hello/{name}` → `{"message": "Hello {name}"}`
pub async fn hello_handler(Path(name): Path<String>) -> Json<HelloResponse> {
    Json(HelloResponse {
        message: format!("Hello {}", name),
    })
}

/// Exchange credentials for a bearer token.
///
/// # Endpoint
///
/// `POST /token` with form fields `username` and `password`
///
/// # Response
///
/// - `200 OK`: `{"access_token": "...", "token_type": "bearer", "expires_in": 1800}`
/// - `401 Unauthorized`: unknown user, wrong password, or disabled user
///   (`WWW-Authenticate: Bearer`)
/// - `415`/`422`: malformed form body (framework rejection)
pub async fn login_handler<S: Segmenter>(
    State(state): State<AppState<S>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AuthError> {
    let user = state
        .tokens
        .authenticate(&form.username, &form.password)
        .await
        .ok_or(AuthError::InvalidCredentials)?;

    let issued = state.tokens.issue_token(&user, state.token_ttl)?;

    info!(
        username = %user.username,
        expires_at = issued.expires_at,
        "Issued access token"
    );

    Ok(Json(TokenResponse {
        access_token: issued.access_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: issued.expires_in,
    }))
}

/// Remove the background from an uploaded image.
///
/// # Endpoint
///
/// `POST /remove-background` (multipart, field `image`)
///
/// Requires `Authorization: Bearer <token>`; the token is checked by
/// [`bearer_auth_middleware`](super::auth::bearer_auth_middleware) before
/// the body is read.
///
/// # Response
///
/// - `200 OK`: PNG with transparent background, `Content-Type: image/png`
/// - `401 Unauthorized`: missing, malformed or expired token
/// - `413 Payload Too Large`: upload exceeds the configured limit
/// - `422 Unprocessable Entity`: malformed multipart body or no `image` field
/// - `500 Internal Server Error`: plain-text error message
pub async fn remove_background_handler<S: Segmenter>(
    State(state): State<AppState<S>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RemoveBackgroundError> {
    let multipart = multipart.map_err(|rejection| UploadError::Multipart(rejection.body_text()))?;
    let upload = read_image_field(multipart).await?;

    info!(
        username = %user.username,
        bytes = upload.data.len(),
        content_type = upload.content_type.as_deref().unwrap_or("unknown"),
        file_name = upload.file_name.as_deref().unwrap_or(""),
        "Processing upload"
    );

    let png = state.remover.remove_background(upload.data).await?;

    Ok(([(header::CONTENT_TYPE, PNG_CONTENT_TYPE)], png).into_response())
}

/// Read the `image` field of a multipart body into memory.
///
/// Fields before it are skipped; anything after it is never read.
pub async fn read_image_field(mut multipart: Multipart) -> Result<UploadedImage, UploadError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(upload_error)?;

        return Ok(UploadedImage {
            data,
            content_type,
            file_name,
        });
    }

    Err(UploadError::MissingField(IMAGE_FIELD))
}

// =============================================================================
// Tests
// =============================================================================
