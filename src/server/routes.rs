//! Router configuration for the background removal service.
//!
//! # Route Structure
//!
//! ```text
//! /                       - Upload page (public)
//! /health                 - Health check (public)
//! /hello/{name}           - Greeting (public)
//! /token                  - Login, form-encoded (public)
//! /remove-background      - Multipart image upload (bearer token)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bg_remover::server::routes::{create_router, RouterConfig};
//!
//! let router = create_router(remover, tokens, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::bearer_auth_middleware;
use super::handlers::{
    health_handler, hello_handler, index_handler, login_handler, remove_background_handler,
    AppState,
};
use crate::auth::{TokenService, DEFAULT_TOKEN_TTL_MINUTES};
use crate::remover::{BackgroundRemover, Segmenter};

/// Default upload size limit (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Maximum accepted request body size for uploads
    pub max_upload_bytes: usize,

    /// Lifetime of tokens issued by `/token`
    pub token_ttl: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - Uploads are limited to 20 MiB
    /// - Tokens live 30 minutes
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_MINUTES * 60),
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the upload size limit in bytes.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Set the lifetime of issued tokens.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Bearer authentication is attached as a route layer on
/// `/remove-background` only, so it runs before the multipart body is
/// touched and never affects the public routes.
pub fn create_router<S: Segmenter>(
    remover: BackgroundRemover<S>,
    tokens: TokenService,
    config: RouterConfig,
) -> Router {
    let app_state = AppState::new(remover, tokens.clone()).with_token_ttl(config.token_ttl);
    let cors = build_cors_layer(&config);

    let protected_routes = Router::new()
        .route("/remove-background", post(remove_background_handler::<S>))
        .route_layer(middleware::from_fn_with_state(tokens, bearer_auth_middleware))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(app_state.clone());

    let public_routes = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler::<S>))
        .route("/hello/{name}", get(hello_handler))
        .route("/token", post(login_handler::<S>))
        .with_state(app_state);

    let router = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
