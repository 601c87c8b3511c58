//! # Background Remover
//!
//! An authenticated HTTP service that removes the background from uploaded
//! images and returns a transparent PNG.
//!
//! ## Features
//!
//! - **Token authentication**: OAuth2-style password login issuing HS256 JWTs
//! - **Background removal**: U²-Net segmentation via ONNX Runtime
//! - **Bounded worker pool**: CPU-heavy removals run off the async runtime
//! - **Upload page**: a small built-in HTML client at `/`
//!
//! ## Architecture
//!
//! - [`auth`] - Credential store, password hashing, token issuance/validation
//! - [`remover`] - Segmentation model, mask compositing, worker pool
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bg_remover::{
//!     create_router, BackgroundRemover, InMemoryCredentialStore, OnnxSegmenter, RouterConfig,
//!     TokenService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let segmenter = OnnxSegmenter::load("models/u2net.onnx", 4, 1)?;
//!     let remover = BackgroundRemover::with_workers(segmenter, 4);
//!
//!     let users = Arc::new(InMemoryCredentialStore::demo()?);
//!     let tokens = TokenService::new("change-me-to-a-long-random-secret", users)?;
//!
//!     let router = create_router(remover, tokens, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod remover;
pub mod server;

// Re-export commonly used types
pub use auth::{
    generate_secret, hash_password, verify_password, Claims, CredentialStore,
    InMemoryCredentialStore, IssuedToken, TokenService, User, UserEntry,
};
pub use config::{Cli, Command, RemoveConfig, SecretConfig, ServeConfig};
pub use error::{AuthError, CredentialError, ModelError, ProcessingError, UploadError};
pub use remover::{cut_out, BackgroundRemover, OnnxSegmenter, Segmenter};
pub use server::{
    bearer_auth_middleware, create_router, AppState, AuthenticatedUser, ErrorResponse,
    HealthResponse, RouterConfig, TokenResponse,
};
