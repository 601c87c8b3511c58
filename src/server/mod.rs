//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │         POST /token           POST /remove-background           │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │  (bearer)   │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod page;
pub mod routes;

pub use auth::{bearer_auth_middleware, bearer_token, AuthenticatedUser, INVALID_TOKEN_MESSAGE};
pub use handlers::{
    health_handler, hello_handler, index_handler, login_handler, read_image_field,
    remove_background_handler, AppState, ErrorResponse, HealthResponse, HelloResponse, LoginForm,
    RemoveBackgroundError, TokenResponse, UploadedImage, IMAGE_FIELD, PNG_CONTENT_TYPE,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
