//! Authentication layer.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                TokenService                  │
//! │   authenticate / issue_token / validate      │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │           CredentialStore (trait)            │
//! │       InMemoryCredentialStore (argon2)       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! - [`credentials`] - user table and password hashing
//! - [`token`] - HS256 JWT issuance and validation
//! - [`secret`] - random signing secret generation

pub mod credentials;
pub mod secret;
pub mod token;

pub use credentials::{
    hash_password, verify_password, CredentialStore, InMemoryCredentialStore, User, UserEntry,
    DEFAULT_PASSWORD, DEFAULT_USERNAME,
};
pub use secret::{generate_secret, DEFAULT_SECRET_LENGTH, MIN_RECOMMENDED_SECRET_LENGTH};
pub use token::{Claims, IssuedToken, TokenService, DEFAULT_TOKEN_TTL_MINUTES, TOKEN_TYPE};
