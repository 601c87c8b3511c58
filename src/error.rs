use std::path::PathBuf;

use thiserror::Error;

/// Authentication failures.
///
/// Every variant maps to HTTP 401. The messages sent to clients are kept
/// generic; the variant itself is only used for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Username/password pair did not match an active user
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// No `Authorization: Bearer` header on a protected request
    #[error("Missing bearer token")]
    MissingToken,

    /// Token could not be decoded or its claims could not be parsed
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Token signature did not verify against the signing secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token is past its expiry timestamp
    #[error("Token expired at {expired_at} (current time: {current_time})")]
    Expired { expired_at: u64, current_time: u64 },

    /// Token subject is not in the credential store
    #[error("Unknown token subject: {0}")]
    UnknownSubject(String),

    /// Token subject exists but is disabled
    #[error("User is disabled: {0}")]
    DisabledUser(String),

    /// Token could not be signed
    #[error("Failed to issue token: {0}")]
    Signing(String),
}

/// Errors raised while removing the background from an image.
#[derive(Debug, Clone, Error)]
pub enum ProcessingError {
    /// Input bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The segmentation model failed to produce a mask
    #[error("Segmentation model error: {0}")]
    Model(String),

    /// The result could not be encoded as PNG
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The blocking worker panicked or was cancelled
    #[error("Worker pool error: {0}")]
    Worker(String),

    /// Reading or writing a local file failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors reading the multipart upload.
///
/// Malformed bodies and missing fields map to HTTP 422; oversized bodies
/// to HTTP 413.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// The multipart body could not be parsed
    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    /// The required form field was not present
    #[error("Missing form field: {0}")]
    MissingField(&'static str),

    /// The body exceeded the configured upload limit
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),
}

/// Errors loading the segmentation model at startup.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Model file does not exist
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// ONNX Runtime rejected the model or its configuration
    #[error("Failed to load model: {0}")]
    Load(String),

    /// Invalid session count or thread settings
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),
}

/// Errors building the credential store.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// A `name:password[:disabled]` entry could not be parsed
    #[error("Invalid user entry '{entry}': {reason}")]
    InvalidEntry { entry: String, reason: String },

    /// Same username listed more than once
    #[error("Duplicate user: {0}")]
    DuplicateUser(String),

    /// Password hashing failed
    #[error("Failed to hash password: {0}")]
    Hash(String),
}
