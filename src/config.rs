//! Configuration management.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable fallbacks under the `BG_REMOVER_` prefix.
//!
//! # Example
//!
//! ```ignore
//! use bg_remover::config::{Cli, Command};
//! use clap::Parser;
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::GenerateSecret(config) => println!("{} bytes", config.length),
//!     Command::Remove(config) => println!("{}", config.input.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `BG_REMOVER_HOST` - Server bind address (default: 0.0.0.0)
//! - `BG_REMOVER_PORT` - Server port (default: 8000)
//! - `BG_REMOVER_JWT_SECRET` - HS256 signing secret (required)
//! - `BG_REMOVER_TOKEN_TTL_MINUTES` - Token lifetime (default: 30)
//! - `BG_REMOVER_MODEL_PATH` - ONNX model file (default: models/u2net.onnx)
//! - `BG_REMOVER_WORKERS` - Concurrent removals (default: 4)
//! - `BG_REMOVER_INTRA_THREADS` - ONNX threads per session (default: 1)
//! - `BG_REMOVER_USERS` - Comma-separated `name:password[:disabled]` entries
//! - `BG_REMOVER_MAX_UPLOAD_BYTES` - Upload size limit (default: 20 MiB)
//! - `BG_REMOVER_CORS_ORIGINS` - Comma-separated allowed origins

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::auth::{
    UserEntry, DEFAULT_PASSWORD, DEFAULT_SECRET_LENGTH, DEFAULT_TOKEN_TTL_MINUTES,
    DEFAULT_USERNAME, MIN_RECOMMENDED_SECRET_LENGTH,
};
use crate::error::CredentialError;
use crate::remover::{DEFAULT_INTRA_THREADS, DEFAULT_MODEL_PATH, DEFAULT_WORKERS};
use crate::server::DEFAULT_MAX_UPLOAD_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default output file for the `remove` command.
pub const DEFAULT_OUTPUT_PATH: &str = "result.png";

/// Largest secret `generate-secret` will produce, in bytes.
pub const MAX_SECRET_LENGTH: usize = 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Background Remover - removes image backgrounds over an authenticated HTTP API.
///
/// Runs the server when no subcommand is given.
#[derive(Parser, Debug, Clone)]
#[command(name = "bg-remover")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The selected command, defaulting to `serve` with the top-level flags.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve(ServeConfig),

    /// Print a random secret suitable for --jwt-secret
    GenerateSecret(SecretConfig),

    /// Remove the background from a local image file
    Remove(RemoveConfig),
}

// =============================================================================
// Serve
// =============================================================================

/// Server configuration.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "BG_REMOVER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "BG_REMOVER_PORT")]
    pub port: u16,

    /// Maximum accepted upload size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "BG_REMOVER_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret used to sign access tokens (HS256).
    ///
    /// Generate one with `bg-remover generate-secret`.
    #[arg(long, env = "BG_REMOVER_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued access tokens, in minutes.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_MINUTES, env = "BG_REMOVER_TOKEN_TTL_MINUTES")]
    pub token_ttl_minutes: u64,

    /// Users allowed to log in (`name:password[:disabled]`, comma-separated).
    #[arg(
        long,
        env = "BG_REMOVER_USERS",
        value_delimiter = ',',
        default_value = "user:password",
        hide_env_values = true
    )]
    pub users: Vec<String>,

    // =========================================================================
    // Model Configuration
    // =========================================================================
    /// Path to the U²-Net ONNX model.
    #[arg(long, default_value = DEFAULT_MODEL_PATH, env = "BG_REMOVER_MODEL_PATH")]
    pub model_path: PathBuf,

    /// Number of background removals that may run at once.
    #[arg(long, default_value_t = DEFAULT_WORKERS, env = "BG_REMOVER_WORKERS")]
    pub workers: usize,

    /// ONNX Runtime intra-op threads per worker.
    #[arg(long, default_value_t = DEFAULT_INTRA_THREADS, env = "BG_REMOVER_INTRA_THREADS")]
    pub intra_threads: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "BG_REMOVER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.jwt_secret.as_deref() {
            None | Some("") => {
                return Err("JWT secret is required. Set --jwt-secret or BG_REMOVER_JWT_SECRET \
                     (generate one with `bg-remover generate-secret`)"
                    .to_string());
            }
            Some(_) => {}
        }

        if self.token_ttl_minutes == 0 {
            return Err("token_ttl_minutes must be greater than 0".to_string());
        }
        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }
        if self.intra_threads == 0 {
            return Err("intra_threads must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        let entries = self.user_entries().map_err(|e| e.to_string())?;
        if entries.is_empty() {
            return Err("At least one user is required. Set --users or BG_REMOVER_USERS".to_string());
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.username.as_str()) {
                return Err(CredentialError::DuplicateUser(entry.username.clone()).to_string());
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the signing secret, or an empty string if unset (call validate() first).
    pub fn jwt_secret_or_empty(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or("")
    }

    /// Whether the signing secret is shorter than recommended.
    pub fn has_weak_secret(&self) -> bool {
        self.jwt_secret_or_empty().len() < MIN_RECOMMENDED_SECRET_LENGTH
    }

    /// Token lifetime.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_minutes.saturating_mul(60))
    }

    /// Parse the configured users.
    ///
    /// Blank entries (e.g. from a trailing comma) are skipped.
    pub fn user_entries(&self) -> Result<Vec<UserEntry>, CredentialError> {
        self.users
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(UserEntry::parse)
            .collect()
    }

    /// Whether the only configured user is the built-in demo account.
    pub fn uses_demo_credentials(&self) -> bool {
        matches!(
            self.user_entries().as_deref(),
            Ok([entry]) if entry.username == DEFAULT_USERNAME && entry.password == DEFAULT_PASSWORD
        )
    }
}

// =============================================================================
// Generate Secret
// =============================================================================

/// `generate-secret` options.
#[derive(Args, Debug, Clone)]
pub struct SecretConfig {
    /// Number of random bytes.
    #[arg(short, long, default_value_t = DEFAULT_SECRET_LENGTH)]
    pub length: usize,

    /// Print only the secret, without usage hints.
    #[arg(long, default_value_t = false)]
    pub raw: bool,
}

impl SecretConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.length == 0 || self.length > MAX_SECRET_LENGTH {
            return Err(format!(
                "length must be between 1 and {} bytes",
                MAX_SECRET_LENGTH
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Remove
// =============================================================================

/// `remove` options.
#[derive(Args, Debug, Clone)]
pub struct RemoveConfig {
    /// Input image.
    pub input: PathBuf,

    /// Output PNG.
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Path to the U²-Net ONNX model.
    #[arg(long, default_value = DEFAULT_MODEL_PATH, env = "BG_REMOVER_MODEL_PATH")]
    pub model_path: PathBuf,

    /// ONNX Runtime intra-op threads.
    #[arg(long, default_value_t = DEFAULT_INTRA_THREADS, env = "BG_REMOVER_INTRA_THREADS")]
    pub intra_threads: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RemoveConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.intra_threads == 0 {
            return Err("intra_threads must be greater than 0".to_string());
        }
        if self.input == self.output {
            return Err("output must differ from input".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
