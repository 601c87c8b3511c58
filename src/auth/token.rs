//! JWT bearer tokens for the protected endpoints.
//!
//! Tokens are HS256-signed JWTs carrying the username (`sub`), the issue
//! time (`iat`) and an absolute expiry (`exp`, Unix epoch seconds):
//!
//! ```text
//! {"sub": "user", "iat": 1735686000, "exp": 1735687800}
//! ```
//!
//! # Validity
//!
//! A token is accepted iff all of these hold:
//!
//! - the signature verifies against the process-wide secret
//! - the claims parse and contain `sub` and `exp`
//! - `now < exp` (a token is already invalid at its expiry second)
//! - the subject exists in the credential store and is not disabled
//!
//! Issued tokens are not stored anywhere. There is no revocation: a token
//! stays usable until it expires or its user is disabled.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bg_remover::auth::{InMemoryCredentialStore, TokenService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryCredentialStore::demo()?);
//! let tokens = TokenService::new("my-secret-key", store)?;
//!
//! let user = tokens.authenticate("user", "password").await.expect("demo user");
//! let issued = tokens.issue_token(&user, Duration::from_secs(1800))?;
//!
//! let validated = tokens.validate_token(&issued.access_token).await?;
//! assert_eq!(validated.username, "user");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::{hash_password, verify_password, CredentialStore, User};
use crate::error::{AuthError, CredentialError};

/// Token type reported to clients.
pub const TOKEN_TYPE: &str = "bearer";

/// Default token lifetime in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 30;

/// Password hashed once at startup; unknown usernames are checked against it
/// so a miss costs the same as a wrong password.
const TIMING_DUMMY_PASSWORD: &str = "timing-equalization-dummy";

// =============================================================================
// Claims
// =============================================================================

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to
    pub sub: String,

    /// Issue time (Unix epoch seconds)
    pub iat: u64,

    /// Expiry time (Unix epoch seconds)
    pub exp: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT
    pub access_token: String,

    /// Expiry (Unix epoch seconds)
    pub expires_at: u64,

    /// Lifetime at the time of issue, in seconds
    pub expires_in: u64,
}

// =============================================================================
// Token Service
// =============================================================================

/// Issues and validates bearer tokens, and checks login credentials.
///
/// Cheap to clone; the keys and the credential store are shared.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    credentials: Arc<dyn CredentialStore>,
    dummy_hash: Arc<str>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service signing with `secret`.
    ///
    /// The secret is used as raw bytes and should be at least 32 bytes long
    /// (see `bg-remover generate-secret`).
    pub fn new(
        secret: impl AsRef<[u8]>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, CredentialError> {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand so that `now == exp` is already expired
        // and the check can run against an explicit clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            credentials,
            dummy_hash: Arc::from(hash_password(TIMING_DUMMY_PASSWORD)?),
        })
    }

    /// Check a username/password pair.
    ///
    /// Returns `None` if the user is unknown, disabled, or the password is
    /// wrong. Password verification runs on the blocking pool.
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let user = self.credentials.get_user(username).await;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .unwrap_or(false);

        match user {
            Some(user) if verified && !user.disabled => Some(user),
            Some(user) if verified => {
                debug!(username = %user.username, "Login rejected: user is disabled");
                None
            }
            Some(_) => {
                debug!(username = %username, "Login rejected: wrong password");
                None
            }
            None => {
                debug!(username = %username, "Login rejected: unknown user");
                None
            }
        }
    }

    /// Sign a token for `user` valid for `ttl` from now.
    pub fn issue_token(&self, user: &User, ttl: Duration) -> Result<IssuedToken, AuthError> {
        let now = get_current_timestamp();
        self.sign(&user.username, now, now.saturating_add(ttl.as_secs()))
    }

    /// Sign a token for `user` with an explicit expiry timestamp.
    pub fn issue_token_with_expiry(
        &self,
        user: &User,
        expires_at: u64,
    ) -> Result<IssuedToken, AuthError> {
        self.sign(&user.username, get_current_timestamp(), expires_at)
    }

    fn sign(&self, subject: &str, issued_at: u64, expires_at: u64) -> Result<IssuedToken, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at,
            exp: expires_at,
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_at,
            expires_in: expires_at.saturating_sub(issued_at),
        })
    }

    /// Validate a token against the current time.
    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        self.validate_token_at(token, get_current_timestamp()).await
    }

    /// Validate a token as of `now` (Unix epoch seconds).
    pub async fn validate_token_at(&self, token: &str, now: u64) -> Result<User, AuthError> {
        let claims = self.decode_claims(token)?;

        if now >= claims.exp {
            return Err(AuthError::Expired {
                expired_at: claims.exp,
                current_time: now,
            });
        }

        let user = self
            .credentials
            .get_user(&claims.sub)
            .await
            .ok_or_else(|| AuthError::UnknownSubject(claims.sub.clone()))?;

        if user.disabled {
            return Err(AuthError::DisabledUser(user.username));
        }

        Ok(user)
    }

    /// Verify the signature and parse the claims without checking expiry or
    /// the subject.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
