//! User table with argon2-hashed passwords.
//!
//! The store is built once at startup from a fixed list of
//! `username:password[:disabled]` entries and never changes afterwards.
//! Passwords are hashed with a random salt as they are loaded, so the
//! plaintext is dropped before the server starts accepting requests.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand_core::OsRng;

use crate::error::CredentialError;

/// Username of the built-in demo account.
pub const DEFAULT_USERNAME: &str = "user";

/// Password of the built-in demo account.
pub const DEFAULT_PASSWORD: &str = "password";

/// Suffix marking an entry as disabled.
const DISABLED_SUFFIX: &str = ":disabled";

// =============================================================================
// User
// =============================================================================

/// A user known to the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique login name
    pub username: String,

    /// Argon2 PHC string
    pub password_hash: String,

    /// Disabled users can neither log in nor use tokens issued earlier
    pub disabled: bool,
}

impl User {
    /// Create a user from an already hashed password.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            disabled: false,
        }
    }

    /// Mark the user as disabled.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Check a plaintext password against the stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// Hash a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// Verify a password against an argon2 PHC string.
///
/// Returns `false` for unparsable hashes. The digest comparison inside
/// argon2 is constant-time.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// =============================================================================
// User Entries
// =============================================================================

/// A plaintext user definition, as given on the command line.
///
/// Format: `username:password` or `username:password:disabled`. The password
/// may itself contain colons.
#[derive(Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
    pub disabled: bool,
}

impl UserEntry {
    /// Create an active user entry.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            disabled: false,
        }
    }

    /// Mark the entry as disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Parse a `username:password[:disabled]` entry.
    pub fn parse(entry: &str) -> Result<Self, CredentialError> {
        let invalid = |reason: &str| CredentialError::InvalidEntry {
            entry: redact(entry),
            reason: reason.to_string(),
        };

        let (username, rest) = entry
            .split_once(':')
            .ok_or_else(|| invalid("expected username:password"))?;
        let username = username.trim();
        if username.is_empty() {
            return Err(invalid("username is empty"));
        }

        let (password, disabled) = match rest.strip_suffix(DISABLED_SUFFIX) {
            Some(password) => (password, true),
            None => (rest, false),
        };
        if password.is_empty() {
            return Err(invalid("password is empty"));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            disabled,
        })
    }
}

impl FromStr for UserEntry {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for UserEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserEntry")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Keep the username of an entry for error messages, drop the rest.
fn redact(entry: &str) -> String {
    match entry.split_once(':') {
        Some((username, _)) => format!("{}:***", username),
        None => entry.to_string(),
    }
}

// =============================================================================
// Credential Store
// =============================================================================

/// Lookup of users by name.
///
/// The token service only ever reads from the store, so implementations
/// just need to answer lookups.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by username.
    async fn get_user(&self, username: &str) -> Option<User>;
}

/// Immutable in-memory user table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, User>,
}

impl InMemoryCredentialStore {
    /// Build a store from plaintext entries, hashing every password.
    pub fn from_entries(
        entries: impl IntoIterator<Item = UserEntry>,
    ) -> Result<Self, CredentialError> {
        let mut users = HashMap::new();
        for entry in entries {
            if users.contains_key(&entry.username) {
                return Err(CredentialError::DuplicateUser(entry.username));
            }
            let user = User::new(entry.username.clone(), hash_password(&entry.password)?)
                .with_disabled(entry.disabled);
            users.insert(entry.username, user);
        }
        Ok(Self { users })
    }

    /// Build a store from users whose passwords are already hashed.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.username.clone(), user))
                .collect(),
        }
    }

    /// The single demo account (`user` / `password`).
    pub fn demo() -> Result<Self, CredentialError> {
        Self::from_entries([UserEntry::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)])
    }

    /// Number of users in the table.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Sorted usernames, for startup logging.
    pub fn usernames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.users.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_user(&self, username: &str) -> Option<User> {
        self.users.get(username).cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================
