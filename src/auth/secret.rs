//! Signing secret generation for `bg-remover generate-secret`.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand_core::{OsRng, RngCore};

/// Default secret length in bytes (256 bits, matching HS256).
pub const DEFAULT_SECRET_LENGTH: usize = 32;

/// Secrets shorter than this many bytes trigger a startup warning.
pub const MIN_RECOMMENDED_SECRET_LENGTH: usize = 32;

/// Generate `length` random bytes from the OS RNG, URL-safe base64 encoded
/// (with padding).
pub fn generate_secret(length: usize) -> Result<String, rand_core::Error> {
    let mut buf = vec![0u8; length];
    OsRng.try_fill_bytes(&mut buf)?;
    Ok(URL_SAFE.encode(buf))
}
