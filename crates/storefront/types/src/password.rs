//! PBKDF2-SHA256 password hashes in PHC string format
//!
//! Stored as `$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`, so the work
//! factor can be raised without invalidating stored hashes.

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};
use rand::RngCore;

pub use pbkdf2::password_hash::Error as PasswordHashError;

pub const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_BYTES: usize = 16;
const OUTPUT_BYTES: usize = 32;

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str, iterations: u32) -> Result<String, PasswordHashError> {
    let mut bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes)?;

    let params = Params {
        rounds: iterations.max(1),
        output_length: OUTPUT_BYTES,
    };
    let hash = Pbkdf2.hash_password_customized(password.as_bytes(), None, None, params, &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash; malformed hashes never verify.
///
/// The digest comparison runs in constant time inside `password-hash`.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    PasswordHash::new(encoded)
        .and_then(|parsed| Pbkdf2.verify_password(password.as_bytes(), &parsed))
        .is_ok()
}
