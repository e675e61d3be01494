/// Account password hashing
///
/// The in-process backend keeps a PHC-format Argon2id hash per account and
/// never the password itself. Hashing uses the `argon2` crate defaults
/// (Argon2id v19, 19 MiB, 2 passes, 1 lane), which keeps account creation in
/// tests and demo seeding fast. Verification reads the parameters back from
/// the stored hash, so hashes made with other parameters still verify.
///
/// Both calls are CPU-bound; async callers run them on `spawn_blocking`.
///
/// # Example
///
/// ```
/// use lifeos_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), lifeos_shared::auth::password::PasswordError> {
/// let stored = hash_password("correct horse")?;
/// assert!(verify_password("correct horse", &stored)?);
/// assert!(!verify_password("battery staple", &stored)?);
/// # Ok(())
/// # }
/// ```

use argon2::password_hash::{
    rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

/// Password hashing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    /// Hashing or verification itself failed
    #[error("Password hashing failed: {0}")]
    Hash(String),

    /// Stored value is not a PHC hash
    #[error("Stored password hash is malformed: {0}")]
    Malformed(String),
}

/// Hashes `password` with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Checks `password` against a stored hash
///
/// A wrong password is `Ok(false)`; `Err` means the stored hash is unusable.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|e| PasswordError::Malformed(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hash(e.to_string())),
    }
}
