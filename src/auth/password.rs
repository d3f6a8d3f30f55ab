use bcrypt::{hash, verify};

use super::CredentialError;

/// Salted one-way hash for storage. Runs on the blocking pool.
pub async fn hash_password(plaintext: &str, cost: u32) -> Result<String, CredentialError> {
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || hash(plaintext, cost))
        .await
        .map_err(|e| CredentialError::Hashing(format!("spawn_blocking join error: {}", e)))?
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Compare a plaintext password against a stored hash on the blocking pool.
///
/// A malformed stored hash is reported as a mismatch.
pub async fn check_password(plaintext: &str, hashed: &str) -> Result<bool, CredentialError> {
    let plaintext = plaintext.to_string();
    let hashed = hashed.to_string();
    let outcome = tokio::task::spawn_blocking(move || verify(plaintext, &hashed))
        .await
        .map_err(|e| CredentialError::Hashing(format!("spawn_blocking join error: {}", e)))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}
