//! Credential service: session token issuance/verification and password hashing.

mod password;

pub use password::{check_password, hash_password};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::TOKEN_TTL_HOURS;
use crate::database::models::Role;

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Signature, structure or expiry check failed
    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Claims embedded in every session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(account_id: Uuid, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: account_id,
            role,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Issues and verifies HS256 session tokens with a process-wide secret.
///
/// Tokens are stateless: there is no revocation list, a token stays valid
/// until `exp` passes.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    /// Sign a token for `account_id` carrying its role, expiring one day from now.
    pub fn issue(&self, account_id: Uuid, role: Role) -> Result<String, CredentialError> {
        self.sign(&Claims::new(account_id, role, self.ttl))
    }

    fn sign(&self, claims: &Claims) -> Result<String, CredentialError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    /// Check signature and expiry and return the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| CredentialError::Invalid(e.to_string()))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_hours", &self.ttl.num_hours())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_identity() {
        let tokens = TokenService::new("test-secret");
        let id = Uuid::new_v4();

        let token = tokens.issue(id, Role::Employer).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Employer);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issuer = TokenService::new("secret-a");
        let verifier = TokenService::new("secret-b");

        let token = issuer.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(matches!(verifier.verify(&token), Err(CredentialError::Invalid(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let tokens = TokenService::new("test-secret");
        let claims = Claims::new(Uuid::new_v4(), Role::JobSeeker, Duration::hours(-2));
        let token = tokens.sign(&claims).unwrap();

        assert!(matches!(tokens.verify(&token), Err(CredentialError::Invalid(_))));
    }

    #[test]
    fn rejects_garbage() {
        let tokens = TokenService::new("test-secret");
        assert!(tokens.verify("not.a.token").is_err());
        assert!(tokens.verify("").is_err());
    }
}
