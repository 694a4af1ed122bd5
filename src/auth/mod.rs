use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id the token was issued to
    pub sub: Uuid,
    /// Unique per issuance so a new login never reproduces an old token
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, expiry_hours: u64) -> Self {
        let now = Utc::now();
        // Out-of-range lifetimes saturate instead of overflowing
        let exp = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .timestamp();

        Self {
            sub,
            jti: Uuid::new_v4(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid password hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),
}

/// Password hashing, session tokens and one-time codes.
///
/// Built once from [`SecurityConfig`] and shared by every request; holds no mutable state.
pub struct CredentialManager {
    params: Params,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
    /// Digest of a random secret, verified against when the account does not exist
    decoy_digest: String,
}

impl CredentialManager {
    pub fn new(config: &SecurityConfig) -> Result<Self, CredentialError> {
        if config.jwt_secret.is_empty() {
            return Err(CredentialError::InvalidSecret);
        }

        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
            None,
        )
        .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;

        let decoy_secret = Uuid::new_v4().to_string();
        let decoy_digest = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
            .hash_password(decoy_secret.as_bytes(), &SaltString::generate(&mut OsRng))
            .map_err(|e| CredentialError::Hash(e.to_string()))?
            .to_string();

        Ok(Self {
            decoy_digest,
            params,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiry_hours: config.jwt_expiry_hours,
        })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Salted Argon2id digest in PHC string format
    pub async fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let hasher = self.hasher();
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| CredentialError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| CredentialError::Hash(e.to_string()))?
    }

    /// Any failure (malformed digest, worker panic) counts as "does not match"
    pub async fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let hasher = self.hasher();
        let plaintext = plaintext.to_owned();
        let digest = digest.to_owned();

        let outcome = tokio::task::spawn_blocking(move || {
            PasswordHash::new(&digest)
                .map(|parsed| hasher.verify_password(plaintext.as_bytes(), &parsed).is_ok())
                .unwrap_or(false)
        })
        .await;

        outcome.unwrap_or_else(|e| {
            tracing::error!("Password verification task failed: {}", e);
            false
        })
    }

    /// Pay the same hashing cost as [`Self::verify`] when there is no digest to check,
    /// so a missing account is not observable through response time. Always `false`.
    pub async fn verify_absent(&self, plaintext: &str) -> bool {
        self.verify(plaintext, &self.decoy_digest).await;
        false
    }

    pub fn issue_token(&self, subject: Uuid) -> Result<String, CredentialError> {
        let claims = Claims::new(subject, self.expiry_hours);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| CredentialError::TokenGeneration(e.to_string()))
    }

    /// Check signature and expiry, returning the subject id
    pub fn verify_token(&self, token: &str) -> Result<Uuid, CredentialError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))
    }

    /// Random single-use code for email verification, unrelated to session tokens
    pub fn issue_one_time_code(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
