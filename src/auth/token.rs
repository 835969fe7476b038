use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime. Expiry is the sole de-authorization mechanism; there is
/// no revocation list.
const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Represents the claims encoded within an issued token.
///
/// The token binds to the user identity alone, with no roles or other claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's unique identifier.
    pub sub: i32,
    /// Issuance timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Generates a signed token for a given user ID, expiring in 24 hours.
///
/// Requires the `JWT_SECRET` environment variable for signing.
///
/// # Returns
/// The encoded token string, or `AppError::Internal` if the secret is
/// missing or encoding fails.
pub fn generate_token(user_id: i32) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expiration = now
        .checked_add_signed(chrono::Duration::hours(TOKEN_LIFETIME_HOURS))
        .ok_or_else(|| AppError::Internal("Token expiry out of range".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: expiration,
    };

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal("JWT_SECRET not set".into()))?;

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

/// Verifies a token string and decodes its claims.
///
/// Default validation applies: signature and expiration. Verification is
/// stateless.
///
/// # Returns
/// The decoded `Claims` for a valid token.
/// `AppError::Internal` if `JWT_SECRET` is not set.
/// `AppError::Unauthorized` if the token is malformed, carries a bad
/// signature, or has expired.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal("JWT_SECRET not set".into()))?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}
