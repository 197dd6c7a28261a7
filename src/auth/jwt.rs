use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth not configured: {0}")]
    Configuration(&'static str),

    /// Bad signature, malformed token, wrong issuer or expired.
    #[error("invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),

    #[error("missing or malformed Authorization header")]
    MissingCredential,

    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct JwtKeys {
    keys: Option<(EncodingKey, DecodingKey)>,
    issuer: String,
    ttl: Option<Duration>,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            keys: config.secret.as_ref().map(|secret| {
                (
                    EncodingKey::from_secret(secret.as_bytes()),
                    DecodingKey::from_secret(secret.as_bytes()),
                )
            }),
            issuer: config.issuer.clone(),
            ttl: config.ttl_minutes.map(Duration::minutes),
        }
    }

    fn keys(&self) -> Result<&(EncodingKey, DecodingKey), AuthError> {
        self.keys
            .as_ref()
            .ok_or(AuthError::Configuration("JWT_SECRET is not set"))
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, AuthError> {
        let (encoding, _) = self.keys()?;
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            iss: self.issuer.clone(),
            exp: self.ttl.map(|ttl| (now + ttl).unix_timestamp()),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, encoding).map_err(AuthError::Signing)?;
        debug!(user_id, expires = ?claims.exp, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let (_, decoding) = self.keys()?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        if self.ttl.is_some() {
            validation.set_required_spec_claims(&["exp", "iss"]);
        } else {
            validation.validate_exp = false;
            validation.set_required_spec_claims(&["iss"]);
        }
        let data = decode::<Claims>(token, decoding, &validation).map_err(AuthError::InvalidToken)?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .map(str::trim)
        .and_then(|h| h.split_once(' '))
        .ok_or(AuthError::MissingCredential)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}
