//! Access-token handling.
//!
//! Tokens are minted by an external identity service and carry the caller's subject id and role. The server only
//! verifies them: HS256 over a shared secret, standard expiry check. Verified claims are stashed in the request
//! extensions by the ACL middleware, and handlers pull them out via the [`JwtClaims`] extractor.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mesa_engine::db_types::Role;
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::AuthError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The caller's subject id: the customer id for customers, the partner account id for partners.
    pub sub: String,
    pub role: Role,
    /// Expiry, as a unix timestamp.
    pub exp: i64,
}

impl JwtClaims {
    pub fn new<S: Into<String>>(sub: S, role: Role, valid_for: Duration) -> Self {
        Self { sub: sub.into(), role, exp: (Utc::now() + valid_for).timestamp() }
    }
}

impl FromRequest for JwtClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req
            .extensions()
            .get::<JwtClaims>()
            .cloned()
            .ok_or_else(|| crate::errors::ServerError::AuthenticationError(AuthError::MissingToken).into());
        ready(claims)
    }
}

/// Issues access tokens. The server itself never mints tokens for callers; this exists for seed tooling and the
/// endpoint tests, signing with the same shared secret the verifier checks against.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn issue_token(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

/// Verifies bearer tokens. One instance is shared process-wide via `web::Data`.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

/// Extract the bearer token from the `Authorization` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::ValidationError(e.to_string()))?;
    value.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)
}
