//! HS256 JWT encode/decode.
//!
//! Signature verification lives here; claim-window checks stay in
//! [`crate::claims::validate_claims`] so they remain deterministic and
//! testable without key material.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtCodecError {
    #[error("token encoding failed: {0}")]
    Encode(String),

    #[error("token decoding failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Validates a bearer token into claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtCodecError>;
}

/// HS256 symmetric-key codec.
pub struct Hs256JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn encode(&self, claims: &JwtClaims) -> Result<String, JwtCodecError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtCodecError::Encode(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtCodec {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtCodecError> {
        // Claims carry RFC3339 timestamps rather than the registered `exp`
        // claim, so the library's own time checks are disabled and
        // `validate_claims` is authoritative.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| JwtCodecError::Decode(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
