use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{validate_claims, JwtClaims, TokenValidationError};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token could not be decoded: {0}")]
    Decode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Token validator boundary, so the HTTP layer can be tested with fakes.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HS256 validator over a shared secret.
pub struct Hs256JwtValidator {
    decoding_key: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(&secret),
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        // Time-window checks are done by `validate_claims` against the
        // claims model (RFC3339 timestamps), not jsonwebtoken's numeric
        // `exp`/`nbf` handling.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| JwtError::Decode(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
