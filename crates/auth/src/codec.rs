//! Signing and verification of access credential values.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::AccessClaims;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Bad structure, bad signature, or claims that do not deserialize.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Port for turning claims into an opaque signed value and back.
///
/// `decode` verifies structure and signature only; the embedded time window
/// is checked by [`crate::validate_claims`] against an explicit `now`.
pub trait AccessTokenCodec: Send + Sync {
    fn encode(&self, claims: &AccessClaims) -> Result<String, CodecError>;

    fn decode(&self, token: &str) -> Result<AccessClaims, CodecError>;
}

/// HMAC-SHA256 JWT codec.
pub struct Hs256JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256JwtCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks are done by `validate_claims` with a caller-provided clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256JwtCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtCodec").finish_non_exhaustive()
    }
}

impl AccessTokenCodec for Hs256JwtCodec {
    fn encode(&self, claims: &AccessClaims) -> Result<String, CodecError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<AccessClaims, CodecError> {
        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }
}
