use super::config::JwtConfig;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Serialize, de::DeserializeOwned};

pub use jsonwebtoken::errors::Error as JwtError;

/// HS256 signer and verifier for arbitrary claim sets.
///
/// Verification checks the signature, `exp`, and the `aud` claim against the
/// expected audience.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtCodec {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    pub fn encode<C: Serialize>(&self, claims: &C) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    pub fn decode<C: DeserializeOwned>(&self, token: &str, audience: &str) -> Result<C, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[audience]);
        Ok(decode::<C>(token, &self.decoding, &validation)?.claims)
    }
}
