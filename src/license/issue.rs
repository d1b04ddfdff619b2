//! Offline license issuing.
//!
//! Keys are raw 32-byte Ed25519 seeds, stored base64-encoded. The private
//! seed must never ship with the application; only the public key is
//! embedded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};

use super::LicenseError;
use super::scheme::{decode_base64, encode_base64url};
use crate::models::LicensePayload;

/// A freshly generated signing key, base64-encoded.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub private_seed: String,
    pub public_key: String,
}

fn key_pair(seed: &[u8]) -> Result<Ed25519KeyPair, LicenseError> {
    Ed25519KeyPair::from_seed_unchecked(seed)
        .map_err(|e| LicenseError::Malformed(format!("invalid signing seed: {e}")))
}

/// Generate a new Ed25519 signing key.
pub fn generate_keypair() -> Result<KeyMaterial, LicenseError> {
    let mut seed = [0u8; 32];
    SystemRandom::new()
        .fill(&mut seed)
        .map_err(|_| LicenseError::Malformed("system randomness unavailable".into()))?;
    let pair = key_pair(&seed)?;
    Ok(KeyMaterial {
        private_seed: STANDARD.encode(seed),
        public_key: STANDARD.encode(pair.public_key().as_ref()),
    })
}

/// Sign a payload into a `base64url(payload).base64url(signature)` token.
///
/// The payload is serialized as compact JSON and those exact bytes are signed.
pub fn issue_token(payload: &LicensePayload, seed: &[u8]) -> Result<String, LicenseError> {
    let pair = key_pair(seed)?;
    let bytes = serde_json::to_vec(payload)
        .map_err(|e| LicenseError::Malformed(format!("payload encoding failed: {e}")))?;
    let signature = pair.sign(&bytes);
    Ok(format!(
        "{}.{}",
        encode_base64url(&bytes),
        encode_base64url(signature.as_ref())
    ))
}

/// [`issue_token`] with a base64-encoded seed.
pub fn issue_token_b64(payload: &LicensePayload, seed_b64: &str) -> Result<String, LicenseError> {
    issue_token(payload, &decode_base64(seed_b64)?)
}
