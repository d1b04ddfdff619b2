//! Signature schemes accepted for license tokens.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use ring::signature::{ED25519, RSA_PKCS1_2048_8192_SHA256, UnparsedPublicKey};

use super::LicenseError;

/// Production Ed25519 verification key (32 bytes).
pub const EMBEDDED_ED25519_PUBLIC_KEY: &str = "tOxeYlTPOXGR2Ha5xZhgQuIngS5o6+mhyOM/UIZvxg4=";

/// Production RSA verification key for legacy envelopes (PKCS#1 DER).
pub const EMBEDDED_RSA_PUBLIC_KEY: &str = "MIIBCgKCAQEArKP6ZAW9BrfLvLvpkFXu16dzpGHPx8Icgxd/dE/+MR9fPiTINye4jp23Bc+5zcr6jUsRcXPTQ374Gae4hsW+HOVrLhEtkeZkEw+/QwBbWOQhMz3XafG470Y5rCa3FLGGGoYq8HYQncNKxiqU7Lm/YHXqzxyOOO6w0a6kozdTvbwRLswfE/baDCwgMXcvqHp6YlLUzH9MAOdkfBC3ryNMBh96vbnIZDu3RS2/73n1MXMOOjsiFfnNYyvJNzFnq7Iv1pOjKfrblZ0aVTpjb2G90yPbfSqL85JPPPw+ehguj8PtPH8xNOaorZ8gB1ekKVDt/MPAuqK1lZh3xg+ergwvCQIDAQAB";

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Decode base64url, padded or not. Standard-alphabet input is accepted too.
pub fn decode_base64url(text: &str) -> Result<Vec<u8>, LicenseError> {
    let normalized: String = text
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_LENIENT
        .decode(normalized)
        .map_err(|e| LicenseError::Malformed(format!("invalid base64url: {e}")))
}

/// Decode standard base64, padded or not.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, LicenseError> {
    STANDARD_LENIENT
        .decode(text.trim())
        .map_err(|e| LicenseError::Malformed(format!("invalid base64: {e}")))
}

/// Unpadded base64url, the encoding used inside dot tokens.
pub fn encode_base64url(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verifies detached signatures.
pub trait SignatureScheme: Send + Sync {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 over the raw payload bytes.
#[derive(Debug, Clone)]
pub struct Ed25519Scheme {
    public_key: Vec<u8>,
}

impl Ed25519Scheme {
    pub fn new(public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }

    pub fn embedded() -> Result<Self, LicenseError> {
        Ok(Self::new(decode_base64(EMBEDDED_ED25519_PUBLIC_KEY)?))
    }
}

impl SignatureScheme for Ed25519Scheme {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        UnparsedPublicKey::new(&ED25519, &self.public_key)
            .verify(message, signature)
            .is_ok()
    }
}

/// RSA PKCS#1 v1.5 with SHA-256.
#[derive(Debug, Clone)]
pub struct RsaScheme {
    public_key_der: Vec<u8>,
}

impl RsaScheme {
    pub fn new(public_key_der: impl Into<Vec<u8>>) -> Self {
        Self {
            public_key_der: public_key_der.into(),
        }
    }

    pub fn embedded() -> Result<Self, LicenseError> {
        Ok(Self::new(decode_base64(EMBEDDED_RSA_PUBLIC_KEY)?))
    }
}

impl SignatureScheme for RsaScheme {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, &self.public_key_der)
            .verify(message, signature)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_keys_decode() {
        assert_eq!(decode_base64(EMBEDDED_ED25519_PUBLIC_KEY).unwrap().len(), 32);
        assert!(RsaScheme::embedded().is_ok());
    }

    #[test]
    fn test_base64url_padding_is_optional() {
        assert_eq!(decode_base64url("aGk").unwrap(), b"hi");
        assert_eq!(decode_base64url("aGk=").unwrap(), b"hi");
        assert_eq!(decode_base64url("-_8").unwrap(), decode_base64url("+/8").unwrap());
        assert!(matches!(decode_base64url("a$b"), Err(LicenseError::Malformed(_))));
    }

    #[test]
    fn test_wrong_key_rejects() {
        let scheme = Ed25519Scheme::new(vec![0u8; 32]);
        assert!(!scheme.verify(b"payload", &[0u8; 64]));
    }
}
