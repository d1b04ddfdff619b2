//! License verification and issuing.
//!
//! Two token formats are accepted:
//!
//! - `base64url(payload).base64url(signature)` signed with Ed25519, the format
//!   [`issue_token`] produces,
//! - a legacy JSON envelope `{"payload": ..., "signature": ...}` signed with
//!   RSA PKCS#1 v1.5 / SHA-256.

mod device;
mod issue;
mod scheme;
mod store;
mod verifier;

use thiserror::Error;

use crate::models::LicensePayload;

pub use device::{DeviceIdentity, FixedDeviceId, SystemDeviceId, derive_device_id};
pub use issue::{KeyMaterial, generate_keypair, issue_token, issue_token_b64};
pub use scheme::{Ed25519Scheme, RsaScheme, SignatureScheme};
pub use store::{LICENSE_FILE, LicenseStore, StoredToken};
pub use verifier::LicenseVerifier;

/// Why a license was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseError {
    #[error("signature verification failed")]
    BadSignature,

    #[error("license expired on {0}")]
    Expired(String),

    #[error("license has no expiry date")]
    MissingExpiry,

    #[error("malformed license: {0}")]
    Malformed(String),

    #[error("license is bound to a different device")]
    DeviceMismatch,

    #[error("no license found; activate one first")]
    NotFound,

    #[error("license does not include the '{0}' feature")]
    MissingFeature(String),

    #[error("could not save license: {0}")]
    Storage(String),
}

/// Fail unless the payload enables `feature`.
pub fn require_feature(payload: &LicensePayload, feature: &str) -> Result<(), LicenseError> {
    if payload.has_feature(feature) {
        Ok(())
    } else {
        Err(LicenseError::MissingFeature(feature.to_string()))
    }
}
