//! License token verification.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use super::LicenseError;
use super::device::{DeviceIdentity, SystemDeviceId};
use super::scheme::{
    Ed25519Scheme, RsaScheme, SignatureScheme, decode_base64, decode_base64url,
};
use crate::models::LicensePayload;

/// Legacy RSA envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    payload: String,
    signature: String,
}

/// Checks tokens against the embedded keys, the calendar and this device.
pub struct LicenseVerifier {
    ed25519: Box<dyn SignatureScheme>,
    rsa: Box<dyn SignatureScheme>,
    device: Arc<dyn DeviceIdentity>,
}

impl LicenseVerifier {
    pub fn new(
        ed25519: Box<dyn SignatureScheme>,
        rsa: Box<dyn SignatureScheme>,
        device: Arc<dyn DeviceIdentity>,
    ) -> Self {
        Self {
            ed25519,
            rsa,
            device,
        }
    }

    /// Verifier with the production keys and this machine's identity.
    pub fn embedded() -> Result<Self, LicenseError> {
        Ok(Self::new(
            Box::new(Ed25519Scheme::embedded()?),
            Box::new(RsaScheme::embedded()?),
            Arc::new(SystemDeviceId),
        ))
    }

    /// Verify against today's local date.
    pub fn verify(&self, token: &str) -> Result<LicensePayload, LicenseError> {
        self.verify_at(token, chrono::Local::now().date_naive())
    }

    /// Verify against an explicit date.
    ///
    /// The signature covers the payload bytes exactly as carried in the token.
    /// Checks run in order: signature, payload shape, expiry, device.
    pub fn verify_at(&self, token: &str, today: NaiveDate) -> Result<LicensePayload, LicenseError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(LicenseError::Malformed("empty token".into()));
        }

        let (payload_bytes, signature, scheme) = if token.starts_with('{') {
            let envelope: Envelope = serde_json::from_str(token)
                .map_err(|e| LicenseError::Malformed(format!("invalid envelope: {e}")))?;
            (
                decode_base64(&envelope.payload)?,
                decode_base64(&envelope.signature)?,
                self.rsa.as_ref(),
            )
        } else {
            let parts: Vec<&str> = token.split('.').collect();
            let [payload, signature] = parts.as_slice() else {
                return Err(LicenseError::Malformed(format!(
                    "expected 2 dot-separated parts, found {}",
                    parts.len()
                )));
            };
            (
                decode_base64url(payload)?,
                decode_base64url(signature)?,
                self.ed25519.as_ref(),
            )
        };

        if !scheme.verify(&payload_bytes, &signature) {
            return Err(LicenseError::BadSignature);
        }

        let payload: LicensePayload = serde_json::from_slice(&payload_bytes)
            .map_err(|e| LicenseError::Malformed(format!("invalid payload: {e}")))?;

        let expiry = payload
            .expiry
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(LicenseError::MissingExpiry)?;
        let expiry_date = NaiveDate::parse_from_str(expiry, "%Y-%m-%d")
            .map_err(|_| LicenseError::Malformed(format!("expiry '{expiry}' is not YYYY-MM-DD")))?;
        if expiry_date < today {
            return Err(LicenseError::Expired(expiry.to_string()));
        }

        if let Some(bound) = payload.device_id.as_deref().filter(|d| !d.is_empty()) {
            let current = self.device.current_device_id();
            if current.as_deref() != Some(bound) {
                return Err(LicenseError::DeviceMismatch);
            }
        }

        Ok(payload)
    }
}
