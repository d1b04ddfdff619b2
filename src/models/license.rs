//! License payload carried inside a signed token.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Signed license contents.
///
/// Field order here is the order the issuing tool serializes in, so tokens
/// produced by [`crate::license::issue_token`] are stable byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePayload {
    /// Owner name
    #[serde(rename = "user", alias = "name", default)]
    pub owner: String,

    /// Owner e-mail, used when no name was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Derived hardware id this license is bound to
    #[serde(rename = "device", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Expiry date as `YYYY-MM-DD`, inclusive
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,

    /// Enabled feature names
    #[serde(default)]
    pub features: BTreeSet<String>,

    /// Payload format version
    #[serde(rename = "ver", default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl LicensePayload {
    /// Name shown to the user and written to the watermark sheet.
    pub fn owner_identifier(&self) -> &str {
        if self.owner.is_empty() {
            self.email.as_deref().unwrap_or_default()
        } else {
            &self.owner
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_payload_keys() {
        let json = r#"{"name":"원초적 인사이트","email":"owner@example.com","exp":"2030-01-01","features":["community","youtube"]}"#;
        let payload: LicensePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.expiry.as_deref(), Some("2030-01-01"));
        assert!(payload.has_feature("community"));
        assert_eq!(payload.version, 1);
        assert!(payload.device_id.is_none());
        assert_eq!(payload.owner_identifier(), "원초적 인사이트");
    }

    #[test]
    fn test_owner_falls_back_to_email() {
        let json = r#"{"email":"owner@example.com","exp":"2030-01-01"}"#;
        let payload: LicensePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.owner_identifier(), "owner@example.com");
        assert!(payload.features.is_empty());
    }

    #[test]
    fn test_compact_serialization_order() {
        let payload = LicensePayload {
            owner: "kim".into(),
            email: None,
            device_id: Some("abc".into()),
            expiry: Some("2030-01-01".into()),
            features: ["youtube".to_string(), "community".to_string()].into(),
            version: 2,
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"user":"kim","device":"abc","exp":"2030-01-01","features":["community","youtube"],"ver":2}"#
        );
    }
}
