// src/pipeline/license.rs

//! License commands and feature gating.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::Result;
use crate::license::{
    DeviceIdentity, KeyMaterial, LicenseStore, LicenseVerifier, generate_keypair,
    issue_token_b64, require_feature,
};
use crate::models::LicensePayload;
use crate::utils::log;

/// Load, verify and check the license for one feature.
pub fn authorize(
    store: &LicenseStore,
    verifier: &LicenseVerifier,
    feature: &str,
) -> Result<LicensePayload> {
    let stored = store.load()?;
    let payload = verifier.verify(&stored.token)?;
    require_feature(&payload, feature)?;
    log::info(&format!(
        "License OK for {} (feature '{}', expires {})",
        payload.owner_identifier(),
        feature,
        payload.expiry.as_deref().unwrap_or_default()
    ));
    Ok(payload)
}

/// Verify the stored license and print its contents.
pub fn run_verify(store: &LicenseStore, verifier: &LicenseVerifier) -> Result<LicensePayload> {
    log::header("License check");
    let stored = store.load()?;
    log::sub_item(&format!("Source: {}", stored.source));
    let payload = verifier.verify(&stored.token)?;
    log_payload(&payload);
    log::success("License is valid");
    Ok(payload)
}

/// Verify a token and save it for later runs.
pub fn run_activate(
    token: &str,
    store: &LicenseStore,
    verifier: &LicenseVerifier,
) -> Result<PathBuf> {
    log::header("License activation");
    let payload = verifier.verify(token)?;
    log_payload(&payload);
    let path = store.save(token)?;
    log::success(&format!("License saved to {}", path.display()));
    Ok(path)
}

/// Identifier to send when requesting a device-bound license.
pub fn run_device_id(device: &dyn DeviceIdentity) -> Option<String> {
    let id = device.current_device_id();
    match &id {
        Some(id) => log::info(&format!("Device ID: {id}")),
        None => log::warn("Device ID could not be determined on this machine"),
    }
    id
}

/// Generate a signing key pair.
pub fn run_keygen() -> Result<KeyMaterial> {
    let keys = generate_keypair()?;
    log::info("Generated Ed25519 key pair; keep the private seed off shipped builds");
    Ok(keys)
}

/// Fields of a license to issue.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub owner: String,
    pub email: Option<String>,
    pub device_id: Option<String>,
    pub expiry: chrono::NaiveDate,
    pub features: BTreeSet<String>,
}

/// Sign a new license token.
pub fn run_issue(request: IssueRequest, private_seed_b64: &str) -> Result<String> {
    let payload = LicensePayload {
        owner: request.owner,
        email: request.email,
        device_id: request.device_id,
        expiry: Some(request.expiry.format("%Y-%m-%d").to_string()),
        features: request.features,
        version: 1,
    };
    let token = issue_token_b64(&payload, private_seed_b64)?;
    log_payload(&payload);
    Ok(token)
}

fn log_payload(payload: &LicensePayload) {
    let features: Vec<&str> = payload.features.iter().map(String::as_str).collect();
    log::summary(
        "License",
        &[
            ("User", payload.owner_identifier().to_string()),
            ("Device", payload.device_id.clone().unwrap_or_else(|| "-".into())),
            ("Expires", payload.expiry.clone().unwrap_or_default()),
            ("Features", features.join(", ")),
        ],
    );
}
