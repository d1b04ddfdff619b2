//! Hardware-derived device identifier.

use std::process::Command;

use sha2::{Digest, Sha256};

/// Length of the derived identifier in hex characters.
const DEVICE_ID_LEN: usize = 32;

/// Source of the identifier a license may be bound to.
pub trait DeviceIdentity: Send + Sync {
    fn current_device_id(&self) -> Option<String>;
}

/// Hash a raw platform identifier into a device id.
pub fn derive_device_id(raw: &str) -> String {
    let digest = Sha256::digest(raw.trim().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(DEVICE_ID_LEN);
    id
}

/// Reads the platform machine id of the running host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceId;

impl DeviceIdentity for SystemDeviceId {
    fn current_device_id(&self) -> Option<String> {
        raw_machine_id()
            .or_else(|| {
                hostname::get()
                    .ok()
                    .map(|h| h.to_string_lossy().into_owned())
            })
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| derive_device_id(&raw))
    }
}

/// A fixed identifier, for issuing licenses to another machine and for tests.
#[derive(Debug, Clone)]
pub struct FixedDeviceId(pub Option<String>);

impl DeviceIdentity for FixedDeviceId {
    fn current_device_id(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg_attr(not(any(target_os = "windows", target_os = "macos")), allow(dead_code))]
fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(target_os = "windows")]
fn raw_machine_id() -> Option<String> {
    let out = command_stdout(
        "reg",
        &[
            "query",
            r"HKLM\SOFTWARE\Microsoft\Cryptography",
            "/v",
            "MachineGuid",
        ],
    )?;
    parse_reg_machine_guid(&out)
}

#[cfg(target_os = "macos")]
fn raw_machine_id() -> Option<String> {
    let out = command_stdout("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])?;
    parse_ioreg_uuid(&out)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn raw_machine_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Value of `MachineGuid` in `reg query` output.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_reg_machine_guid(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("MachineGuid"))
        .and_then(|line| line.split_whitespace().last())
        .map(str::to_string)
}

/// Value of `IOPlatformUUID` in `ioreg` output.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_ioreg_uuid(output: &str) -> Option<String> {
    let line = output.lines().find(|line| line.contains("IOPlatformUUID"))?;
    line.split('"').nth(3).map(str::to_string)
}
