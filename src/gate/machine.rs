//! Machine key derivation: SHA-256 over the system UUID.
//!
//! The UUID is hashed in its little-endian GUID byte layout, the same bytes
//! the embedded-mode service compares against.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::gate::error::{GateError, GateResult};

/// Supplies the machine's stable hardware identifier as a UUID string.
pub trait HardwareIdSource: Send + Sync {
    fn machine_uuid(&self) -> GateResult<String>;
}

/// A fixed identifier, for tests and non-Windows hosts.
#[derive(Debug, Clone)]
pub struct StaticHardwareId(pub String);

impl HardwareIdSource for StaticHardwareId {
    fn machine_uuid(&self) -> GateResult<String> {
        Ok(self.0.clone())
    }
}

/// Reads `Win32_ComputerSystemProduct.UUID` through PowerShell.
#[cfg(windows)]
#[derive(Debug, Default)]
pub struct WmiHardwareId;

#[cfg(windows)]
impl HardwareIdSource for WmiHardwareId {
    fn machine_uuid(&self) -> GateResult<String> {
        let output = std::process::Command::new("powershell.exe")
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-Command",
                "(Get-CimInstance -ClassName Win32_ComputerSystemProduct).UUID",
            ])
            .output()
            .map_err(|e| GateError::Identity {
                message: format!("spawn powershell: {e}"),
            })?;
        if !output.status.success() {
            return Err(GateError::Identity {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Hash of the machine identifier, computed once per instance.
pub struct MachineKey {
    source: Box<dyn HardwareIdSource>,
    cached: OnceLock<[u8; 32]>,
}

impl MachineKey {
    pub fn new(source: impl HardwareIdSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cached: OnceLock::new(),
        }
    }

    /// SHA-256 of the identifier's GUID bytes.
    pub fn digest(&self) -> GateResult<[u8; 32]> {
        if let Some(hash) = self.cached.get() {
            return Ok(*hash);
        }
        let raw = self.source.machine_uuid()?;
        let uuid = Uuid::parse_str(raw.trim().trim_matches('"')).map_err(|e| {
            GateError::Identity {
                message: format!("\"{raw}\" is not a UUID: {e}"),
            }
        })?;
        let hash: [u8; 32] = Sha256::digest(uuid.to_bytes_le()).into();
        let _ = self.cached.set(hash);
        Ok(hash)
    }
}

impl std::fmt::Debug for MachineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineKey")
            .field("cached", &self.cached.get().is_some())
            .finish()
    }
}
