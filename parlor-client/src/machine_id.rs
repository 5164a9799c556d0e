//! Stable per-machine identifier used to derive the key store's
//! encryption key (§4.3). `spec.md` leaves the exact derivation out of
//! scope ("external collaborator"); this reads the systemd
//! `/etc/machine-id` where available and falls back to the hostname
//! everywhere else (containers without systemd, non-Linux hosts).

use crate::error::ClientError;

pub fn machine_identifier() -> Result<String, ClientError> {
    if let Ok(contents) = std::fs::read_to_string("/etc/machine-id") {
        let id = contents.trim();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }
    hostname().ok_or_else(|| ClientError::KeyStore("no machine identifier available".into()))
}

fn hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.is_empty() {
            return Some(name);
        }
    }
    let output = std::process::Command::new("hostname").output().ok()?;
    let name = String::from_utf8(output.stdout).ok()?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
