//! Encrypted local key store (C3): records of `{encryption_key_id,
//! public_pem, private_pem}`, encrypted at rest with a key derived from
//! the machine identifier via the crypto crate's password mode. At-rest
//! layout is Fernet ciphertext of the serialized record list, line-wrapped
//! at 64 characters — purely cosmetic, stripped back out on load.

use {
    crate::error::ClientError,
    parlor_sdk::crypto::SymmetricKey,
    serde::{Deserialize, Serialize},
    std::path::PathBuf,
};

const LINE_WRAP: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyRecord {
    encryption_key_id: String,
    public_pem: String,
    private_pem: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyStoreFile {
    entries: Vec<KeyRecord>,
}

pub struct KeyStore {
    path: PathBuf,
    key: SymmetricKey,
    entries: Vec<KeyRecord>,
}

impl KeyStore {
    /// Missing file on open is not an error: treat as empty, create on
    /// next save.
    pub fn load(path: PathBuf, machine_id: &str) -> Result<Self, ClientError> {
        let key = SymmetricKey::from_password(machine_id.as_bytes())?;
        let entries = match std::fs::read_to_string(&path) {
            Ok(wrapped) => {
                let token: String = wrapped.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = key.decrypt(&token)?;
                let file: KeyStoreFile =
                    serde_json::from_slice(&bytes).map_err(|e| ClientError::KeyStore(e.to_string()))?;
                file.entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, key, entries })
    }

    pub fn save(&self) -> Result<(), ClientError> {
        let file = KeyStoreFile { entries: self.entries.clone() };
        let bytes = serde_json::to_vec(&file).map_err(|e| ClientError::KeyStore(e.to_string()))?;
        let token = self.key.encrypt(&bytes);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, wrap_lines(&token, LINE_WRAP))?;
        Ok(())
    }

    pub fn has(&self, encryption_key_id: &str) -> bool {
        self.entries.iter().any(|e| e.encryption_key_id == encryption_key_id)
    }

    pub fn get(&self, encryption_key_id: &str) -> Option<(String, String)> {
        self.entries
            .iter()
            .find(|e| e.encryption_key_id == encryption_key_id)
            .map(|e| (e.public_pem.clone(), e.private_pem.clone()))
    }

    pub fn put(&mut self, encryption_key_id: String, public_pem: String, private_pem: String) {
        match self.entries.iter_mut().find(|e| e.encryption_key_id == encryption_key_id) {
            Some(existing) => {
                existing.public_pem = public_pem;
                existing.private_pem = private_pem;
            }
            None => self.entries.push(KeyRecord { encryption_key_id, public_pem, private_pem }),
        }
    }
}

fn wrap_lines(s: &str, width: usize) -> String {
    s.as_bytes()
        .chunks(width)
        .map(|chunk| std::str::from_utf8(chunk).expect("fernet tokens are ASCII"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = KeyStore::load(dir.path().join("keys.db"), "machine-a").unwrap();
        assert!(!store.has("c_anything"));
    }

    #[test]
    fn put_then_save_then_reload_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.db");
        let mut store = KeyStore::load(path.clone(), "machine-a").unwrap();
        store.put("c_1".into(), "PUB".into(), "PRIV".into());
        store.save().unwrap();

        let reloaded = KeyStore::load(path, "machine-a").unwrap();
        assert_eq!(reloaded.get("c_1"), Some(("PUB".to_string(), "PRIV".to_string())));
    }

    #[test]
    fn wrong_machine_id_fails_to_decrypt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.db");
        let mut store = KeyStore::load(path.clone(), "machine-a").unwrap();
        store.put("c_1".into(), "PUB".into(), "PRIV".into());
        store.save().unwrap();

        let err = KeyStore::load(path, "machine-b").unwrap_err();
        assert!(matches!(err, ClientError::Crypto(_)));
    }
}
