use {
    crate::error::ServerError,
    parlor_sdk::model::User,
    serde::{Deserialize, Serialize},
    std::path::Path,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    entries: Vec<User>,
}

/// JSON-persisted `{entries: [{username, password_hash, uuid}, …]}`.
#[derive(Debug, Default)]
pub struct UsersDb {
    entries: Vec<User>,
}

impl UsersDb {
    /// Missing file is not an error: start empty.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let file: UsersFile = serde_json::from_str(&contents)?;
        Ok(Self { entries: file.entries })
    }

    pub fn save(&self, path: &Path) -> Result<(), ServerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = UsersFile { entries: self.entries.clone() };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn all(&self) -> &[User] {
        &self.entries
    }

    pub fn push(&mut self, user: User) {
        self.entries.push(user);
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.entries.iter().find(|u| u.username_matches(username))
    }

    pub fn username_taken(&self, username: &str) -> bool {
        self.find_by_username(username).is_some()
    }

    pub fn find_by_uuid(&self, uuid: uuid::Uuid) -> Option<&User> {
        self.entries.iter().find(|u| u.uuid == uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let db = UsersDb::load(&dir.path().join("users.db")).unwrap();
        assert!(db.all().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.db");
        let mut db = UsersDb::default();
        db.push(User::new("alice".into(), "hash".into()));
        db.save(&path).unwrap();

        let reloaded = UsersDb::load(&path).unwrap();
        assert_eq!(reloaded.all().len(), 1);
        assert!(reloaded.username_taken("ALICE"));
    }
}
