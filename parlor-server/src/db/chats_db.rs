use {
    crate::error::ServerError,
    parlor_sdk::model::Chat,
    serde::{Deserialize, Serialize},
    std::path::Path,
    uuid::Uuid,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatsFile {
    entries: Vec<Chat>,
}

/// JSON-persisted `{entries: [{uuid, creator_uuid, name, participants,
/// participants_e2e, last_message_ts}, …]}`.
#[derive(Debug, Default)]
pub struct ChatsDb {
    entries: Vec<Chat>,
}

impl ChatsDb {
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let file: ChatsFile = serde_json::from_str(&contents)?;
        Ok(Self { entries: file.entries })
    }

    pub fn save(&self, path: &Path) -> Result<(), ServerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = ChatsFile { entries: self.entries.clone() };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn all(&self) -> &[Chat] {
        &self.entries
    }

    pub fn push(&mut self, chat: Chat) {
        self.entries.push(chat);
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Chat> {
        self.entries.iter().find(|c| c.uuid == uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Chat> {
        self.entries.iter_mut().find(|c| c.uuid == uuid)
    }

    /// Linear scan; caller sorts by `last_message_ts desc` before emitting.
    pub fn by_participant(&self, uuid: Uuid) -> Vec<&Chat> {
        self.entries.iter().filter(|c| c.is_participant(uuid)).collect()
    }
}
