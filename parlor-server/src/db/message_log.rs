//! Per-chat message log persistence: `<data_dir>/chats/<chat_uuid>.msgs`,
//! a `bincode`-serialized [`MessageLog`].

use {crate::error::ServerError, parlor_sdk::model::MessageLog, std::path::Path, uuid::Uuid};

pub fn path_for(data_dir: &Path, chat_uuid: Uuid) -> std::path::PathBuf {
    data_dir.join("chats").join(format!("{chat_uuid}.msgs"))
}

pub fn load(data_dir: &Path, chat_uuid: Uuid) -> Result<MessageLog, ServerError> {
    let path = path_for(data_dir, chat_uuid);
    if !path.exists() {
        return Ok(MessageLog::default());
    }
    let bytes = std::fs::read(&path)?;
    bincode::deserialize(&bytes).map_err(|e| ServerError::Persistence(e.to_string()))
}

pub fn save(data_dir: &Path, chat_uuid: Uuid, log: &MessageLog) -> Result<(), ServerError> {
    let path = path_for(data_dir, chat_uuid);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = bincode::serialize(log).map_err(|e| ServerError::Persistence(e.to_string()))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_sdk::model::ChatMessage;
    use tempfile::tempdir;

    #[test]
    fn missing_log_loads_empty() {
        let dir = tempdir().unwrap();
        let log = load(dir.path(), Uuid::new_v4()).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let chat_uuid = Uuid::new_v4();
        let mut log = MessageLog::default();
        log.push(ChatMessage::system("hello", 1));
        save(dir.path(), chat_uuid, &log).unwrap();

        let reloaded = load(dir.path(), chat_uuid).unwrap();
        assert_eq!(reloaded.len(), 1);
    }
}
