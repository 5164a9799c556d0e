//! Chat metadata and message logs (C5, chat half).

use {
    crate::{
        db::{chats_db::ChatsDb, message_log},
        error::ServerError,
    },
    parlor_sdk::model::{Chat, ChatMessage, ChatSummary, MessageLog},
    std::path::PathBuf,
    uuid::Uuid,
};

pub struct ChatManager {
    db: ChatsDb,
    db_path: PathBuf,
    data_dir: PathBuf,
    message_page_size: usize,
    modified: std::collections::HashSet<Uuid>,
}

impl ChatManager {
    pub fn load(data_dir: PathBuf, message_page_size: usize) -> Result<Self, ServerError> {
        let db_path = data_dir.join("chats.db");
        let db = ChatsDb::load(&db_path)?;
        Ok(Self { db, db_path, data_dir, message_page_size, modified: Default::default() })
    }

    pub fn create_chat(&mut self, creator_uuid: Uuid, name: String, participants: Vec<Uuid>) -> Uuid {
        let chat = Chat::new(creator_uuid, name, participants);
        let uuid = chat.uuid;
        self.db.push(chat);
        self.modified.insert(uuid);
        uuid
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Chat> {
        self.db.get(uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Chat> {
        self.modified.insert(uuid);
        self.db.get_mut(uuid)
    }

    /// Chats containing `uuid`, sorted by `last_message_ts` descending.
    pub fn chats_for_participant(&self, uuid: Uuid) -> Vec<ChatSummary> {
        let mut chats = self.db.by_participant(uuid);
        chats.sort_by(|a, b| b.last_message_ts.cmp(&a.last_message_ts));
        chats.into_iter().map(|c| ChatSummary { uuid: c.uuid, name: c.name.clone() }).collect()
    }

    pub fn load_messages(&self, chat_uuid: Uuid) -> Result<MessageLog, ServerError> {
        message_log::load(&self.data_dir, chat_uuid)
    }

    /// Appends `msg`, bumps `last_message_ts` to `now`, marks the chat
    /// dirty. Caller persists via `save_chat_messages`/`save_if_modified`.
    pub fn add_chat_message(&mut self, chat_uuid: Uuid, msg: ChatMessage, now: i64) -> Result<(), ServerError> {
        let mut log = self.load_messages(chat_uuid)?;
        log.push(msg);
        message_log::save(&self.data_dir, chat_uuid, &log)?;

        if let Some(chat) = self.db.get_mut(chat_uuid) {
            chat.last_message_ts = now;
        }
        self.modified.insert(chat_uuid);
        Ok(())
    }

    pub fn page_size(&self) -> usize {
        self.message_page_size
    }

    pub fn save_if_modified(&mut self) -> Result<(), ServerError> {
        if self.modified.is_empty() {
            return Ok(());
        }
        self.db.save(&self.db_path)?;
        self.modified.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_chat_message_bumps_timestamp_and_persists() {
        let dir = tempdir().unwrap();
        let mut mgr = ChatManager::load(dir.path().to_path_buf(), 8).unwrap();
        let creator = Uuid::new_v4();
        let chat_uuid = mgr.create_chat(creator, "g".into(), vec![]);

        mgr.add_chat_message(chat_uuid, ChatMessage::system("hi", 42), 42).unwrap();
        assert_eq!(mgr.get(chat_uuid).unwrap().last_message_ts, 42);

        let log = mgr.load_messages(chat_uuid).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn chats_for_participant_sorts_by_recency() {
        let dir = tempdir().unwrap();
        let mut mgr = ChatManager::load(dir.path().to_path_buf(), 8).unwrap();
        let user = Uuid::new_v4();
        let old = mgr.create_chat(user, "old".into(), vec![]);
        let new = mgr.create_chat(user, "new".into(), vec![]);
        mgr.get_mut(old).unwrap().last_message_ts = 1;
        mgr.get_mut(new).unwrap().last_message_ts = 2;

        let chats = mgr.chats_for_participant(user);
        assert_eq!(chats[0].uuid, new);
        assert_eq!(chats[1].uuid, old);
    }
}
