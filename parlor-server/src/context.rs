//! Single server context value threaded through the main loop, replacing
//! the process-wide singletons (user manager, chat manager, handshake
//! registry, pending-chats set) a naively ported implementation would
//! reach for.

use {
    crate::{
        actions::ActionQueue, chat_manager::ChatManager, error::ServerError,
        handshake::HandshakeRegistry, orchestrator::Orchestrator, settings::Settings,
        user_manager::UserManager,
    },
};

pub struct ServerContext {
    pub users: UserManager,
    pub chats: ChatManager,
    pub handshakes: HandshakeRegistry,
    pub orchestrator: Orchestrator,
    pub actions: ActionQueue,
}

impl ServerContext {
    pub fn load(settings: &Settings) -> Result<Self, ServerError> {
        let users = UserManager::load(settings.data_dir.join("users.db"))?;
        let chats = ChatManager::load(settings.data_dir.clone(), settings.message_page_size)?;
        Ok(Self {
            users,
            chats,
            handshakes: HandshakeRegistry::default(),
            orchestrator: Orchestrator::default(),
            actions: ActionQueue::default(),
        })
    }
}
