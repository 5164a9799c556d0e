//! The deferred-action queue (§9): handlers return declarative actions
//! instead of calling peers directly, so the dispatcher stays flat and
//! re-entrant action production is explicit. Drained to a fixed point
//! once per pump, FIFO.

use {
    parlor_sdk::{events::ServerEvent, transport::ConnectionId},
    std::collections::VecDeque,
    uuid::Uuid,
};

pub enum DeferredAction {
    Send(ConnectionId, ServerEvent),
    CheckE2e(Uuid),
    CheckE2eOnLogin(Uuid),
    HandshakeComplete { chat_uuid: Uuid, sender_uuid: Uuid, receiver_uuid: Uuid },
}

#[derive(Default)]
pub struct ActionQueue {
    queue: VecDeque<DeferredAction>,
}

impl ActionQueue {
    pub fn push(&mut self, action: DeferredAction) {
        self.queue.push_back(action);
    }

    pub fn push_all(&mut self, actions: impl IntoIterator<Item = DeferredAction>) {
        self.queue.extend(actions);
    }

    pub fn pop(&mut self) -> Option<DeferredAction> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
