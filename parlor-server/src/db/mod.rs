//! JSON/bincode-persisted record stores (C4): users, chat metadata, and
//! per-chat message logs. Each store is a thin in-memory `Vec` plus
//! `load`/`save`, opened per operation rather than held open — the data
//! is small enough that this is not a bottleneck.

pub mod chats_db;
pub mod message_log;
pub mod users_db;
