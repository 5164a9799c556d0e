//! Event dispatch (C9, step 4): one handler per server-bound tag,
//! enforcing the authorization and chat-membership rules and enqueuing
//! deferred actions rather than sending directly.

use {
    crate::{actions::DeferredAction, context::ServerContext, error::ServerError},
    parlor_sdk::{
        events::{ClientEvent, HandshakeAction, HandshakeEnvelope, ServerEvent},
        ids::key_id_for_chat,
        model::{Chat, ChatMessage, ChatSummary, MessageContent, MessageSender, MessageView, substitute_creator_token},
        transport::ConnectionId,
    },
    uuid::Uuid,
};

fn now_utc_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// `logged_in = true` on `conn`'s `ConnectedUser`, or `None` if the event
/// should be silently dropped per the authorization rule.
fn require_login(ctx: &ServerContext, conn: ConnectionId) -> Option<Uuid> {
    ctx.users.connected_user(conn).filter(|c| c.logged_in).and_then(|c| c.uuid)
}

/// `user_uuid` is a participant of `chat_uuid`, or `None` if the event
/// should be silently dropped per the chat-membership rule.
fn require_membership<'a>(ctx: &'a ServerContext, chat_uuid: Uuid, user_uuid: Uuid) -> Option<&'a Chat> {
    ctx.chats.get(chat_uuid).filter(|c| c.is_participant(user_uuid))
}

fn render_message(ctx: &ServerContext, chat: &Chat, msg: &ChatMessage, viewer: Uuid) -> MessageView {
    let (sender_uuid, sender_name, from_server, is_own) = match msg.sender {
        MessageSender::User(uuid) => {
            let name = ctx
                .users
                .find_by_uuid(uuid)
                .map(|u| u.username.clone())
                .unwrap_or_else(|| "Deleted User".to_string());
            (Some(uuid), name, false, uuid == viewer)
        }
        MessageSender::Server => (None, "Server".to_string(), true, false),
    };

    let content = match &msg.content {
        MessageContent::Plain(text) => {
            let creator_name = ctx.users.find_by_uuid(chat.creator_uuid).map(|u| u.username.as_str());
            MessageContent::Plain(substitute_creator_token(text, creator_name))
        }
        MessageContent::Packet(packet) => MessageContent::Packet(packet.clone()),
    };

    MessageView { content, sender_uuid, sender_name, timestamp: msg.timestamp, is_own, from_server }
}

pub fn dispatch_event(ctx: &mut ServerContext, conn: ConnectionId, event: ClientEvent) -> Result<(), ServerError> {
    match event {
        ClientEvent::AttemptLogin { username, password_hash } => {
            let (success, uuid) = ctx.users.attempt_login(conn, &username, &password_hash);
            ctx.actions.push(DeferredAction::Send(conn, ServerEvent::LoginResult { success, uuid }));
            if let Some(uuid) = uuid {
                ctx.actions.push(DeferredAction::CheckE2eOnLogin(uuid));
            }
            Ok(())
        }

        ClientEvent::AttemptSignUp { username, password_hash } => {
            let (success, uuid) = ctx.users.attempt_sign_up(conn, &username, &password_hash)?;
            ctx.actions.push(DeferredAction::Send(conn, ServerEvent::SignUpResult { success, uuid }));
            Ok(())
        }

        ClientEvent::RequestChatsList => {
            let Some(user_uuid) = require_login(ctx, conn) else { return Ok(()) };
            let chats = ctx.chats.chats_for_participant(user_uuid);
            ctx.actions.push(DeferredAction::Send(conn, ServerEvent::RequestChatsListFilled { chats }));
            Ok(())
        }

        ClientEvent::RequestInitialMessages { chat_uuid } => {
            let Some(user_uuid) = require_login(ctx, conn) else { return Ok(()) };
            let Some(chat) = require_membership(ctx, chat_uuid, user_uuid) else { return Ok(()) };
            let chat = chat.clone();
            let page_size = ctx.chats.page_size();
            let log = ctx.chats.load_messages(chat_uuid)?;
            let page = log.last_page_index(page_size);
            let messages = log.page(page, page_size).iter().map(|m| render_message(ctx, &chat, m, user_uuid)).collect();
            ctx.actions.push(DeferredAction::Send(
                conn,
                ServerEvent::RequestInitialMessagesFilled { chat_uuid, loaded_to_page: page, messages },
            ));
            Ok(())
        }

        ClientEvent::RequestGetMessages { chat_uuid, messages_page } => {
            let Some(user_uuid) = require_login(ctx, conn) else { return Ok(()) };
            let Some(chat) = require_membership(ctx, chat_uuid, user_uuid) else { return Ok(()) };
            let chat = chat.clone();
            let page_size = ctx.chats.page_size();
            let log = ctx.chats.load_messages(chat_uuid)?;
            let page = messages_page.min(log.last_page_index(page_size));
            let messages = log.page(page, page_size).iter().map(|m| render_message(ctx, &chat, m, user_uuid)).collect();
            ctx.actions.push(DeferredAction::Send(
                conn,
                ServerEvent::RequestGetMessagesFilled { chat_uuid, loaded_to_page: page, messages },
            ));
            Ok(())
        }

        ClientEvent::RequestSendMessage { chat_uuid, message_content } => {
            let Some(user_uuid) = require_login(ctx, conn) else { return Ok(()) };
            if require_membership(ctx, chat_uuid, user_uuid).is_none() {
                return Ok(());
            }
            let now = now_utc_secs();
            let msg = ChatMessage::from_user(user_uuid, message_content, now);
            ctx.chats.add_chat_message(chat_uuid, msg.clone(), now)?;

            let chat = ctx.chats.get(chat_uuid).expect("just wrote to this chat").clone();
            let page_size = ctx.chats.page_size();
            let loaded_to_page = ctx.chats.load_messages(chat_uuid)?.last_page_index(page_size);

            for participant in chat.participants.iter().copied() {
                if let Some(recipient_conn) = ctx.users.connection_for(participant) {
                    let message = render_message(ctx, &chat, &msg, participant);
                    ctx.actions.push(DeferredAction::Send(
                        recipient_conn,
                        ServerEvent::RequestSendMessageFilled { chat_uuid, loaded_to_page, message },
                    ));
                }
            }
            Ok(())
        }

        ClientEvent::RequestSearchForUsers { query, get_max, result_action } => {
            if require_login(ctx, conn).is_none() {
                return Ok(());
            }
            let results = ctx.users.search_by_username(&query, get_max);
            ctx.actions.push(DeferredAction::Send(
                conn,
                ServerEvent::RequestSearchForUsersFilled { results, result_action },
            ));
            Ok(())
        }

        ClientEvent::RequestCreateChat { chat_name, participants } => {
            let Some(creator_uuid) = require_login(ctx, conn) else { return Ok(()) };
            let chat_uuid = ctx.chats.create_chat(creator_uuid, chat_name, participants);

            let now = now_utc_secs();
            let system_text = "%[creator]% started a new chat".to_string();
            ctx.chats.add_chat_message(chat_uuid, ChatMessage::system(system_text, now), now)?;

            let chat = ctx.chats.get_mut(chat_uuid).expect("just created this chat");
            chat.mark_e2e_ready(creator_uuid);
            let chat = chat.clone();

            for participant in chat.participants.iter().copied() {
                if let Some(participant_conn) = ctx.users.connection_for(participant) {
                    ctx.actions.push(DeferredAction::Send(
                        participant_conn,
                        ServerEvent::NewChatCreated {
                            chat: ChatSummary { uuid: chat.uuid, name: chat.name.clone() },
                        },
                    ));
                }
            }
            ctx.actions.push(DeferredAction::Send(
                conn,
                ServerEvent::CreateNewKeys { encryption_key_id: key_id_for_chat(chat_uuid) },
            ));
            ctx.actions.push(DeferredAction::CheckE2e(chat_uuid));
            Ok(())
        }

        ClientEvent::RequestMissingKeys { chat_uuid } => {
            let Some(user_uuid) = require_login(ctx, conn) else { return Ok(()) };
            if require_membership(ctx, chat_uuid, user_uuid).is_none() {
                return Ok(());
            }
            if let Some(chat) = ctx.chats.get_mut(chat_uuid) {
                ctx.orchestrator.on_request_missing_keys(chat, user_uuid);
            }
            ctx.actions.push(DeferredAction::CheckE2e(chat_uuid));
            Ok(())
        }

        ClientEvent::E2eHandshake(envelope) => dispatch_handshake(ctx, conn, envelope),
    }
}

fn dispatch_handshake(ctx: &mut ServerContext, conn: ConnectionId, envelope: HandshakeEnvelope) -> Result<(), ServerError> {
    match envelope.action {
        HandshakeAction::InitRecv | HandshakeAction::InitSend => {
            log::warn!("client sent server-originated handshake action for {}", envelope.handshake_id);
            Ok(())
        }

        HandshakeAction::FinalSend => {
            let routed_to = match ctx.handshakes.relay_final_send(&envelope.handshake_id, conn) {
                Ok(conn) => conn,
                Err(ServerError::NotFound(_)) => {
                    log::warn!("FINAL_SEND for unknown handshake {}", envelope.handshake_id);
                    return Ok(());
                }
                Err(ServerError::Protocol(msg)) => {
                    log::warn!("{msg}");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            ctx.actions.push(DeferredAction::Send(
                routed_to,
                ServerEvent::E2eHandshake(HandshakeEnvelope {
                    handshake_id: envelope.handshake_id,
                    action: HandshakeAction::FinalSend,
                    data: envelope.data,
                }),
            ));
            Ok(())
        }

        HandshakeAction::FinalRecv => {
            let (conn_receiver, chat_uuid, conn_sender) =
                match ctx.handshakes.relay_final_recv(&envelope.handshake_id, conn) {
                    Ok(routed) => routed,
                    Err(ServerError::NotFound(_)) => {
                        log::warn!("FINAL_RECV for unknown handshake {}", envelope.handshake_id);
                        return Ok(());
                    }
                    Err(ServerError::Protocol(msg)) => {
                        log::warn!("{msg}");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                };

            let sender_uuid = ctx.users.connected_user(conn_sender).and_then(|c| c.uuid);
            let receiver_uuid = ctx.users.connected_user(conn_receiver).and_then(|c| c.uuid);

            ctx.actions.push(DeferredAction::Send(
                conn_receiver,
                ServerEvent::E2eHandshake(HandshakeEnvelope {
                    handshake_id: envelope.handshake_id,
                    action: HandshakeAction::FinalRecv,
                    data: envelope.data,
                }),
            ));

            if let (Some(sender_uuid), Some(receiver_uuid)) = (sender_uuid, receiver_uuid) {
                ctx.actions.push(DeferredAction::HandshakeComplete { chat_uuid, sender_uuid, receiver_uuid });
            }
            Ok(())
        }
    }
}
