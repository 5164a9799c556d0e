//! Parlor relay server library: the pieces `parlord` wires together, split
//! out so the main loop can be driven from integration tests against the
//! in-memory transport instead of a real socket.

pub mod actions;
pub mod chat_manager;
pub mod context;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod orchestrator;
pub mod settings;
pub mod user_manager;

use {
    crate::{actions::DeferredAction, context::ServerContext, error::ServerError},
    parlor_sdk::transport::{ConnectionId, ServerTransport},
};

/// One iteration of the main loop (§4.8): pump the transport, register or
/// drop connections, dispatch each event, evict idle handshakes, then
/// drain the deferred-action queue to a fixed point and flush anything
/// the event loop marked dirty.
pub async fn run_once<T: ServerTransport>(ctx: &mut ServerContext, transport: &mut T) -> Result<(), ServerError> {
    let pumped = transport.pump().await?;

    for conn in pumped.newly_connected {
        ctx.users.register_connection(conn);
    }

    for (conn, event) in pumped.events {
        if let Err(e) = dispatch::dispatch_event(ctx, conn, event) {
            log_dispatch_error(&e);
            if matches!(e, ServerError::Persistence(_)) {
                return Err(e);
            }
        }
    }

    for conn in pumped.disconnected {
        ctx.users.drop_connection(conn);
    }

    for id in ctx.handshakes.evict_idle() {
        log::info!("evicted idle handshake {id}");
    }

    for (id, conn_sender, conn_receiver) in ctx.handshakes.drain_waiting_for_init() {
        send_init(ctx, &id, conn_sender, conn_receiver);
    }

    drain_actions(ctx, transport).await?;
    ctx.chats.save_if_modified()?;
    Ok(())
}

fn send_init(ctx: &mut ServerContext, handshake_id: &str, conn_sender: ConnectionId, conn_receiver: ConnectionId) {
    use parlor_sdk::events::{HandshakeAction, HandshakeData, HandshakeEnvelope, ServerEvent};

    ctx.actions.push(DeferredAction::Send(
        conn_sender,
        ServerEvent::E2eHandshake(HandshakeEnvelope {
            handshake_id: handshake_id.to_string(),
            action: HandshakeAction::InitSend,
            data: HandshakeData::None,
        }),
    ));
    ctx.actions.push(DeferredAction::Send(
        conn_receiver,
        ServerEvent::E2eHandshake(HandshakeEnvelope {
            handshake_id: handshake_id.to_string(),
            action: HandshakeAction::InitRecv,
            data: HandshakeData::None,
        }),
    ));
}

async fn drain_actions<T: ServerTransport>(ctx: &mut ServerContext, transport: &mut T) -> Result<(), ServerError> {
    while let Some(action) = ctx.actions.pop() {
        match action {
            DeferredAction::Send(conn, event) => {
                transport.send(conn, event).await?;
            }
            DeferredAction::CheckE2e(chat_uuid) => {
                if let Some(chat) = ctx.chats.get_mut(chat_uuid) {
                    ctx.orchestrator.check_e2e(chat, &ctx.users, &mut ctx.handshakes);
                }
            }
            DeferredAction::CheckE2eOnLogin(login_uuid) => {
                ctx.orchestrator.check_e2e_on_login(login_uuid, &mut ctx.chats, &ctx.users, &mut ctx.handshakes);
            }
            DeferredAction::HandshakeComplete { chat_uuid, sender_uuid, receiver_uuid } => {
                if let Some(chat) = ctx.chats.get_mut(chat_uuid) {
                    ctx.orchestrator.on_handshake_complete(chat, sender_uuid, receiver_uuid);
                }
                ctx.actions.push(DeferredAction::CheckE2e(chat_uuid));
            }
        }
    }
    Ok(())
}

/// Per-kind disposition for an error raised while dispatching one event:
/// auth failures are already reported via a `_RESULT` event by the
/// handler itself, everything else is logged here and the connection is
/// left open except for persistence failures, which abort the pump.
fn log_dispatch_error(err: &ServerError) {
    match err {
        ServerError::AuthFailure(msg) => log::warn!("auth failure: {msg}"),
        ServerError::Unauthorized => {}
        ServerError::NotFound(what) => log::warn!("not found: {what}"),
        ServerError::Crypto(e) => log::error!("crypto error during dispatch: {e}"),
        ServerError::Protocol(msg) => log::warn!("protocol error: {msg}"),
        ServerError::Transport(e) => log::error!("transport error during dispatch: {e}"),
        ServerError::Persistence(msg) => log::error!("persistence error, aborting pump: {msg}"),
    }
}
