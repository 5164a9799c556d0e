//! Drives two `Client`s against a real `ServerContext` over the in-memory
//! transport: signup, chat creation, the full E2E handshake, and an
//! encrypted message round trip, all through the session API a terminal
//! UI would call.

use {
    parlor_client::{keystore::KeyStore, session::Client},
    parlor_sdk::{
        events::ServerEvent,
        model::MessageContent,
        transport::memory::{MemoryClientTransport, MemoryServerTransport},
    },
    parlor_server::{context::ServerContext, settings::Settings},
    tempfile::TempDir,
};

fn server_ctx() -> (ServerContext, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings { data_dir: dir.path().to_path_buf(), ..Settings::default() };
    (ServerContext::load(&settings).unwrap(), dir)
}

fn client(transport: MemoryClientTransport, machine_id: &str) -> (Client<MemoryClientTransport>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let keystore = KeyStore::load(dir.path().join("keys.db"), machine_id).unwrap();
    (Client::new(transport, keystore), dir)
}

async fn settle(ctx: &mut ServerContext, server: &mut MemoryServerTransport) {
    for _ in 0..4 {
        parlor_server::run_once(ctx, server).await.unwrap();
    }
}

#[tokio::test]
async fn full_flow_signup_handshake_and_encrypted_message() {
    let (mut ctx, _dir) = server_ctx();
    let mut server = MemoryServerTransport::new();

    let (mut alice, _alice_dir) = client(server.connect(), "machine-alice");
    let (mut bob, _bob_dir) = client(server.connect(), "machine-bob");

    alice.sign_up("alice", "H1").await.unwrap();
    settle(&mut ctx, &mut server).await;
    let (events, _) = alice.pump().await.unwrap();
    assert!(matches!(events[0], ServerEvent::SignUpResult { success: true, .. }));
    assert!(alice.is_logged_in());

    bob.sign_up("bob", "H2").await.unwrap();
    settle(&mut ctx, &mut server).await;
    let (events, _) = bob.pump().await.unwrap();
    let ServerEvent::SignUpResult { success: true, uuid: Some(bob_uuid) } = events[0] else {
        panic!("bob sign up failed");
    };

    alice.create_chat("friends", vec![bob_uuid]).await.unwrap();
    settle(&mut ctx, &mut server).await;

    let (alice_events, _) = alice.pump().await.unwrap();
    let chat_uuid = alice_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::NewChatCreated { chat } => Some(chat.uuid),
            _ => None,
        })
        .expect("chat created");

    let (bob_events, _) = bob.pump().await.unwrap();
    assert!(bob_events.iter().any(|e| matches!(e, ServerEvent::NewChatCreated { .. })));

    bob.request_missing_keys(chat_uuid).await.unwrap();
    settle(&mut ctx, &mut server).await;

    // Drive the handshake to completion: each pump() call internally answers
    // whatever E2E handshake step the server just sent.
    for _ in 0..4 {
        alice.pump().await.unwrap();
        bob.pump().await.unwrap();
        settle(&mut ctx, &mut server).await;
    }

    let plaintext = "hey bob";
    let packet = alice.encrypt_message(chat_uuid, plaintext).unwrap();
    alice.send_message(chat_uuid, packet).await.unwrap();
    settle(&mut ctx, &mut server).await;

    let (bob_events, _) = bob.pump().await.unwrap();
    let bob_message = bob_events
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::RequestSendMessageFilled { message, .. } => Some(message),
            _ => None,
        })
        .expect("bob receives the message");
    assert!(matches!(bob_message.content, MessageContent::Packet(_)));

    let rendered = bob.render_content(chat_uuid, bob_message.content);
    assert_eq!(rendered, plaintext, "bob should have received alice's chat key and decrypted cleanly");
}

#[tokio::test]
async fn decrypting_without_the_key_falls_back_to_placeholder() {
    let (mut ctx, _dir) = server_ctx();
    let mut server = MemoryServerTransport::new();
    let (mut alice, _d1) = client(server.connect(), "machine-alice");
    let (mut charlie, _d2) = client(server.connect(), "machine-charlie");

    alice.sign_up("alice", "H1").await.unwrap();
    settle(&mut ctx, &mut server).await;
    alice.pump().await.unwrap();

    charlie.sign_up("charlie", "H3").await.unwrap();
    settle(&mut ctx, &mut server).await;
    charlie.pump().await.unwrap();

    alice.create_chat("solo", vec![]).await.unwrap();
    settle(&mut ctx, &mut server).await;
    let (alice_events, _) = alice.pump().await.unwrap();
    let chat_uuid = alice_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::NewChatCreated { chat } => Some(chat.uuid),
            _ => None,
        })
        .unwrap();

    let packet = alice.encrypt_message(chat_uuid, "secret").unwrap();
    let rendered = charlie.render_content(chat_uuid, MessageContent::Packet(packet));
    assert_eq!(rendered, "???");
}
