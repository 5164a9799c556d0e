//! End-to-end scenarios driven over the in-memory transport, one test
//! per scenario from the relay's design notes.

use {
    parlor_sdk::{
        events::{ClientEvent, HandshakeAction, ServerEvent},
        model::MessageContent,
        packet::DataPacket,
        transport::{memory::MemoryServerTransport, ClientTransport},
    },
    parlor_server::{context::ServerContext, settings::Settings},
    tempfile::TempDir,
};

fn ctx() -> (ServerContext, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings { data_dir: dir.path().to_path_buf(), ..Settings::default() };
    (ServerContext::load(&settings).unwrap(), dir)
}

/// Runs the pump loop enough times for a burst of dispatch-triggered
/// actions (handshake creation, fan-out sends) to settle.
async fn settle(ctx: &mut ServerContext, server: &mut MemoryServerTransport) {
    for _ in 0..4 {
        parlor_server::run_once(ctx, server).await.unwrap();
    }
}

async fn drain<T: ClientTransport>(client: &mut T) -> Vec<ServerEvent> {
    client.pump().await.unwrap().0
}

async fn first<T: ClientTransport>(client: &mut T) -> ServerEvent {
    drain(client).await.into_iter().next().expect("at least one event")
}

#[tokio::test]
async fn s1_signup_then_case_insensitive_login() {
    let (mut ctx, _dir) = ctx();
    let mut server = MemoryServerTransport::new();
    let mut alice = server.connect();

    alice
        .send(ClientEvent::AttemptSignUp { username: "alice".into(), password_hash: "H1".into() })
        .await
        .unwrap();
    settle(&mut ctx, &mut server).await;

    let ServerEvent::SignUpResult { success: true, uuid: Some(uuid) } = first(&mut alice).await else {
        panic!("expected successful sign up");
    };

    drop(alice);
    settle(&mut ctx, &mut server).await;
    let mut alice = server.connect();
    alice
        .send(ClientEvent::AttemptLogin { username: "ALICE".into(), password_hash: "H1".into() })
        .await
        .unwrap();
    settle(&mut ctx, &mut server).await;

    let ServerEvent::LoginResult { success: true, uuid: Some(logged_in_uuid) } = first(&mut alice).await else {
        panic!("expected successful login");
    };
    assert_eq!(logged_in_uuid, uuid);
}

#[tokio::test]
async fn s2_s3_s4_create_chat_and_handshake_with_offline_custodian() {
    let (mut ctx, _dir) = ctx();
    let mut server = MemoryServerTransport::new();

    let mut alice = server.connect();
    alice
        .send(ClientEvent::AttemptSignUp { username: "alice".into(), password_hash: "H".into() })
        .await
        .unwrap();
    settle(&mut ctx, &mut server).await;
    let ServerEvent::SignUpResult { success: true, uuid: Some(_alice_uuid) } = first(&mut alice).await else {
        panic!("alice sign up failed");
    };

    let mut bob = server.connect();
    bob.send(ClientEvent::AttemptSignUp { username: "bob".into(), password_hash: "H".into() }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    let ServerEvent::SignUpResult { success: true, uuid: Some(bob_uuid) } = first(&mut bob).await else {
        panic!("bob sign up failed");
    };

    // S4: Bob disconnects before the chat exists so he's offline when it's created.
    drop(bob);
    settle(&mut ctx, &mut server).await;

    alice
        .send(ClientEvent::RequestCreateChat { chat_name: "g".into(), participants: vec![bob_uuid] })
        .await
        .unwrap();
    settle(&mut ctx, &mut server).await;

    let alice_events = drain(&mut alice).await;
    let chat_uuid = alice_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::NewChatCreated { chat } => Some(chat.uuid),
            _ => None,
        })
        .expect("new chat created");
    assert!(alice_events.iter().any(|e| matches!(e, ServerEvent::CreateNewKeys { .. })));

    // Bob is offline and not a custodian: request_missing_keys queues the chat rather
    // than starting a handshake (S4).
    let mut bob = server.connect();
    bob.send(ClientEvent::AttemptLogin { username: "bob".into(), password_hash: "H".into() }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    drain(&mut bob).await;

    bob.send(ClientEvent::RequestMissingKeys { chat_uuid }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    assert!(ctx.orchestrator.is_pending(chat_uuid));

    // Bob drops again; Alice reconnects and logs in, which should walk pending
    // chats she's part of and kick the handshake from S3 off now that she's
    // the online custodian.
    drop(bob);
    settle(&mut ctx, &mut server).await;

    let mut alice2 = server.connect();
    alice2.send(ClientEvent::AttemptLogin { username: "alice".into(), password_hash: "H".into() }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    drain(&mut alice2).await;

    let mut bob = server.connect();
    bob.send(ClientEvent::AttemptLogin { username: "bob".into(), password_hash: "H".into() }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    drain(&mut bob).await;

    bob.send(ClientEvent::RequestMissingKeys { chat_uuid }).await.unwrap();
    settle(&mut ctx, &mut server).await;

    let alice_events = drain(&mut alice2).await;
    let init_send = alice_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::E2eHandshake(env) if env.action == HandshakeAction::InitSend => Some(env.handshake_id.clone()),
            _ => None,
        })
        .expect("alice gets INIT_SEND");

    let bob_events = drain(&mut bob).await;
    assert!(bob_events.iter().any(
        |e| matches!(e, ServerEvent::E2eHandshake(env) if env.action == HandshakeAction::InitRecv && env.handshake_id == init_send)
    ));
}

#[tokio::test]
async fn s5_message_fans_out_with_is_own_per_recipient() {
    let (mut ctx, _dir) = ctx();
    let mut server = MemoryServerTransport::new();

    let mut alice = server.connect();
    alice.send(ClientEvent::AttemptSignUp { username: "alice".into(), password_hash: "H".into() }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    let ServerEvent::SignUpResult { success: true, .. } = first(&mut alice).await else {
        panic!("alice sign up failed");
    };

    let mut bob = server.connect();
    bob.send(ClientEvent::AttemptSignUp { username: "bob".into(), password_hash: "H".into() }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    let ServerEvent::SignUpResult { success: true, uuid: Some(bob_uuid) } = first(&mut bob).await else {
        panic!("bob sign up failed");
    };

    alice
        .send(ClientEvent::RequestCreateChat { chat_name: "g".into(), participants: vec![bob_uuid] })
        .await
        .unwrap();
    settle(&mut ctx, &mut server).await;
    let alice_events = drain(&mut alice).await;
    let chat_uuid = alice_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::NewChatCreated { chat } => Some(chat.uuid),
            _ => None,
        })
        .unwrap();
    drain(&mut bob).await;

    let mut packet = DataPacket::plain(b"hello".to_vec());
    packet.encrypt(&parlor_sdk::crypto::RsaKeyPair::generate().unwrap().public).unwrap();
    alice.send(ClientEvent::RequestSendMessage { chat_uuid, message_content: packet }).await.unwrap();
    settle(&mut ctx, &mut server).await;

    let alice_events = drain(&mut alice).await;
    let bob_events = drain(&mut bob).await;

    let alice_view = alice_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::RequestSendMessageFilled { message, .. } => Some(message.clone()),
            _ => None,
        })
        .expect("alice sees her own message");
    assert!(alice_view.is_own);
    assert!(matches!(alice_view.content, MessageContent::Packet(_)));
    assert!(alice_view.sender_uuid.is_some());

    let bob_view = bob_events
        .iter()
        .find_map(|e| match e {
            ServerEvent::RequestSendMessageFilled { message, .. } => Some(message.clone()),
            _ => None,
        })
        .expect("bob sees alice's message");
    assert!(!bob_view.is_own);
}

#[tokio::test]
async fn s6_non_member_request_is_silently_dropped() {
    let (mut ctx, _dir) = ctx();
    let mut server = MemoryServerTransport::new();

    let mut alice = server.connect();
    alice.send(ClientEvent::AttemptSignUp { username: "alice".into(), password_hash: "H".into() }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    drain(&mut alice).await;

    alice.send(ClientEvent::RequestCreateChat { chat_name: "g".into(), participants: vec![] }).await.unwrap();
    settle(&mut ctx, &mut server).await;
    let chat_uuid = drain(&mut alice)
        .await
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::NewChatCreated { chat } => Some(chat.uuid),
            _ => None,
        })
        .unwrap();

    let mut charlie = server.connect();
    charlie
        .send(ClientEvent::AttemptSignUp { username: "charlie".into(), password_hash: "H".into() })
        .await
        .unwrap();
    settle(&mut ctx, &mut server).await;
    drain(&mut charlie).await;

    charlie.send(ClientEvent::RequestGetMessages { chat_uuid, messages_page: 0 }).await.unwrap();
    settle(&mut ctx, &mut server).await;

    let events = drain(&mut charlie).await;
    assert!(events.is_empty(), "non-member request must not produce a response, got {:?}", events);
}
