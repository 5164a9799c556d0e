//! Interactive terminal loop: a line at a time, dispatched to session
//! methods, with a background poll draining server events between
//! prompts. Commands are deliberately plain words rather than a clap
//! subcommand tree — there's no argv to parse here, just stdin.

use {
    crate::session::Client,
    colored::Colorize,
    parlor_sdk::{events::ServerEvent, model::MessageContent, transport::ClientTransport},
    sha2::{Digest, Sha256},
    std::io::Write,
    uuid::Uuid,
};

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn prompt(line: &str) -> std::io::Result<String> {
    print!("{line}");
    std::io::stdout().flush()?;
    let mut buf = String::new();
    std::io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

fn ok(msg: impl AsRef<str>) {
    println!("{} {}", "✔".green().bold(), msg.as_ref());
}

fn err(msg: impl AsRef<str>) {
    eprintln!("{} {}", "✘".red().bold(), msg.as_ref());
}

fn info(msg: impl AsRef<str>) {
    println!("{} {}", "·".truecolor(100, 100, 100), msg.as_ref());
}

/// Runs until the user types `quit` or the connection drops.
pub async fn run<T: ClientTransport>(mut client: Client<T>) -> anyhow::Result<()> {
    println!("{}", "parlor".bold().purple());
    println!("commands: signup <user> <pass> | login <user> <pass> | chats | open <chat-uuid> | create <name> <uuid,...> | send <chat-uuid> <text> | search <query> | missingkeys <chat-uuid> | quit");

    loop {
        print_pending(&mut client).await?;

        let line = prompt("> ")?;
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, ' ');
        let cmd = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();

        let result = match cmd {
            "quit" | "exit" => break,
            "signup" => handle_signup(&mut client, rest).await,
            "login" => handle_login(&mut client, rest).await,
            "chats" => client.request_chats_list().await.map_err(Into::into),
            "open" => handle_open(&mut client, rest).await,
            "create" => handle_create(&mut client, rest).await,
            "send" => handle_send(&mut client, rest).await,
            "search" => handle_search(&mut client, rest).await,
            "missingkeys" => handle_missing_keys(&mut client, rest).await,
            _ => {
                err(format!("unknown command: {cmd}"));
                Ok(())
            }
        };
        if let Err(e) = result {
            err(e.to_string());
        }
    }
    Ok(())
}

async fn print_pending<T: ClientTransport>(client: &mut Client<T>) -> anyhow::Result<()> {
    let (events, connected) = client.pump().await?;
    if !connected {
        err("disconnected from server");
    }
    for event in events {
        render_event(client, event);
    }
    Ok(())
}

fn render_event<T: ClientTransport>(client: &Client<T>, event: ServerEvent) {
    match event {
        ServerEvent::LoginResult { success, uuid } => {
            if success {
                ok(format!("logged in as {:?}", uuid));
            } else {
                err("login failed");
            }
        }
        ServerEvent::SignUpResult { success, uuid } => {
            if success {
                ok(format!("signed up as {:?}", uuid));
            } else {
                err("sign up failed (username taken?)");
            }
        }
        ServerEvent::RequestChatsListFilled { chats } => {
            for chat in chats {
                info(format!("{} — {}", chat.uuid, chat.name));
            }
        }
        ServerEvent::NewChatCreated { chat } => {
            ok(format!("new chat: {} — {}", chat.uuid, chat.name));
        }
        ServerEvent::RequestInitialMessagesFilled { chat_uuid, messages, .. }
        | ServerEvent::RequestGetMessagesFilled { chat_uuid, messages, .. } => {
            for message in messages {
                print_message(client, chat_uuid, message);
            }
        }
        ServerEvent::RequestSendMessageFilled { chat_uuid, message, .. } => {
            print_message(client, chat_uuid, message);
        }
        ServerEvent::RequestSearchForUsersFilled { results, result_action } => {
            info(format!("search results for {result_action}:"));
            for user in results {
                info(format!("  {} — {}", user.uuid, user.username));
            }
        }
        ServerEvent::CreateNewKeys { .. } | ServerEvent::E2eHandshake(_) => {
            // Handled internally by Client::pump before this ever surfaces.
        }
    }
}

fn print_message<T: ClientTransport>(client: &Client<T>, chat_uuid: Uuid, message: parlor_sdk::model::MessageView) {
    let text = match &message.content {
        MessageContent::Plain(t) => t.clone(),
        MessageContent::Packet(_) => client.render_content(chat_uuid, message.content.clone()),
    };
    let who = if message.from_server { "*".to_string() } else { message.sender_name.clone() };
    let marker = if message.is_own { "(you)" } else { "" };
    println!("  [{who}{marker}] {text}");
}

async fn handle_signup<T: ClientTransport>(client: &mut Client<T>, rest: &str) -> anyhow::Result<()> {
    let mut parts = rest.split_whitespace();
    let (Some(username), Some(password)) = (parts.next(), parts.next()) else {
        err("usage: signup <user> <pass>");
        return Ok(());
    };
    client.sign_up(username, &hash_password(password)).await?;
    Ok(())
}

async fn handle_login<T: ClientTransport>(client: &mut Client<T>, rest: &str) -> anyhow::Result<()> {
    let mut parts = rest.split_whitespace();
    let (Some(username), Some(password)) = (parts.next(), parts.next()) else {
        err("usage: login <user> <pass>");
        return Ok(());
    };
    client.login(username, &hash_password(password)).await?;
    Ok(())
}

async fn handle_open<T: ClientTransport>(client: &mut Client<T>, rest: &str) -> anyhow::Result<()> {
    let Ok(chat_uuid) = rest.trim().parse::<Uuid>() else {
        err("usage: open <chat-uuid>");
        return Ok(());
    };
    client.request_initial_messages(chat_uuid).await?;
    Ok(())
}

async fn handle_create<T: ClientTransport>(client: &mut Client<T>, rest: &str) -> anyhow::Result<()> {
    let mut parts = rest.splitn(2, ' ');
    let (Some(name), Some(participants_raw)) = (parts.next(), parts.next()) else {
        err("usage: create <name> <uuid,uuid,...>");
        return Ok(());
    };
    let mut participants = Vec::new();
    for token in participants_raw.split(',') {
        match token.trim().parse::<Uuid>() {
            Ok(uuid) => participants.push(uuid),
            Err(_) => {
                err(format!("not a uuid: {token}"));
                return Ok(());
            }
        }
    }
    client.create_chat(name, participants).await?;
    Ok(())
}

async fn handle_send<T: ClientTransport>(client: &mut Client<T>, rest: &str) -> anyhow::Result<()> {
    let mut parts = rest.splitn(2, ' ');
    let (Some(chat_uuid_raw), Some(text)) = (parts.next(), parts.next()) else {
        err("usage: send <chat-uuid> <text>");
        return Ok(());
    };
    let Ok(chat_uuid) = chat_uuid_raw.parse::<Uuid>() else {
        err("not a uuid");
        return Ok(());
    };
    let packet = client.encrypt_message(chat_uuid, text)?;
    client.send_message(chat_uuid, packet).await?;
    Ok(())
}

async fn handle_search<T: ClientTransport>(client: &mut Client<T>, rest: &str) -> anyhow::Result<()> {
    let query = rest.trim();
    if query.is_empty() {
        err("usage: search <query>");
        return Ok(());
    }
    client.search_for_users(query, 10, "invite").await?;
    Ok(())
}

async fn handle_missing_keys<T: ClientTransport>(client: &mut Client<T>, rest: &str) -> anyhow::Result<()> {
    let Ok(chat_uuid) = rest.trim().parse::<Uuid>() else {
        err("usage: missingkeys <chat-uuid>");
        return Ok(());
    };
    client.request_missing_keys(chat_uuid).await?;
    Ok(())
}
