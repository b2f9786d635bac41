/// Terminal chat shell: onboarding and the two screens
///
/// Presentation glue over the synchronization engine: a conversation-list
/// screen and a chat screen, each owning its polling loop for exactly as
/// long as it is mounted.
use crate::config::Config;
use crate::error::{DuetError, Result};
use crate::poller::{spawn_conversation_poll, spawn_message_poll};
use crate::profile::ProfileStore;
use crate::session::Session;
use crate::store_client::StoreClient;
use crate::types::{ClientEvent, Conversation, RenderedMessage, User};
use colored::*;
use rand::Rng;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;

const AVATAR_COLORS: [&str; 6] = ["red", "green", "yellow", "blue", "magenta", "cyan"];

type InputLines = Lines<BufReader<Stdin>>;

enum ListOutcome {
    Open(Conversation),
    Logout,
    Quit,
}

enum ChatOutcome {
    Back,
    Quit,
}

enum ShellOutcome {
    Logout,
    Quit,
}

pub async fn run(config: Config) -> Result<()> {
    let store = StoreClient::new(&config.store_url, config.request_timeout)?;
    let profiles = ProfileStore::new(&config.data_dir)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let me = match profiles.load()? {
        Some(user) => user,
        None => onboard(&store, &profiles, &mut lines).await?,
    };
    println!(
        "{} Signed in as {}",
        "✓".green().bold(),
        me.username.as_str().color(me.avatar_color.as_str()).bold()
    );

    let session = Session::new(config, store, me);
    match run_screens(&session, &mut lines).await? {
        ShellOutcome::Quit => Ok(()),
        ShellOutcome::Logout => {
            profiles.clear()?;
            println!(
                "{}",
                "Profile cleared. Run duet again to create a new one.".yellow()
            );
            Ok(())
        }
    }
}

/// Create a profile on the store service. Failures show a notice and the
/// prompt comes back, so onboarding can be retried until it succeeds.
async fn onboard(
    store: &StoreClient,
    profiles: &ProfileStore,
    lines: &mut InputLines,
) -> Result<User> {
    println!(
        "{}",
        "Welcome to Duet! Let's set up your profile.".bright_cyan().bold()
    );
    loop {
        print!("{}", "Pick a username: ".bright_white());
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Err(DuetError::Validation(
                "input closed during onboarding".to_string(),
            ));
        };
        let username = line.trim();
        if username.is_empty() {
            eprintln!("{}", "Username cannot be empty".yellow());
            continue;
        }

        let color = AVATAR_COLORS[rand::thread_rng().gen_range(0..AVATAR_COLORS.len())];
        match store.create_user(username, color).await {
            Ok(user) => {
                profiles.save(&user)?;
                return Ok(user);
            }
            Err(error) => {
                eprintln!(
                    "{} Could not create your profile: {}",
                    "✗".red().bold(),
                    error
                );
                eprintln!("  Check that the store service is reachable and try again.");
            }
        }
    }
}

async fn run_screens(session: &Session, lines: &mut InputLines) -> Result<ShellOutcome> {
    loop {
        let list_poll = spawn_conversation_poll(session);
        let outcome = conversation_list_screen(session, lines).await;
        list_poll.stop();
        match outcome? {
            ListOutcome::Open(conversation) => {
                let message_poll = spawn_message_poll(session, &conversation.id);
                let outcome = chat_screen(session, &conversation, lines).await;
                message_poll.stop();
                if matches!(outcome?, ChatOutcome::Quit) {
                    return Ok(ShellOutcome::Quit);
                }
            }
            ListOutcome::Logout => return Ok(ShellOutcome::Logout),
            ListOutcome::Quit => return Ok(ShellOutcome::Quit),
        }
    }
}

async fn conversation_list_screen(
    session: &Session,
    lines: &mut InputLines,
) -> Result<ListOutcome> {
    let mut rx = session.subscribe();
    let mut conversations: Vec<Conversation> = Vec::new();
    println!(
        "{}",
        "Conversations: number to open, @username to start, users, logout, quit".dimmed()
    );

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(ListOutcome::Quit) };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                match input {
                    "q" | "quit" => return Ok(ListOutcome::Quit),
                    "logout" => return Ok(ListOutcome::Logout),
                    "users" => {
                        print_users(session).await;
                        continue;
                    }
                    _ => {}
                }
                if let Some(name) = input.strip_prefix('@') {
                    match start_with_user(session, name).await {
                        Ok(conversation) => return Ok(ListOutcome::Open(conversation)),
                        Err(error) => eprintln!("{} {}", "✗".red().bold(), error),
                    }
                    continue;
                }
                match input.parse::<usize>() {
                    Ok(index) if index >= 1 && index <= conversations.len() => {
                        return Ok(ListOutcome::Open(conversations[index - 1].clone()));
                    }
                    _ => eprintln!(
                        "{}",
                        "Enter a conversation number, @username, users, logout, or quit".yellow()
                    ),
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(ClientEvent::ConversationsUpdated { conversations: updated }) => {
                        if updated != conversations {
                            conversations = updated;
                            render_conversations(session, &conversations).await;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return Ok(ListOutcome::Quit),
                }
            }
        }
    }
}

async fn start_with_user(session: &Session, name: &str) -> Result<Conversation> {
    let peer = session.find_user_by_name(name.trim()).await?;
    session.open_conversation(&peer.id).await
}

async fn print_users(session: &Session) {
    match session.list_users().await {
        Ok(users) => {
            println!("{}", format!("Users ({})", users.len()).bright_cyan().bold());
            for user in users {
                if user.id == session.me().id {
                    continue;
                }
                println!(
                    "  {}",
                    user.username.as_str().color(user.avatar_color.as_str())
                );
            }
        }
        Err(error) => eprintln!("{} Could not list users: {}", "✗".red().bold(), error),
    }
}

async fn render_conversations(session: &Session, conversations: &[Conversation]) {
    println!();
    println!(
        "{}",
        format!("Conversations ({})", conversations.len())
            .bright_cyan()
            .bold()
    );
    if conversations.is_empty() {
        println!("{}", "  No conversations yet. @username starts one".dimmed());
        return;
    }
    for (index, conversation) in conversations.iter().enumerate() {
        let label = match conversation.peer_of(&session.me().id) {
            Some(peer_id) => match session.resolve_peer(peer_id).await {
                Ok(peer) => peer.username.as_str().color(peer.avatar_color.as_str()).bold(),
                Err(_) => peer_id.dimmed(),
            },
            None => "?".dimmed(),
        };
        let preview = conversation
            .last_message_text
            .as_deref()
            .unwrap_or("");
        println!("  {} {} {}", format!("{}.", index + 1).bright_white(), label, preview.dimmed());
    }
}

async fn chat_screen(
    session: &Session,
    conversation: &Conversation,
    lines: &mut InputLines,
) -> Result<ChatOutcome> {
    let peer_label = match conversation.peer_of(&session.me().id) {
        Some(peer_id) => match session.resolve_peer(peer_id).await {
            Ok(peer) => peer.username,
            Err(_) => peer_id.to_string(),
        },
        None => "conversation".to_string(),
    };
    println!(
        "{}",
        format!("Chatting with {} (type a message, /back, /quit)", peer_label).dimmed()
    );

    let mut rx = session.subscribe();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(ChatOutcome::Quit) };
                let input = line.trim();
                match input {
                    "" => continue,
                    "/back" => return Ok(ChatOutcome::Back),
                    "/quit" => return Ok(ChatOutcome::Quit),
                    _ => match session.send_text(&conversation.id, input).await {
                        Ok(_) => {}
                        Err(DuetError::Validation(_)) => {
                            eprintln!("{}", "Cannot send an empty message".yellow());
                        }
                        Err(error) => {
                            eprintln!("{} Could not send: {}", "✗".red().bold(), error);
                        }
                    },
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if event_conversation(&event) != Some(conversation.id.as_str()) {
                            continue;
                        }
                        let entries = session.rendered_view(&conversation.id).await;
                        render_chat(&peer_label, &entries);
                        if let ClientEvent::SendFailed { reason, .. } = event {
                            eprintln!(
                                "{} Message failed to send: {}. It was not delivered.",
                                "✗".red().bold(),
                                reason
                            );
                        }
                    }
                    Err(RecvError::Lagged(_)) => {
                        let entries = session.rendered_view(&conversation.id).await;
                        render_chat(&peer_label, &entries);
                    }
                    Err(RecvError::Closed) => return Ok(ChatOutcome::Back),
                }
            }
        }
    }
}

fn event_conversation(event: &ClientEvent) -> Option<&str> {
    match event {
        ClientEvent::MessagesUpdated { conversation_id }
        | ClientEvent::MessagePending { conversation_id, .. }
        | ClientEvent::MessageConfirmed { conversation_id, .. }
        | ClientEvent::SendFailed { conversation_id, .. } => Some(conversation_id),
        ClientEvent::ConversationsUpdated { .. } => None,
    }
}

fn render_chat(peer_label: &str, entries: &[RenderedMessage]) {
    println!();
    println!("{}", format!("── {} ──", peer_label).bright_cyan().bold());
    for entry in entries {
        let label = if entry.is_mine { "you" } else { peer_label };
        println!(
            "  {} {}",
            format!("{}:", label).color(entry.author_color.as_str()).bold(),
            entry.text
        );
    }
    println!();
}
