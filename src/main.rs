use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use pitchlink::api::client::ApiClient;
use pitchlink::api::events;
use pitchlink::app::AppState;
use pitchlink::storage::Cache;
use pitchlink::utils::{RUNTIME, spawn_async};
use pitchlink::{CurrentUser, Inbox};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let state = AppState::load();
    if !state.is_configured() {
        error!("Set base_url and user_id in pitchlink.toml under your config directory");
        std::process::exit(2);
    }
    if let Err(e) = RUNTIME.block_on(run(state)) {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(state: AppState) -> pitchlink::Result<()> {
    let client = Arc::new(ApiClient::new(&state.base_url, state.token.clone()));
    let user = CurrentUser { id: state.user_id.clone(), name: state.user_name.clone() };
    let mut inbox = Inbox::new(client.clone(), user).with_meeting_base_url(&state.meeting_base_url);

    let mut cache = match Cache::open_default() {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("Conversation cache unavailable: {}", e);
            None
        }
    };
    if let Some(cache) = &cache {
        match cache.conversations(Some(200)) {
            Ok(cached) if !cached.is_empty() => {
                inbox.restore(cached);
                print_inbox(&inbox);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read cached conversations: {}", e),
        }
    }

    match client.ping().await {
        Ok(status) => info!("Server answered ping with HTTP {}", status),
        Err(e) => warn!("Server ping failed: {}", e),
    }

    let loaded = inbox.load().await.map(|_| ());
    match loaded {
        Ok(()) => {
            save(&mut cache, &inbox);
            print_inbox(&inbox);
        }
        Err(e) if !inbox.conversations().is_empty() => warn!("Failed to load conversations, showing cache: {}", e),
        Err(e) => return Err(e),
    }

    let Some(ws_url) = state.ws_url.clone() else {
        return Ok(());
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let token = state.token.clone();
    spawn_async(async move {
        if let Err(e) = events::listen(&ws_url, token.as_deref(), tx).await {
            error!("Event socket failed: {}", e);
        }
    });

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    inbox.apply_event(event);
                    print_inbox(&inbox);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    save(&mut cache, &inbox);
    Ok(())
}

fn save(cache: &mut Option<Cache>, inbox: &Inbox) {
    if let Some(cache) = cache.as_mut() {
        if let Err(e) = cache.upsert(inbox.conversations()) {
            warn!("Failed to cache conversations: {}", e);
        }
    }
}

fn print_inbox(inbox: &Inbox) {
    println!("Conversations ({} unread)", inbox.total_unread());
    for conv in inbox.conversations() {
        let mut line = format!("  {} · {}", conv.participant.name, conv.project.title);
        if conv.unread_count > 0 {
            line.push_str(&format!(" [{} new]", conv.unread_count));
        }
        if !conv.nda_signed {
            line.push_str(" (NDA pending)");
        }
        if inbox.is_typing(&conv.id) {
            line.push_str(" typing…");
        }
        println!("{}", line);
    }
}
