//! Chat server example
//!
//! Run with: cargo run --example chat_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example chat_server                    # binds to 0.0.0.0:3000
//!   cargo run --example chat_server 127.0.0.1:4000     # binds to 127.0.0.1:4000
//!   CHAT_AVATAR=gravatar cargo run --example chat_server
//!
//! The login flow is out of scope here, so the example seeds one demo session
//! and prints the cookie to connect with:
//!
//!   websocat -H 'Cookie: CHAT_SESSION=<id>' ws://localhost:3000/room
//!
//! Then type `{"Message":"hello"}` and every connected client receives it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chat_relay::identity::{
    SessionAuthenticator, SessionStore, UserData, EMAIL_KEY, FULL_NAME_KEY, USER_ID_KEY,
};
use chat_relay::{ChatServer, ServerConfig};

fn print_usage() {
    eprintln!("Usage: chat_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CHAT_BIND_ADDR           address to bind (overridden by BIND_ADDR)");
    eprintln!("  CHAT_AVATAR              provided-url | gravatar");
    eprintln!("  CHAT_OUTBOUND_CAPACITY   per-client queue size (default 256)");
    eprintln!("  CHAT_FANOUT_TIMEOUT_MS   evict clients whose queue stays full this long");
    eprintln!("  CHAT_LOGIN_PATH          redirect target for unauthenticated requests");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = ServerConfig::from_env()?;
    if let Some(addr) = args.get(1) {
        let addr: SocketAddr = addr.parse()?;
        config = config.bind(addr);
    }

    let store = SessionStore::new();
    let session = store.create_session(
        UserData::new()
            .with(USER_ID_KEY, "demo")
            .with(FULL_NAME_KEY, "Demo User")
            .with(EMAIL_KEY, "demo@example.com"),
    );

    println!("Starting chat server on {}", config.bind_addr);
    println!();
    println!("=== Connect ===");
    println!("Cookie: {}={}", config.session_cookie, session);
    println!("URL:    ws://{}{}", config.bind_addr, config.room_path);
    println!();

    let auth = SessionAuthenticator::new(store, config.session_cookie.clone());
    let server = Arc::new(ChatServer::new(config, auth));

    // Log room counters while running
    let stats_server = Arc::clone(&server);
    let stats_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let stats = stats_server.room().stats();
            tracing::info!(
                members = stats.members,
                messages = stats.messages,
                deliveries = stats.deliveries,
                evictions = stats.evictions,
                "Room stats"
            );
        }
    });

    let result = server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    stats_task.abort();
    if let Err(e) = result {
        eprintln!("Server error: {}", e);
    }

    Ok(())
}
