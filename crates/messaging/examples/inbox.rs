//! Minimal inbox: connect, load conversations, and stream updates.
//!
//! ```sh
//! ROAMLY_AUTH_TOKEN=... cargo run --example inbox
//! ```

use std::sync::Arc;
use std::time::Duration;

use roamly_messaging::{Config, Messenger};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let token = std::env::var("ROAMLY_AUTH_TOKEN")?;

    let messenger = Arc::new(Messenger::new(&config, token)?);
    messenger.initialize().await?;

    let conversations = messenger.conversations().await;
    println!(
        "{} conversations, {} unread",
        conversations.len(),
        messenger.total_unread().await
    );
    for conversation in &conversations {
        let preview = conversation
            .last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("(no messages)");
        println!("  {}  [{}]  {}", conversation.id, conversation.unread_count, preview);
    }

    if let Some(first) = conversations.first() {
        messenger.select_conversation(first.id).await?;
        for message in messenger.messages().await {
            println!("{}  {}: {}", message.created_at, message.sender_id, message.content);
        }
    }

    // Keep streaming push updates for a bit
    let driver = Arc::clone(&messenger).run();
    tokio::time::sleep(Duration::from_secs(30)).await;

    driver.abort();
    messenger.shutdown();
    Ok(())
}
