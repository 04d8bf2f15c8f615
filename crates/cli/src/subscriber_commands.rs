use clap::Subcommand;

use {
    parlor_channels::{Subscriber, SubscriberStore},
    parlor_config::ParlorConfig,
    parlor_memory::{SqliteSubscriberStore, open_pool},
};

#[derive(Subcommand)]
pub enum SubscriberAction {
    /// List subscribed chats.
    List,
    /// Remove a chat from the list.
    Remove { chat: String },
}

pub async fn handle_subscribers(action: SubscriberAction, config: &ParlorConfig) -> anyhow::Result<()> {
    let pool = open_pool(&config.memory.db_path).await?;
    let store = SqliteSubscriberStore::new(pool);

    match action {
        SubscriberAction::List => {
            let subscribers = store.list().await?;
            if subscribers.is_empty() {
                println!("No subscribers.");
            }
            for s in &subscribers {
                println!("{}", format_subscriber(s));
            }
        },
        SubscriberAction::Remove { chat } => {
            if store.remove(&chat).await? {
                println!("Removed {chat}.");
            } else {
                println!("{chat} was not subscribed.");
            }
        },
    }
    Ok(())
}

fn format_subscriber(s: &Subscriber) -> String {
    match s.username {
        Some(ref name) => format!("{}  @{name}", s.chat_id),
        None => s.chat_id.clone(),
    }
}
