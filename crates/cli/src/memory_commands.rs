use std::collections::HashMap;

use clap::Subcommand;

use {
    parlor_common::ids::ConversationId,
    parlor_config::ParlorConfig,
    parlor_memory::{MemoryRecord, MemoryStore, SqliteMemoryStore, open_pool},
};

#[derive(Subcommand)]
pub enum MemoryAction {
    /// Show the newest records of one chat, oldest first.
    Recent {
        /// Platform chat ID (e.g. a Telegram chat id).
        #[arg(long)]
        chat: String,
        /// Maximum number of records to show.
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Output records as JSON for scripting.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Count the records stored for one chat.
    Count {
        #[arg(long)]
        chat: String,
    },
}

pub async fn handle_memory(action: MemoryAction, config: &ParlorConfig) -> anyhow::Result<()> {
    let pool = open_pool(&config.memory.db_path).await?;
    let store = SqliteMemoryStore::new(pool);
    let agent = config.agent.agent_id();

    match action {
        MemoryAction::Recent { chat, limit, json } => {
            let conversation = ConversationId::for_chat(&chat, agent);
            let records = store.query_recent(conversation, limit).await?;
            if json {
                print_json(&records)?;
            } else if records.is_empty() {
                println!("No records for chat {chat}.");
            } else {
                let names = participant_names(&store, conversation).await?;
                for line in format_records(&records, &names, &config.agent.name) {
                    println!("{line}");
                }
            }
        },
        MemoryAction::Count { chat } => {
            let count = store
                .count_records(ConversationId::for_chat(&chat, agent))
                .await?;
            println!("{count}");
        },
    }
    Ok(())
}

async fn participant_names(
    store: &SqliteMemoryStore,
    conversation: ConversationId,
) -> anyhow::Result<HashMap<String, String>> {
    Ok(store
        .participants(conversation)
        .await?
        .into_iter()
        .map(|p| (p.id.to_string(), p.display_name().to_string()))
        .collect())
}

fn format_records(
    records: &[MemoryRecord],
    names: &HashMap<String, String>,
    agent_name: &str,
) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            let name = names
                .get(&r.participant_id.to_string())
                .map(String::as_str)
                .unwrap_or(agent_name);
            match r.content.action.as_deref() {
                Some(action) => format!("{name}: {} ({action})", r.content.text),
                None => format!("{name}: {}", r.content.text),
            }
        })
        .collect()
}

fn print_json(records: &[MemoryRecord]) -> anyhow::Result<()> {
    let items: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id.to_string(),
                "participant_id": r.participant_id.to_string(),
                "created_at": r.created_at,
                "text": r.content.text,
                "action": r.content.action,
                "in_reply_to": r.content.in_reply_to.map(|id| id.to_string()),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}
