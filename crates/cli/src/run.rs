use std::sync::Arc;

use {
    anyhow::Context,
    tracing::{info, warn},
};

use {
    parlor_auto_reply::{
        AgentIdentity, AgentRuntime, ConversationQueue, LoggingEvaluator, PipelineSettings,
    },
    parlor_channels::SubscriberStore,
    parlor_config::ParlorConfig,
    parlor_memory::{
        MemoryManager, SqliteMemoryStore, SqliteSubscriberStore,
        embeddings_openai::OpenAiEmbeddingProvider, open_pool,
    },
    parlor_providers::{LlmProvider, OpenAiProvider, OpenAiVisionDescriber},
    parlor_telegram::{SharedDeps, TelegramChannel},
};

/// Wire everything from config, start every Telegram account and block
/// until Ctrl-C.
pub async fn run(config: ParlorConfig) -> anyhow::Result<()> {
    let pool = open_pool(&config.memory.db_path)
        .await
        .with_context(|| format!("opening {}", config.memory.db_path))?;
    let runtime = build_runtime(&config, pool.clone())?;

    let deps = SharedDeps {
        runtime: Arc::new(runtime),
        queue: ConversationQueue::new(),
        subscribers: Some(Arc::new(SqliteSubscriberStore::new(pool)) as Arc<dyn SubscriberStore>),
    };
    let telegram = TelegramChannel::new(deps);

    let started = telegram.start_all(&config.channels.telegram).await?;
    if started == 0 {
        warn!("no telegram accounts configured; nothing to do");
        return Ok(());
    }
    info!(accounts = started, agent = %config.agent.name, "parlor running");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    telegram.stop_all();
    Ok(())
}

/// Build the agent runtime from the `openai` provider entry.
pub fn build_runtime(config: &ParlorConfig, pool: sqlx::SqlitePool) -> anyhow::Result<AgentRuntime> {
    let entry = config
        .providers
        .get("openai")
        .context("no enabled [providers.openai] entry")?;
    let provider = Arc::new(OpenAiProvider::from_entry(entry)?);

    let store = Arc::new(SqliteMemoryStore::new(pool));
    let embeddings = &config.memory.embeddings;
    let memory = match (embeddings.enabled, entry.api_key.clone()) {
        (true, Some(key)) => {
            let mut embedder = OpenAiEmbeddingProvider::new(key)
                .with_model(embeddings.model.clone(), embeddings.dimensions);
            if let Some(ref url) = entry.base_url {
                embedder = embedder.with_base_url(url.clone());
            }
            MemoryManager::new(store, Arc::new(embedder))
        },
        _ => MemoryManager::without_embeddings(store, embeddings.dimensions),
    };

    let identity = AgentIdentity {
        id: config.agent.agent_id(),
        name: config.agent.name.clone(),
        username: config.agent.username.clone(),
    };
    let describer = OpenAiVisionDescriber::new(Arc::clone(&provider), entry.vision_model.clone());

    Ok(AgentRuntime::new(
        identity,
        config.character.clone(),
        Arc::new(memory),
        provider as Arc<dyn LlmProvider>,
    )
    .with_describer(Arc::new(describer))
    .with_evaluator(Arc::new(LoggingEvaluator))
    .with_settings(PipelineSettings::from_config(config)))
}
