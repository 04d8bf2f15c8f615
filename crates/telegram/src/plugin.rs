use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    anyhow::Result,
    tracing::{info, warn},
};

use crate::{
    bot::{self, SharedDeps},
    config::TelegramAccountConfig,
    state::AccountStateMap,
};

/// All Telegram bot accounts of one agent.
pub struct TelegramChannel {
    accounts: AccountStateMap,
    deps: SharedDeps,
}

impl TelegramChannel {
    pub fn new(deps: SharedDeps) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            deps,
        }
    }

    /// List all active account IDs.
    pub fn account_ids(&self) -> Vec<String> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = accounts.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Start one account from its raw config table.
    pub async fn start_account(&self, account_id: &str, config: serde_json::Value) -> Result<()> {
        let tg_config = TelegramAccountConfig::from_value(config)?;
        info!(account_id, "starting telegram account");
        bot::start_polling(
            account_id.to_string(),
            tg_config,
            Arc::clone(&self.accounts),
            self.deps.clone(),
        )
        .await?;
        Ok(())
    }

    /// Start every configured account. Fails on the first account that
    /// cannot start.
    pub async fn start_all(&self, accounts: &HashMap<String, serde_json::Value>) -> Result<usize> {
        let mut ids: Vec<&String> = accounts.keys().collect();
        ids.sort();
        for id in &ids {
            self.start_account(id, accounts[*id].clone()).await?;
        }
        Ok(ids.len())
    }

    pub fn stop_account(&self, account_id: &str) {
        let cancel = {
            let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
            accounts.get(account_id).map(|s| s.cancel.clone())
        };

        if let Some(cancel) = cancel {
            info!(account_id, "stopping telegram account");
            cancel.cancel();
            let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
            accounts.remove(account_id);
        } else {
            warn!(account_id, "telegram account not found");
        }
    }

    pub fn stop_all(&self) {
        for id in self.account_ids() {
            self.stop_account(&id);
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{outbound::TelegramOutbound, state::AccountState},
        parlor_auto_reply::{AgentIdentity, AgentRuntime, ConversationQueue, MessageOrchestrator},
        parlor_channels::ChannelOutbound,
        parlor_common::ids::AgentId,
        parlor_memory::{MemoryManager, SqliteMemoryStore, open_pool},
        parlor_providers::{ChatMessage, CompletionResponse, LlmProvider},
        tokio_util::sync::CancellationToken,
    };

    struct SilentLlm;

    #[async_trait::async_trait]
    impl LlmProvider for SilentLlm {
        fn name(&self) -> &str {
            "silent"
        }

        fn model_for(&self, _tier: parlor_common::types::ModelTier) -> &str {
            "silent"
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _tier: parlor_common::types::ModelTier,
        ) -> Result<CompletionResponse> {
            Ok(CompletionResponse::default())
        }
    }

    async fn channel() -> TelegramChannel {
        let pool = open_pool(":memory:").await.unwrap();
        let runtime = AgentRuntime::new(
            AgentIdentity {
                id: AgentId::from_config("mrs-beauty"),
                name: "Mrs Beauty".into(),
                username: None,
            },
            Default::default(),
            Arc::new(MemoryManager::without_embeddings(
                Arc::new(SqliteMemoryStore::new(pool)),
                3,
            )),
            Arc::new(SilentLlm),
        );
        TelegramChannel::new(SharedDeps {
            runtime: Arc::new(runtime),
            queue: ConversationQueue::new(),
            subscribers: None,
        })
    }

    /// Build a minimal `AccountState` for unit tests (no network calls).
    fn test_account_state(channel: &TelegramChannel, cancel: CancellationToken) -> AccountState {
        let bot = teloxide::Bot::new("test:fake_token_for_unit_tests");
        let outbound = Arc::new(TelegramOutbound::new(bot.clone(), "test"));
        AccountState {
            bot,
            bot_username: Some("test_bot".into()),
            account_id: "test".into(),
            config: TelegramAccountConfig::default(),
            outbound: Arc::clone(&outbound),
            orchestrator: Arc::new(MessageOrchestrator::new(
                Arc::clone(&channel.deps.runtime),
                outbound as Arc<dyn ChannelOutbound>,
            )),
            subscribers: None,
            cancel,
        }
    }

    #[tokio::test]
    async fn stop_account_cancels_and_removes() {
        let channel = channel().await;
        let cancel = CancellationToken::new();
        {
            let mut map = channel.accounts.write().unwrap();
            map.insert("test".into(), test_account_state(&channel, cancel.clone()));
        }
        assert_eq!(channel.account_ids(), vec!["test"]);

        channel.stop_account("test");
        assert!(cancel.is_cancelled());
        assert!(channel.account_ids().is_empty());
    }

    #[tokio::test]
    async fn start_account_requires_token() {
        let channel = channel().await;
        let err = channel
            .start_account("main", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("token"));
    }
}
