use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    parlor_auto_reply::MessageOrchestrator, parlor_channels::SubscriberStore,
    tokio_util::sync::CancellationToken,
};

use crate::{config::TelegramAccountConfig, outbound::TelegramOutbound};

/// Shared account state map.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Per-account runtime state. Cheap to clone; handlers clone it out of the
/// map so the lock is never held across `.await`.
#[derive(Clone)]
pub struct AccountState {
    pub bot: teloxide::Bot,
    /// Username the platform reports for the bot, without `@`.
    pub bot_username: Option<String>,
    pub account_id: String,
    pub config: TelegramAccountConfig,
    pub outbound: Arc<TelegramOutbound>,
    pub orchestrator: Arc<MessageOrchestrator>,
    pub subscribers: Option<Arc<dyn SubscriberStore>>,
    pub cancel: CancellationToken,
}
