use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    parlor_auto_reply::{AgentRuntime, ConversationQueue, MessageOrchestrator},
    parlor_channels::{ChannelOutbound, SubscriberStore},
};

use crate::{
    config::TelegramAccountConfig,
    handlers,
    outbound::TelegramOutbound,
    state::{AccountState, AccountStateMap},
};

/// Process-wide collaborators every account shares.
#[derive(Clone)]
pub struct SharedDeps {
    pub runtime: Arc<AgentRuntime>,
    pub queue: ConversationQueue,
    pub subscribers: Option<Arc<dyn SubscriberStore>>,
}

/// Start polling for a single bot account.
///
/// Spawns a background task that processes updates until the returned
/// `CancellationToken` is cancelled.
pub async fn start_polling(
    account_id: String,
    config: TelegramAccountConfig,
    accounts: AccountStateMap,
    deps: SharedDeps,
) -> anyhow::Result<CancellationToken> {
    // Build bot with a client timeout longer than the long-polling timeout (30s)
    // so the HTTP client doesn't abort the request before Telegram responds.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(std::time::Duration::from_secs(45))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);
    start_polling_with_bot(account_id, bot, config, accounts, deps).await
}

/// Same as [`start_polling`] with a pre-built bot (used to point at a
/// different API URL).
pub async fn start_polling_with_bot(
    account_id: String,
    bot: Bot,
    config: TelegramAccountConfig,
    accounts: AccountStateMap,
    deps: SharedDeps,
) -> anyhow::Result<CancellationToken> {
    // Verify credentials and get bot username.
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    let mut commands = vec![
        BotCommand::new("subscribe", "Subscribe this chat to the show"),
        BotCommand::new("unsubscribe", "Unsubscribe this chat"),
    ];
    if let Some(ref name) = config.message_command {
        commands.push(BotCommand::new(name, "Talk to the host"));
    }
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(account_id, "failed to register bot commands: {e}");
    }

    info!(
        account_id,
        username = ?bot_username,
        "telegram bot connected (webhook cleared)"
    );

    let cancel = CancellationToken::new();

    let outbound = Arc::new(
        TelegramOutbound::new(bot.clone(), account_id.clone())
            .with_reply_to_message(config.reply_to_message),
    );
    let orchestrator = Arc::new(
        MessageOrchestrator::new(
            Arc::clone(&deps.runtime),
            Arc::clone(&outbound) as Arc<dyn ChannelOutbound>,
        )
        .with_gate(config.gate_policy())
        .with_max_message_len(config.max_message_len)
        .with_queue(deps.queue.clone()),
    );

    let state = AccountState {
        bot: bot.clone(),
        bot_username,
        account_id: account_id.clone(),
        config,
        outbound,
        orchestrator,
        subscribers: deps.subscribers.clone(),
        cancel: cancel.clone(),
    };

    {
        let mut map = accounts.write().unwrap_or_else(|e| e.into_inner());
        map.insert(account_id.clone(), state);
    }

    let cancel_clone = cancel.clone();
    let aid = account_id;
    let poll_accounts = Arc::clone(&accounts);
    tokio::spawn(async move {
        info!(account_id = aid, "starting telegram manual polling loop");
        let mut offset: i32 = 0;

        loop {
            let result = tokio::select! {
                () = cancel_clone.cancelled() => {
                    info!(account_id = aid, "telegram polling stopped");
                    break;
                },
                result = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(30)
                    .allowed_updates(vec![AllowedUpdate::Message])
                    .send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(
                        account_id = aid,
                        count = updates.len(),
                        "got telegram updates"
                    );
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                debug!(
                                    account_id = aid,
                                    chat_id = msg.chat.id.0,
                                    "received telegram message"
                                );
                                if let Err(e) =
                                    handlers::handle_message_direct(msg, &aid, &poll_accounts).await
                                {
                                    error!(
                                        account_id = aid,
                                        error = %e,
                                        "error handling telegram message"
                                    );
                                }
                            },
                            other => {
                                debug!(account_id = aid, "ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) => {
                    // Detect conflict error: another bot instance is running with the same token.
                    let is_conflict =
                        matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates));

                    if is_conflict {
                        warn!(
                            account_id = aid,
                            "telegram bot disabled: another instance is already running with this token"
                        );
                        cancel_clone.cancel();
                        break;
                    }

                    warn!(account_id = aid, error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel_clone.cancelled() => break,
                        () = tokio::time::sleep(std::time::Duration::from_secs(5)) => {},
                    }
                },
            }
        }

        let mut map = poll_accounts.write().unwrap_or_else(|e| e.into_inner());
        map.remove(&aid);
    });

    Ok(cancel)
}
