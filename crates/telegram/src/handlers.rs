use {
    teloxide::{
        prelude::*,
        types::{ChatKind, MediaKind, MessageKind, PublicChatKind},
    },
    tracing::{debug, info, warn},
};

use {
    parlor_channels::{
        Attachment, ChannelOutbound, InboundEvent, PhotoSize, Sender, Subscriber,
    },
    parlor_common::{now_ms, types::ChatType},
};

use crate::state::{AccountState, AccountStateMap};

pub const SUBSCRIBED_REPLY: &str = "Subscribed to show! Welcome!";
pub const UNSUBSCRIBED_REPLY: &str = "Unsubscribed from show! Goodbye!";

/// What became of one inbound Telegram message.
#[derive(Debug)]
pub enum Routed {
    /// Hand to the pipeline.
    Dispatch(Box<InboundEvent>),
    /// A command was answered directly.
    Replied,
    Ignored(&'static str),
}

/// Handle a single inbound Telegram message (called from manual polling loop).
///
/// Pipeline work runs in its own task so the polling loop is never blocked
/// by a slow cycle.
pub async fn handle_message_direct(
    msg: Message,
    account_id: &str,
    accounts: &AccountStateMap,
) -> anyhow::Result<()> {
    let state = {
        let accts = accounts.read().unwrap_or_else(|e| e.into_inner());
        match accts.get(account_id) {
            Some(s) => s.clone(),
            None => {
                warn!(account_id, "handler: account not found in state map");
                return Ok(());
            },
        }
    };

    match route_message(&msg, &state).await? {
        Routed::Dispatch(event) => {
            let orchestrator = std::sync::Arc::clone(&state.orchestrator);
            tokio::spawn(async move {
                orchestrator.handle(*event).await;
            });
        },
        Routed::Replied => {},
        Routed::Ignored(reason) => {
            debug!(account_id, chat_id = msg.chat.id.0, reason, "ignoring telegram message");
        },
    }
    Ok(())
}

/// Decide what to do with a message: answer a command, dispatch it to the
/// pipeline, or drop it.
pub async fn route_message(msg: &Message, state: &AccountState) -> anyhow::Result<Routed> {
    let text = extract_text(msg);

    if let Some((command, args)) = text
        .as_deref()
        .and_then(|t| parse_command(t, state.bot_username.as_deref()))
    {
        return match command.as_str() {
            "subscribe" | "unsubscribe" => {
                handle_subscription(msg, state, command == "subscribe").await?;
                Ok(Routed::Replied)
            },
            c if state.config.message_command.as_deref() == Some(c) => {
                if args.is_empty() {
                    return Ok(Routed::Ignored("empty message command"));
                }
                Ok(to_inbound_event(msg, state, Some(args))
                    .map_or(Routed::Ignored("no sender"), |e| {
                        Routed::Dispatch(Box::new(e))
                    }))
            },
            _ => Ok(Routed::Ignored("unknown command")),
        };
    }

    if state.config.message_command.is_some() {
        return Ok(Routed::Ignored("not the message command"));
    }
    if text.is_none() && extract_attachment(msg).is_none() {
        return Ok(Routed::Ignored("unsupported content"));
    }
    Ok(to_inbound_event(msg, state, text)
        .map_or(Routed::Ignored("no sender"), |e| Routed::Dispatch(Box::new(e))))
}

async fn handle_subscription(
    msg: &Message,
    state: &AccountState,
    subscribe: bool,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id.0.to_string();
    let Some(store) = state.subscribers.as_ref() else {
        warn!(account_id = %state.account_id, "subscription command without a subscriber store");
        return Ok(());
    };

    let reply = if subscribe {
        let added = store
            .add(Subscriber {
                chat_id: chat_id.clone(),
                username: msg.chat.username().map(str::to_string),
                created_at: now_ms(),
            })
            .await?;
        info!(account_id = %state.account_id, chat_id, added, "chat subscribed");
        SUBSCRIBED_REPLY
    } else {
        let removed = store.remove(&chat_id).await?;
        info!(account_id = %state.account_id, chat_id, removed, "chat unsubscribed");
        UNSUBSCRIBED_REPLY
    };
    state.outbound.send_text(&chat_id, reply, None).await?;
    Ok(())
}

/// Split `/name@bot args` into `(name, args)`. Commands addressed to another
/// bot are not ours.
fn parse_command(text: &str, bot_username: Option<&str>) -> Option<(String, String)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (head, None),
    };
    if let (Some(target), Some(me)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(me)
    {
        return None;
    }
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args.to_string()))
}

/// Convert a Telegram message into an [`InboundEvent`]. `text` replaces the
/// message text (used to strip a command prefix).
fn to_inbound_event(
    msg: &Message,
    state: &AccountState,
    text: Option<String>,
) -> Option<InboundEvent> {
    let from = msg.from.as_ref()?;
    let display_name = {
        let first = &from.first_name;
        let last = from.last_name.as_deref().unwrap_or("");
        let name = format!("{first} {last}").trim().to_string();
        (!name.is_empty()).then_some(name)
    };

    Some(InboundEvent {
        platform: "telegram".into(),
        account_id: state.account_id.clone(),
        message_id: msg.id.0.to_string(),
        sender: Sender {
            user_id: from.id.0.to_string(),
            username: from.username.clone(),
            display_name,
            is_bot: from.is_bot,
        },
        chat_id: msg.chat.id.0.to_string(),
        chat_type: classify_chat(msg),
        text: extract_plain_text(msg).and(text.clone()),
        caption: extract_caption(msg).and(text),
        attachment: extract_attachment(msg),
        reply_to_message_id: msg.reply_to_message().map(|r| r.id.0.to_string()),
        date: msg.date.timestamp(),
        agent_handle: state.bot_username.clone(),
    })
}

/// Text of a text message, or the caption of a media message.
fn extract_text(msg: &Message) -> Option<String> {
    extract_plain_text(msg).or_else(|| extract_caption(msg))
}

fn extract_plain_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn extract_caption(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Photo(p) => p.caption.clone(),
            MediaKind::Document(d) => d.caption.clone(),
            MediaKind::Audio(a) => a.caption.clone(),
            MediaKind::Voice(v) => v.caption.clone(),
            MediaKind::Video(vid) => vid.caption.clone(),
            MediaKind::Animation(a) => a.caption.clone(),
            _ => None,
        },
        _ => None,
    }
}

/// Photo sizes (smallest first) or a document reference.
fn extract_attachment(msg: &Message) -> Option<Attachment> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Photo(p) => Some(Attachment::Photo {
                sizes: p
                    .photo
                    .iter()
                    .map(|ps| PhotoSize {
                        file_id: ps.file.id.clone(),
                        width: ps.width,
                        height: ps.height,
                    })
                    .collect(),
            }),
            MediaKind::Document(d) => Some(Attachment::Document {
                file_id: d.document.file.id.clone(),
                mime_type: d.document.mime_type.as_ref().map(ToString::to_string),
                file_name: d.document.file_name.clone(),
            }),
            _ => None,
        },
        _ => None,
    }
}

/// Classify the chat type.
fn classify_chat(msg: &Message) -> ChatType {
    match msg.chat.kind {
        ChatKind::Private(_) => ChatType::Dm,
        ChatKind::Public(ref p) => match p.kind {
            PublicChatKind::Channel(_) => ChatType::Channel,
            _ => ChatType::Group,
        },
    }
}
