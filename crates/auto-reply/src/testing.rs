//! In-crate doubles for the pipeline's collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    parlor_channels::{
        Attachment, ChannelOutbound, InboundEvent, PhotoSize, SentMessage, Sender,
    },
    parlor_common::{
        ids::AgentId,
        types::{ChatType, ModelTier},
    },
    parlor_config::CharacterConfig,
    parlor_memory::{MemoryManager, SqliteMemoryStore, open_pool},
    parlor_providers::{
        ChatMessage, CompletionResponse, ImageDescriber, ImageDescription, LlmProvider,
    },
};

use crate::runtime::{AgentIdentity, AgentRuntime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCall {
    pub chat_id: String,
    pub text: String,
    pub reply_to: Option<String>,
}

/// Records every send; can be told to fail after N successful sends.
#[derive(Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<SentCall>>,
    attempts: AtomicUsize,
    fail_after: Option<usize>,
    fail_resolve: bool,
    next_id: AtomicUsize,
}

impl RecordingOutbound {
    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Default::default()
        }
    }

    pub fn failing_resolve() -> Self {
        Self {
            fail_resolve: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentCall> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> parlor_channels::Result<SentMessage> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| attempt >= n) {
            return Err(parlor_channels::Error::unavailable("mock send failure"));
        }
        let id = 1000 + self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentCall {
                chat_id: chat_id.into(),
                text: text.into(),
                reply_to: reply_to.map(str::to_string),
            });
        }
        Ok(SentMessage {
            message_id: id.to_string(),
            chat_id: chat_id.into(),
            text: text.into(),
            date: 1_700_000_100,
        })
    }

    async fn resolve_file(&self, file_id: &str) -> parlor_channels::Result<String> {
        if self.fail_resolve {
            return Err(parlor_channels::Error::unavailable("file gone"));
        }
        Ok(format!("https://files.test/{file_id}"))
    }
}

/// LLM double answering from a queue and recording every prompt.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<anyhow::Result<Option<String>>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<std::time::Duration>,
}

impl ScriptedLlm {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(Some(r.into()))).collect()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        let llm = Self::default();
        if let Ok(mut r) = llm.replies.lock() {
            r.push_back(Err(anyhow::anyhow!("provider down")));
        }
        llm
    }

    pub fn slow(delay: std::time::Duration, reply: &'static str) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new([reply])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Text of the last user message of call `index`.
    pub fn prompt(&self, index: usize) -> String {
        self.calls
            .lock()
            .ok()
            .and_then(|c| c.get(index).cloned())
            .and_then(|msgs| {
                msgs.into_iter().rev().find_map(|m| match m {
                    ChatMessage::User {
                        content: parlor_providers::UserContent::Text(t),
                    } => Some(t),
                    _ => None,
                })
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_for(&self, _tier: ModelTier) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tier: ModelTier,
    ) -> anyhow::Result<CompletionResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or(Ok(None));
        Ok(CompletionResponse {
            text: next?,
            ..Default::default()
        })
    }
}

/// Describer returning a fixed description, or failing.
pub struct StaticDescriber {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StaticDescriber {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageDescriber for StaticDescriber {
    async fn describe(&self, image_url: &str) -> anyhow::Result<ImageDescription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("vision down");
        }
        Ok(ImageDescription {
            title: "Sunset".into(),
            description: format!("An orange sky ({image_url})"),
        })
    }
}

pub fn agent_identity() -> AgentIdentity {
    AgentIdentity {
        id: AgentId::from_config("mrs-beauty"),
        name: "Mrs Beauty".into(),
        username: Some("mrsbeautybot".into()),
    }
}

pub fn character() -> CharacterConfig {
    CharacterConfig {
        bio: vec!["Hosts a beauty pageant game.".into()],
        lore: vec!["Once judged a cat show.".into()],
        ..Default::default()
    }
}

pub async fn memory() -> Arc<MemoryManager> {
    let pool = open_pool(":memory:").await.expect("in-memory pool");
    Arc::new(MemoryManager::without_embeddings(
        Arc::new(SqliteMemoryStore::new(pool)),
        3,
    ))
}

pub async fn runtime(llm: Arc<dyn LlmProvider>) -> AgentRuntime {
    AgentRuntime::new(agent_identity(), character(), memory().await, llm)
}

pub fn text_event(message_id: &str, chat_type: ChatType, text: &str) -> InboundEvent {
    let chat_id = if chat_type.is_direct() { "1001" } else { "-500" };
    InboundEvent {
        platform: "telegram".into(),
        account_id: "main".into(),
        message_id: message_id.into(),
        sender: Sender {
            user_id: "1001".into(),
            username: Some("alice".into()),
            display_name: Some("Alice".into()),
            is_bot: false,
        },
        chat_id: chat_id.into(),
        chat_type,
        text: Some(text.into()),
        caption: None,
        attachment: None,
        reply_to_message_id: None,
        date: 1_700_000_000,
        agent_handle: Some("mrsbeautybot".into()),
    }
}

pub fn photo_event(message_id: &str, chat_type: ChatType, caption: Option<&str>) -> InboundEvent {
    InboundEvent {
        text: None,
        caption: caption.map(str::to_string),
        attachment: Some(Attachment::Photo {
            sizes: vec![
                PhotoSize {
                    file_id: "small".into(),
                    width: 90,
                    height: 90,
                },
                PhotoSize {
                    file_id: "large".into(),
                    width: 1280,
                    height: 1280,
                },
            ],
        }),
        ..text_event(message_id, chat_type, "")
    }
}
