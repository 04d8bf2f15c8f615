use {async_trait::async_trait, parlor_common::types::ModelTier};

// ── Typed chat messages ─────────────────────────────────────────────────────

/// Typed chat message for the LLM provider interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    System { content: String },
    User { content: UserContent },
    Assistant { content: String },
}

/// User message content: plain text or multimodal (text + images).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserContent {
    Text(String),
    Multimodal(Vec<ContentPart>),
}

/// A single part of a multimodal content array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Image fetched by the provider from a URL.
    ImageUrl(String),
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: UserContent::Text(content.into()),
        }
    }

    pub fn user_multimodal(parts: Vec<ContentPart>) -> Self {
        Self::User {
            content: UserContent::Multimodal(parts),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Convert to OpenAI-compatible JSON format.
    #[must_use]
    pub fn to_openai_value(&self) -> serde_json::Value {
        match self {
            ChatMessage::System { content } => {
                serde_json::json!({ "role": "system", "content": content })
            },
            ChatMessage::User { content } => match content {
                UserContent::Text(text) => {
                    serde_json::json!({ "role": "user", "content": text })
                },
                UserContent::Multimodal(parts) => {
                    let blocks: Vec<serde_json::Value> = parts
                        .iter()
                        .map(|part| match part {
                            ContentPart::Text(text) => {
                                serde_json::json!({ "type": "text", "text": text })
                            },
                            ContentPart::ImageUrl(url) => serde_json::json!({
                                "type": "image_url",
                                "image_url": { "url": url }
                            }),
                        })
                        .collect();
                    serde_json::json!({ "role": "user", "content": blocks })
                },
            },
            ChatMessage::Assistant { content } => {
                serde_json::json!({ "role": "assistant", "content": content })
            },
        }
    }
}

/// LLM provider trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Model identifier used for `tier` (e.g. "gpt-4o-mini").
    fn model_for(&self, tier: ModelTier) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tier: ModelTier,
    ) -> anyhow::Result<CompletionResponse>;
}

/// Response from an LLM completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
