/// Config schema types (agent, character, channels, providers, memory, pipeline).
use std::collections::HashMap;

use {
    parlor_common::{ids::AgentId, types::ModelTier},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParlorConfig {
    pub agent: AgentConfig,
    pub character: CharacterConfig,
    pub channels: ChannelsConfig,
    pub providers: ProvidersConfig,
    pub memory: MemoryConfig,
    pub pipeline: PipelineConfig,
}

/// Who the agent is to the rest of the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent id: a UUID, or any string that is hashed into one.
    pub id: String,
    /// Display name used in prompts.
    pub name: String,
    /// Handle used for @mentions when the platform does not report one.
    pub username: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: "parlor".into(),
            name: "Parlor".into(),
            username: None,
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub fn agent_id(&self) -> AgentId {
        AgentId::from_config(&self.id)
    }
}

/// One line of an example conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MessageExample {
    pub user: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Character profile: persona text, examples and prompt template overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub bio: Vec<String>,
    pub lore: Vec<String>,
    pub topics: Vec<String>,
    pub adjectives: Vec<String>,
    pub knowledge: Vec<String>,
    /// Style directions applied to every reply.
    pub style: Vec<String>,
    pub message_examples: Vec<Vec<MessageExample>>,
    /// Prompt template overrides keyed by template name, e.g.
    /// `shouldRespondTemplate` or `telegramMessageHandlerTemplate`.
    pub templates: HashMap<String, String>,
}

/// Prompt templates the pipeline looks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    ShouldRespond,
    MessageHandler,
}

impl TemplateKind {
    /// Generic key, e.g. `shouldRespondTemplate`.
    #[must_use]
    pub fn generic_key(self) -> &'static str {
        match self {
            Self::ShouldRespond => "shouldRespondTemplate",
            Self::MessageHandler => "messageHandlerTemplate",
        }
    }

    /// Platform-specific key, e.g. `telegramShouldRespondTemplate`.
    #[must_use]
    pub fn platform_key(self, platform: &str) -> String {
        let generic = self.generic_key();
        let mut chars = generic.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("{platform}{capitalized}")
    }
}

impl CharacterConfig {
    /// Keys consulted for a template, most specific first.
    #[must_use]
    pub fn template_lookup_keys(platform: &str, kind: TemplateKind) -> [String; 2] {
        [kind.platform_key(platform), kind.generic_key().to_string()]
    }

    /// First configured override along the lookup chain.
    ///
    /// Returns `None` when neither the platform nor the generic key is set;
    /// callers then fall back to their built-in default.
    #[must_use]
    pub fn template(&self, platform: &str, kind: TemplateKind) -> Option<&str> {
        Self::template_lookup_keys(platform, kind)
            .iter()
            .find_map(|key| self.templates.get(key))
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Channel accounts, keyed by account ID. Each value is parsed by the
/// channel crate that owns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: HashMap<String, serde_json::Value>,
}

/// Provider settings keyed by provider name (currently `openai`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(flatten)]
    pub providers: HashMap<String, ProviderEntry>,
}

impl ProvidersConfig {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderEntry> {
        self.providers.get(name).filter(|p| p.enabled)
    }
}

/// Configuration for a single LLM provider.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEntry {
    pub enabled: bool,

    /// API key (an environment variable may be substituted with `${VAR}`).
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,

    /// Override the base URL (OpenAI-compatible, including `/v1`).
    pub base_url: Option<String>,

    /// Model per tier. Missing tiers fall back to `medium`.
    pub models: TierModels,

    /// Vision model used for image descriptions.
    pub vision_model: Option<String>,

    pub temperature: Option<f32>,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("vision_model", &self.vision_model)
            .finish_non_exhaustive()
    }
}

impl Default for ProviderEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            models: TierModels::default(),
            vision_model: None,
            temperature: None,
        }
    }
}

/// Model names for each [`ModelTier`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TierModels {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

impl TierModels {
    /// Model for `tier`, falling back to the medium model.
    #[must_use]
    pub fn for_tier(&self, tier: ModelTier) -> Option<&str> {
        let explicit = match tier {
            ModelTier::Small => self.small.as_deref(),
            ModelTier::Medium => self.medium.as_deref(),
            ModelTier::Large => self.large.as_deref(),
        };
        explicit.or(self.medium.as_deref())
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Conversational memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Path to the SQLite database file (or `:memory:`).
    pub db_path: String,
    /// How many recent records are pulled into the conversation state.
    pub recent_limit: u32,
    pub embeddings: EmbeddingsConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: "parlor.db".into(),
            recent_limit: 32,
            embeddings: EmbeddingsConfig::default(),
        }
    }
}

/// Embeddings are computed with the `openai` provider entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub enabled: bool,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
        }
    }
}

/// Knobs for the message pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on one generation call; a timeout counts as "no response".
    pub generation_timeout_secs: u64,
    pub classifier_tier: ModelTier,
    pub response_tier: ModelTier,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 60,
            classifier_tier: ModelTier::Medium,
            response_tier: ModelTier::Medium,
        }
    }
}
