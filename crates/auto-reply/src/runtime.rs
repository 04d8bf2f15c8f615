//! Process-wide resources shared by every processing cycle.

use std::{sync::Arc, time::Duration};

use {
    parlor_common::{
        ids::{AgentId, ParticipantId},
        types::ModelTier,
    },
    parlor_config::{CharacterConfig, ParlorConfig},
    parlor_memory::MemoryManager,
    parlor_providers::{ImageDescriber, LlmProvider},
};

use crate::hooks::{ActionProcessor, Evaluator, NoopActions, NoopEvaluator};

/// Who the agent is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub id: AgentId,
    pub name: String,
    /// Fallback @handle when the platform does not report one.
    pub username: Option<String>,
}

impl AgentIdentity {
    /// Participant ID the agent's own messages are stored under.
    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId::from_uuid(*self.id.as_uuid())
    }
}

/// Tunables for one processing cycle.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub generation_timeout: Duration,
    pub classifier_tier: ModelTier,
    pub response_tier: ModelTier,
    /// How many records the conversation state pulls in.
    pub recent_limit: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(60),
            classifier_tier: ModelTier::Medium,
            response_tier: ModelTier::Medium,
            recent_limit: 32,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &ParlorConfig) -> Self {
        Self {
            generation_timeout: Duration::from_secs(config.pipeline.generation_timeout_secs),
            classifier_tier: config.pipeline.classifier_tier,
            response_tier: config.pipeline.response_tier,
            recent_limit: config.memory.recent_limit,
        }
    }
}

/// Everything a cycle needs besides the event and the platform outbound.
pub struct AgentRuntime {
    pub identity: AgentIdentity,
    pub character: CharacterConfig,
    pub memory: Arc<MemoryManager>,
    pub llm: Arc<dyn LlmProvider>,
    pub describer: Option<Arc<dyn ImageDescriber>>,
    pub actions: Arc<dyn ActionProcessor>,
    pub evaluator: Arc<dyn Evaluator>,
    pub settings: PipelineSettings,
}

impl AgentRuntime {
    pub fn new(
        identity: AgentIdentity,
        character: CharacterConfig,
        memory: Arc<MemoryManager>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            identity,
            character,
            memory,
            llm,
            describer: None,
            actions: Arc::new(NoopActions),
            evaluator: Arc::new(NoopEvaluator),
            settings: PipelineSettings::default(),
        }
    }

    #[must_use]
    pub fn with_describer(mut self, describer: Arc<dyn ImageDescriber>) -> Self {
        self.describer = Some(describer);
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: Arc<dyn ActionProcessor>) -> Self {
        self.actions = actions;
        self
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }
}
