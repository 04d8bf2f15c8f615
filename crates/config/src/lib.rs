//! Configuration loading and env substitution.
//!
//! Config files: `parlor.toml`, `parlor.yaml`, or `parlor.json`
//! Searched in `./` then `~/.config/parlor/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, find_or_default_config_path, load, load_config},
    schema::{
        AgentConfig, ChannelsConfig, CharacterConfig, EmbeddingsConfig, MemoryConfig,
        MessageExample, ParlorConfig, PipelineConfig, ProviderEntry, ProvidersConfig,
        TemplateKind, TierModels,
    },
};
