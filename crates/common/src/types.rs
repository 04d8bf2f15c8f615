use serde::{Deserialize, Serialize};

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// One-to-one conversation with the agent.
    Dm,
    /// Multi-user group or supergroup.
    Group,
    /// Broadcast channel.
    Channel,
}

impl ChatType {
    #[must_use]
    pub fn is_direct(self) -> bool {
        matches!(self, Self::Dm)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model size class requested from a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Small,
    #[default]
    Medium,
    Large,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_dm_is_direct() {
        assert!(ChatType::Dm.is_direct());
        assert!(!ChatType::Group.is_direct());
        assert!(!ChatType::Channel.is_direct());
    }

    #[test]
    fn model_tier_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ModelTier::Large).ok().as_deref(),
            Some("\"large\"")
        );
    }
}
