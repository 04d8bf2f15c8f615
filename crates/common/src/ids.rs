//! Stable identifiers derived from platform ids.
//!
//! Every id that refers to a platform object (message, chat, user) is a UUID
//! computed from `"<platform id>-<agent id>"`, so the same object always maps
//! to the same id for one agent and never collides across agents that share a
//! database.

use std::{fmt, str::FromStr};

use {
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
    uuid::Uuid,
};

use crate::Error;

const ID_NAMESPACE: &[u8] = b"parlor.id.v1:";

/// Hash `input` into a version-8 UUID.
#[must_use]
pub fn stable_uuid(input: &str) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(ID_NAMESPACE);
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x80;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|source| Error::InvalidId {
                        value: s.to_string(),
                        source,
                    })
            }
        }
    };
}

uuid_id!(
    /// The agent this process runs as. Configured, not derived.
    AgentId
);
uuid_id!(
    /// One per (platform chat, agent) pair.
    ConversationId
);
uuid_id!(
    /// One per (platform user, agent) pair.
    ParticipantId
);
uuid_id!(
    /// Id of a stored memory record.
    MemoryId
);

impl AgentId {
    /// Agent id from a configured name or UUID string.
    ///
    /// A valid UUID is used as-is; anything else is hashed.
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        Uuid::parse_str(value)
            .map(Self)
            .unwrap_or_else(|_| Self(stable_uuid(value)))
    }
}

impl ConversationId {
    #[must_use]
    pub fn for_chat(platform_chat_id: &str, agent: AgentId) -> Self {
        Self(stable_uuid(&format!("{platform_chat_id}-{agent}")))
    }
}

impl ParticipantId {
    #[must_use]
    pub fn for_user(platform_user_id: &str, agent: AgentId) -> Self {
        Self(stable_uuid(&format!("{platform_user_id}-{agent}")))
    }
}

impl MemoryId {
    #[must_use]
    pub fn for_message(platform_message_id: &str, agent: AgentId) -> Self {
        Self(stable_uuid(&format!("{platform_message_id}-{agent}")))
    }

    /// Fresh id for records that have no platform message behind them.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}
