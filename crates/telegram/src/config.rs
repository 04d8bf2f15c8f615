use {
    parlor_auto_reply::DEFAULT_MAX_MESSAGE_LEN,
    parlor_channels::GatePolicy,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Configuration for a single Telegram bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramAccountConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Drop messages sent by other bots (default: true).
    pub ignore_bot_messages: bool,

    /// Drop one-to-one messages (default: false).
    pub ignore_direct_messages: bool,

    /// Sender user IDs or usernames allowed to talk to the bot. Empty means
    /// everyone.
    pub allowlist: Vec<String>,

    /// Group/chat ID allowlist. Empty means every group.
    pub group_allowlist: Vec<String>,

    /// When set (e.g. `message`), only `/message <text>` reaches the
    /// pipeline, with the command stripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_command: Option<String>,

    /// Longest outbound message, in characters.
    pub max_message_len: usize,

    /// Thread the first reply chunk under the inbound message (default: true).
    pub reply_to_message: bool,
}

impl TelegramAccountConfig {
    /// Parse one `[channels.telegram.<account>]` table.
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        if config.token.expose_secret().trim().is_empty() {
            return Err(crate::Error::message("telegram bot token is required"));
        }
        Ok(config)
    }

    #[must_use]
    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            ignore_bot_messages: self.ignore_bot_messages,
            ignore_direct_messages: self.ignore_direct_messages,
            allowlist: self.allowlist.clone(),
            group_allowlist: self.group_allowlist.clone(),
        }
    }
}

impl std::fmt::Debug for TelegramAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAccountConfig")
            .field("token", &"[REDACTED]")
            .field("ignore_bot_messages", &self.ignore_bot_messages)
            .field("ignore_direct_messages", &self.ignore_direct_messages)
            .field("message_command", &self.message_command)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramAccountConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            ignore_bot_messages: true,
            ignore_direct_messages: false,
            allowlist: Vec::new(),
            group_allowlist: Vec::new(),
            message_command: None,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            reply_to_message: true,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = TelegramAccountConfig::default();
        assert!(cfg.ignore_bot_messages);
        assert!(!cfg.ignore_direct_messages);
        assert!(cfg.reply_to_message);
        assert_eq!(cfg.max_message_len, 4096);
        assert!(cfg.message_command.is_none());
    }

    #[test]
    fn deserialize_from_json() {
        let json = serde_json::json!({
            "token": "123:ABC",
            "ignore_direct_messages": true,
            "allowlist": ["alice", "1002"],
            "message_command": "message"
        });
        let cfg = TelegramAccountConfig::from_value(json).unwrap();
        assert_eq!(cfg.token.expose_secret(), "123:ABC");
        assert!(cfg.ignore_direct_messages);
        assert_eq!(cfg.message_command.as_deref(), Some("message"));
        // defaults for unspecified fields
        assert!(cfg.ignore_bot_messages);

        let gate = cfg.gate_policy();
        assert_eq!(gate.allowlist, vec!["alice", "1002"]);
        assert!(gate.ignore_direct_messages);
    }

    #[test]
    fn missing_token_is_rejected() {
        let err = TelegramAccountConfig::from_value(serde_json::json!({"allowlist": []}));
        assert!(err.is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramAccountConfig {
            token: Secret::new("secret-token".into()),
            ..Default::default()
        };
        assert!(!format!("{cfg:?}").contains("secret-token"));
    }
}
