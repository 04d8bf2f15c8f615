use serde::{Deserialize, Serialize};

use crate::plugin::InboundEvent;

/// Check if a peer is allowed to interact with the bot.
///
/// An empty allowlist means everyone is allowed (open policy).
/// Entries are matched case-insensitively against the peer ID.
/// Supports exact match and glob-style `*` wildcards.
pub fn is_allowed(peer_id: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let peer_lower = peer_id.to_lowercase();
    allowlist.iter().any(|pattern| {
        let pat = pattern.to_lowercase();
        if pat.contains('*') {
            glob_match(&pat, &peer_lower)
        } else {
            pat == peer_lower
        }
    })
}

/// Simple glob matching supporting `*` as a wildcard for any sequence of chars.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(idx) => {
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            },
            None => return false,
        }
    }
    // A trailing literal segment must end the text.
    if !parts.last().unwrap_or(&"").is_empty() {
        pos == text.len()
    } else {
        true
    }
}

/// Why an inbound event was dropped before processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRejection {
    BotSender,
    DirectMessage,
    SenderNotAllowed,
    ChatNotAllowed,
}

impl GateRejection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BotSender => "bot_sender",
            Self::DirectMessage => "direct_message",
            Self::SenderNotAllowed => "sender_not_allowed",
            Self::ChatNotAllowed => "chat_not_allowed",
        }
    }
}

impl std::fmt::Display for GateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-account rules deciding which inbound events reach the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatePolicy {
    /// Drop messages sent by other bots.
    pub ignore_bot_messages: bool,
    /// Drop messages from one-to-one chats.
    pub ignore_direct_messages: bool,
    /// Sender user IDs or usernames allowed to talk to the agent.
    pub allowlist: Vec<String>,
    /// Group chat IDs the agent participates in.
    pub group_allowlist: Vec<String>,
}

impl GatePolicy {
    /// Check an event against the policy. `Ok(())` means it may proceed.
    pub fn check(&self, event: &InboundEvent) -> Result<(), GateRejection> {
        if self.ignore_bot_messages && event.sender.is_bot {
            return Err(GateRejection::BotSender);
        }
        if self.ignore_direct_messages && event.chat_type.is_direct() {
            return Err(GateRejection::DirectMessage);
        }
        let by_id = is_allowed(&event.sender.user_id, &self.allowlist);
        let by_username = event
            .sender
            .username
            .as_deref()
            .is_some_and(|u| is_allowed(u, &self.allowlist));
        if !(by_id || by_username) {
            return Err(GateRejection::SenderNotAllowed);
        }
        if !event.chat_type.is_direct() && !is_allowed(&event.chat_id, &self.group_allowlist) {
            return Err(GateRejection::ChatNotAllowed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::plugin::Sender, parlor_common::types::ChatType, rstest::rstest};

    fn event(chat_type: ChatType, is_bot: bool) -> InboundEvent {
        InboundEvent {
            platform: "telegram".into(),
            account_id: "main".into(),
            message_id: "1".into(),
            sender: Sender {
                user_id: "1001".into(),
                username: Some("alice".into()),
                display_name: None,
                is_bot,
            },
            chat_id: "-500".into(),
            chat_type,
            text: Some("hi".into()),
            caption: None,
            attachment: None,
            reply_to_message_id: None,
            date: 0,
            agent_handle: None,
        }
    }

    #[rstest]
    #[case::open_group(GatePolicy::default(), ChatType::Group, false, Ok(()))]
    #[case::bot_ignored(
        GatePolicy { ignore_bot_messages: true, ..Default::default() },
        ChatType::Group, true, Err(GateRejection::BotSender)
    )]
    #[case::bot_allowed_by_default(GatePolicy::default(), ChatType::Group, true, Ok(()))]
    #[case::dm_ignored(
        GatePolicy { ignore_direct_messages: true, ..Default::default() },
        ChatType::Dm, false, Err(GateRejection::DirectMessage)
    )]
    #[case::allowlist_by_username(
        GatePolicy { allowlist: vec!["ALICE".into()], ..Default::default() },
        ChatType::Dm, false, Ok(())
    )]
    #[case::allowlist_by_id(
        GatePolicy { allowlist: vec!["1001".into()], ..Default::default() },
        ChatType::Group, false, Ok(())
    )]
    #[case::allowlist_rejects(
        GatePolicy { allowlist: vec!["bob".into()], ..Default::default() },
        ChatType::Group, false, Err(GateRejection::SenderNotAllowed)
    )]
    #[case::group_allowlist_rejects(
        GatePolicy { group_allowlist: vec!["-999".into()], ..Default::default() },
        ChatType::Group, false, Err(GateRejection::ChatNotAllowed)
    )]
    #[case::group_allowlist_skips_dm(
        GatePolicy { group_allowlist: vec!["-999".into()], ..Default::default() },
        ChatType::Dm, false, Ok(())
    )]
    fn gate_policy_check(
        #[case] policy: GatePolicy,
        #[case] chat_type: ChatType,
        #[case] is_bot: bool,
        #[case] expected: Result<(), GateRejection>,
    ) {
        assert_eq!(policy.check(&event(chat_type, is_bot)), expected);
    }

    #[test]
    fn empty_allowlist_allows_everyone() {
        assert!(is_allowed("anyone", &[]));
    }

    #[test]
    fn exact_match() {
        let list = vec!["alice".into(), "bob".into()];
        assert!(is_allowed("alice", &list));
        assert!(is_allowed("Alice", &list));
        assert!(!is_allowed("charlie", &list));
    }

    #[test]
    fn glob_wildcard() {
        let list = vec!["admin_*".into()];
        assert!(is_allowed("admin_alice", &list));
        assert!(!is_allowed("user_bob", &list));
    }

    #[test]
    fn glob_suffix() {
        let list = vec!["*@example.com".into()];
        assert!(is_allowed("user@example.com", &list));
        assert!(!is_allowed("user@other.com", &list));
    }

    #[test]
    fn glob_middle() {
        let list = vec!["user_*_admin".into()];
        assert!(is_allowed("user_123_admin", &list));
        assert!(!is_allowed("user_123_mod", &list));
    }
}
