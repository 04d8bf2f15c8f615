//! Whether the agent should answer a message.

use {
    parlor_channels::InboundEvent,
    parlor_config::TemplateKind,
    parlor_providers::ChatMessage,
    tracing::{debug, warn},
};

use crate::{runtime::AgentRuntime, state::ConversationState, templates::template_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespondReason {
    Mentioned,
    DirectMessage,
    Classifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ImageAttachment,
    /// The classifier said IGNORE.
    Classifier,
    /// The classifier failed or gave no usable answer.
    ClassifierFailed,
    NoText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Respond(RespondReason),
    Skip(SkipReason),
    /// The classifier said STOP. Skips this cycle like IGNORE does.
    Stop,
}

impl Decision {
    #[must_use]
    pub fn should_respond(&self) -> bool {
        matches!(self, Self::Respond(_))
    }
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Respond,
    Ignore,
    Stop,
}

/// Evaluate the respond rules in order; the first match wins.
pub async fn decide(
    runtime: &AgentRuntime,
    event: &InboundEvent,
    state: &ConversationState,
) -> Decision {
    let text = event.text_or_caption();
    let handle = event
        .agent_handle
        .as_deref()
        .or(runtime.identity.username.as_deref());

    if let (Some(text), Some(handle)) = (text, handle)
        && mentions(text, handle)
    {
        return Decision::Respond(RespondReason::Mentioned);
    }
    if event.chat_type.is_direct() {
        return Decision::Respond(RespondReason::DirectMessage);
    }
    if event.has_image() && text.is_none() {
        return Decision::Skip(SkipReason::ImageAttachment);
    }
    if text.is_none() {
        return Decision::Skip(SkipReason::NoText);
    }

    match classify(runtime, &event.platform, state).await {
        Some(Verdict::Respond) => Decision::Respond(RespondReason::Classifier),
        Some(Verdict::Ignore) => Decision::Skip(SkipReason::Classifier),
        Some(Verdict::Stop) => Decision::Stop,
        None => Decision::Skip(SkipReason::ClassifierFailed),
    }
}

/// Ask the model for RESPOND / IGNORE / STOP. `None` on any failure.
pub async fn classify(
    runtime: &AgentRuntime,
    platform: &str,
    state: &ConversationState,
) -> Option<Verdict> {
    let template = template_for(&runtime.character, platform, TemplateKind::ShouldRespond);
    let prompt = state.render(template);
    let response = match runtime
        .llm
        .complete(&[ChatMessage::user(prompt)], runtime.settings.classifier_tier)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "should-respond classifier failed");
            return None;
        },
    };
    let verdict = response.text.as_deref().and_then(parse_should_respond);
    debug!(?verdict, raw = ?response.text, "should-respond verdict");
    verdict
}

/// First of RESPOND, IGNORE or STOP appearing in `text`, case-insensitive.
#[must_use]
pub fn parse_should_respond(text: &str) -> Option<Verdict> {
    let upper = text.to_uppercase();
    [
        ("RESPOND", Verdict::Respond),
        ("IGNORE", Verdict::Ignore),
        ("STOP", Verdict::Stop),
    ]
    .into_iter()
    .filter_map(|(word, verdict)| upper.find(word).map(|pos| (pos, verdict)))
    .min_by_key(|(pos, _)| *pos)
    .map(|(_, verdict)| verdict)
}

/// Whether `text` contains `@handle` followed by a non-handle character.
#[must_use]
pub fn mentions(text: &str, handle: &str) -> bool {
    let handle = handle.trim_start_matches('@');
    if handle.is_empty() {
        return false;
    }
    let needle = format!("@{}", handle.to_lowercase());
    let haystack = text.to_lowercase();
    haystack.match_indices(&needle).any(|(pos, _)| {
        haystack[pos + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            recorder::record_inbound,
            state::{StateInput, compose},
            testing::{ScriptedLlm, photo_event, runtime, text_event},
        },
        parlor_common::types::ChatType,
        rstest::rstest,
        std::sync::Arc,
    };

    #[rstest]
    #[case("[RESPOND]", Some(Verdict::Respond))]
    #[case("Result: [IGNORE]", Some(Verdict::Ignore))]
    #[case("stop", Some(Verdict::Stop))]
    #[case("I would IGNORE this, not RESPOND", Some(Verdict::Ignore))]
    #[case("maybe?", None)]
    #[case("", None)]
    fn parses_verdicts(#[case] raw: &str, #[case] expected: Option<Verdict>) {
        assert_eq!(parse_should_respond(raw), expected);
    }

    #[rstest]
    #[case("@mrsbeautybot help me", true)]
    #[case("hey @MrsBeautyBot!", true)]
    #[case("ping @mrsbeautybot", true)]
    #[case("@mrsbeautybot_fan says hi", false)]
    #[case("mrsbeautybot without at", false)]
    #[case("mail me@mrsbeautybot2", false)]
    fn detects_mentions(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(mentions(text, "mrsbeautybot"), expected);
    }

    async fn decide_for(
        llm: Arc<ScriptedLlm>,
        event: InboundEvent,
    ) -> Decision {
        let rt = runtime(llm).await;
        let text = event.text_or_caption().unwrap_or("[Image: x]").to_string();
        let record = record_inbound(&rt, &event, &text).await.unwrap().record;
        let state = compose(&rt, &record, StateInput {
            sender_name: "Alice",
            agent_handle: event.agent_handle.as_deref(),
            attachment: None,
        })
        .await
        .unwrap();
        decide(&rt, &event, &state).await
    }

    #[tokio::test]
    async fn mention_wins_over_classifier() {
        let llm = Arc::new(ScriptedLlm::new(["[STOP]"]));
        let event = text_event("1", ChatType::Group, "@mrsbeautybot help me");
        assert_eq!(
            decide_for(llm.clone(), event).await,
            Decision::Respond(RespondReason::Mentioned)
        );
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn direct_message_skips_hostile_classifier() {
        let llm = Arc::new(ScriptedLlm::new(["[STOP]"]));
        let event = text_event("1", ChatType::Dm, "hello");
        assert_eq!(
            decide_for(llm.clone(), event).await,
            Decision::Respond(RespondReason::DirectMessage)
        );
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn image_only_in_group_is_skipped() {
        let llm = Arc::new(ScriptedLlm::new(["[RESPOND]"]));
        let event = photo_event("1", ChatType::Group, None);
        assert_eq!(
            decide_for(llm.clone(), event).await,
            Decision::Skip(SkipReason::ImageAttachment)
        );
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn captioned_image_in_group_goes_to_classifier() {
        let llm = Arc::new(ScriptedLlm::new(["[RESPOND]"]));
        let event = photo_event("1", ChatType::Group, Some("what do you think of my garden?"));
        assert_eq!(
            decide_for(llm.clone(), event).await,
            Decision::Respond(RespondReason::Classifier)
        );
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn captioned_image_with_mention_responds() {
        let llm = Arc::new(ScriptedLlm::default());
        let event = photo_event("1", ChatType::Group, Some("@mrsbeautybot rate this"));
        assert_eq!(
            decide_for(llm, event).await,
            Decision::Respond(RespondReason::Mentioned)
        );
    }

    #[rstest]
    #[case("[RESPOND]", Decision::Respond(RespondReason::Classifier))]
    #[case("[IGNORE]", Decision::Skip(SkipReason::Classifier))]
    #[case("[STOP]", Decision::Stop)]
    #[case("no idea", Decision::Skip(SkipReason::ClassifierFailed))]
    #[tokio::test]
    async fn group_text_goes_to_classifier(#[case] reply: &'static str, #[case] expected: Decision) {
        let llm = Arc::new(ScriptedLlm::new([reply]));
        let event = text_event("1", ChatType::Group, "nice weather today");
        assert_eq!(decide_for(llm.clone(), event).await, expected);
        assert_eq!(llm.call_count(), 1);
        assert!(llm.prompt(0).contains("Alice: nice weather today"));
    }

    #[tokio::test]
    async fn classifier_error_skips() {
        let llm = Arc::new(ScriptedLlm::failing());
        let event = text_event("1", ChatType::Group, "nice weather today");
        assert_eq!(
            decide_for(llm, event).await,
            Decision::Skip(SkipReason::ClassifierFailed)
        );
    }

    #[tokio::test]
    async fn handle_falls_back_to_configured_username() {
        let llm = Arc::new(ScriptedLlm::default());
        let mut event = text_event("1", ChatType::Group, "@mrsbeautybot hi");
        event.agent_handle = None;
        assert_eq!(
            decide_for(llm, event).await,
            Decision::Respond(RespondReason::Mentioned)
        );
    }
}
