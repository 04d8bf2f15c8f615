//! Reply generation.

use {
    parlor_common::now_ms,
    parlor_config::TemplateKind,
    parlor_memory::{LogEntry, MemoryRecord},
    parlor_providers::{
        ChatMessage,
        json::{extract_json_object, str_field},
    },
    serde::{Deserialize, Serialize},
    serde_json::json,
    tracing::{debug, warn},
};

use crate::{runtime::AgentRuntime, state::ConversationState, templates::template_for};

/// What the agent decided to say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<parlor_common::ids::MemoryId>,
}

/// Parse model output into a reply.
///
/// A JSON object with a `text` field wins; otherwise the trimmed raw text is
/// the reply with no action. Empty text gives `None`.
#[must_use]
pub fn parse_response(raw: &str) -> Option<ResponseContent> {
    if let Some(obj) = extract_json_object(raw) {
        let text = str_field(&obj, "text")?;
        return Some(ResponseContent {
            text: text.to_string(),
            action: str_field(&obj, "action").map(str::to_string),
            in_reply_to: None,
        });
    }
    let text = raw.trim();
    (!text.is_empty()).then(|| ResponseContent {
        text: text.to_string(),
        action: None,
        in_reply_to: None,
    })
}

/// Produce a reply to `inbound`, or `None` when the model gave nothing usable.
///
/// One model call, no retry, bounded by the configured generation timeout.
/// Every call is written to the audit log, including failed and empty ones.
pub async fn generate(
    runtime: &AgentRuntime,
    inbound: &MemoryRecord,
    state: &ConversationState,
) -> Option<ResponseContent> {
    let template = template_for(
        &runtime.character,
        &inbound.content.source,
        TemplateKind::MessageHandler,
    );
    let context = state.render(template);
    let timeout = runtime.settings.generation_timeout;

    let messages = [ChatMessage::user(context.clone())];
    let call = runtime.llm.complete(
        &messages,
        runtime.settings.response_tier,
    );
    let (raw, error) = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(completion)) => {
            debug!(
                model = runtime.llm.model_for(runtime.settings.response_tier),
                input_tokens = completion.usage.input_tokens,
                output_tokens = completion.usage.output_tokens,
                "generation complete"
            );
            (completion.text, None)
        },
        Ok(Err(e)) => {
            warn!(conversation_id = %inbound.conversation_id, error = %e, "generation failed");
            (None, Some(e.to_string()))
        },
        Err(_) => {
            warn!(
                conversation_id = %inbound.conversation_id,
                timeout_secs = timeout.as_secs(),
                "generation timed out"
            );
            (None, Some(format!("timed out after {}ms", timeout.as_millis())))
        },
    };

    let response = raw.as_deref().and_then(parse_response).map(|mut r| {
        r.in_reply_to = Some(inbound.id);
        r
    });

    let mut body = json!({
        "message": inbound.content,
        "context": context,
        "response": raw,
        "parsed": response,
    });
    if let Some(error) = error {
        body["error"] = json!(error);
    }
    let entry = LogEntry {
        participant_id: inbound.participant_id,
        conversation_id: inbound.conversation_id,
        kind: "response".into(),
        body,
        created_at: now_ms(),
    };
    if let Err(e) = runtime.memory.store().log(&entry).await {
        warn!(conversation_id = %inbound.conversation_id, error = %e, "failed to write response log");
    }
    response
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            recorder::record_inbound,
            runtime::PipelineSettings,
            state::{StateInput, compose},
            testing::{ScriptedLlm, runtime, text_event},
        },
        parlor_common::types::ChatType,
        rstest::rstest,
        std::{sync::Arc, time::Duration},
    };

    #[rstest]
    #[case(
        "```json\n{\"user\": \"Mrs Beauty\", \"text\": \"hello!\", \"action\": \"NONE\"}\n```",
        Some(("hello!", Some("NONE")))
    )]
    #[case("{\"text\": \"bare\"}", Some(("bare", None)))]
    #[case("  plain words  ", Some(("plain words", None)))]
    #[case("{\"text\": \"\", \"action\": \"NONE\"}", None)]
    #[case("   ", None)]
    fn parses_model_output(#[case] raw: &str, #[case] expected: Option<(&str, Option<&str>)>) {
        let parsed = parse_response(raw);
        assert_eq!(
            parsed
                .as_ref()
                .map(|r| (r.text.as_str(), r.action.as_deref())),
            expected
        );
    }

    async fn setup(
        llm: Arc<ScriptedLlm>,
    ) -> (AgentRuntime, MemoryRecord, ConversationState) {
        let rt = runtime(llm).await;
        let event = text_event("1", ChatType::Dm, "hello");
        let record = record_inbound(&rt, &event, "hello").await.unwrap().record;
        let state = compose(&rt, &record, StateInput {
            sender_name: "Alice",
            agent_handle: Some("mrsbeautybot"),
            attachment: None,
        })
        .await
        .unwrap();
        (rt, record, state)
    }

    #[tokio::test]
    async fn generate_logs_audit_entry() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"{"user": "Mrs Beauty", "text": "Welcome, darling", "action": "NONE"}"#,
        ]));
        let (rt, record, state) = setup(llm.clone()).await;

        let response = generate(&rt, &record, &state).await.unwrap();
        assert_eq!(response.text, "Welcome, darling");
        assert_eq!(response.action.as_deref(), Some("NONE"));
        assert_eq!(response.in_reply_to, Some(record.id));

        let prompt = llm.prompt(0);
        assert!(prompt.contains("Current Post:\nAlice: hello"));
        assert!(prompt.contains("Hosts a beauty pageant game."));

        let logs = rt.memory.store().logs(record.conversation_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind, "response");
        assert_eq!(logs[0].participant_id, record.participant_id);
        assert_eq!(logs[0].body["parsed"]["text"], "Welcome, darling");
        assert!(logs[0].body["response"].as_str().unwrap().contains("Welcome, darling"));
        assert!(logs[0].body.get("error").is_none());
        assert_eq!(logs[0].body["message"]["text"], "hello");
        assert!(logs[0].body["context"].as_str().unwrap().contains("Mrs Beauty"));
    }

    #[tokio::test]
    async fn empty_output_is_none_but_logged() {
        let llm = Arc::new(ScriptedLlm::default());
        let (rt, record, state) = setup(llm).await;
        assert!(generate(&rt, &record, &state).await.is_none());

        let logs = rt.memory.store().logs(record.conversation_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].kind, "response");
        assert!(logs[0].body["parsed"].is_null());
        assert!(logs[0].body.get("error").is_none());
    }

    #[tokio::test]
    async fn provider_error_is_none_and_logged() {
        let (rt, record, state) = setup(Arc::new(ScriptedLlm::failing())).await;
        assert!(generate(&rt, &record, &state).await.is_none());

        let logs = rt.memory.store().logs(record.conversation_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].body["response"].is_null());
        assert_eq!(logs[0].body["error"], "provider down");
        assert_eq!(logs[0].body["message"]["text"], "hello");
    }

    #[tokio::test]
    async fn timeout_is_none_and_logged() {
        let llm = Arc::new(ScriptedLlm::slow(Duration::from_millis(200), "late"));
        let (rt, record, state) = setup(llm).await;
        let rt = rt.with_settings(PipelineSettings {
            generation_timeout: Duration::from_millis(20),
            ..Default::default()
        });
        assert!(generate(&rt, &record, &state).await.is_none());

        let logs = rt.memory.store().logs(record.conversation_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].body["error"].as_str().unwrap().starts_with("timed out"));
    }

    #[tokio::test]
    async fn platform_template_override_is_used() {
        let llm = Arc::new(ScriptedLlm::new(["ok"]));
        let (mut rt, record, state) = setup(llm.clone()).await;
        rt.character.templates.insert(
            "telegramMessageHandlerTemplate".into(),
            "custom for {{agentName}}".into(),
        );
        generate(&rt, &record, &state).await.unwrap();
        assert_eq!(llm.prompt(0), "custom for Mrs Beauty");
    }
}
