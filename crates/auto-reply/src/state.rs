//! Per-cycle conversation state: recent history, roster and persona, exposed
//! as the key/value view templates render from.

use std::collections::{BTreeMap, HashMap};

use {
    parlor_common::ids::{ConversationId, ParticipantId},
    parlor_config::MessageExample,
    parlor_memory::{MemoryRecord, Participant},
};

use crate::{
    Result,
    recorder::CONTINUE_ACTION,
    runtime::AgentRuntime,
    templates::render,
};

/// Stand-in speaker names for example dialogs.
const EXAMPLE_NAMES: [&str; 3] = ["Alex", "Sam", "Jordan"];

/// Snapshot rebuilt for every cycle and never persisted.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub conversation_id: ConversationId,
    /// The inbound message this cycle is about.
    pub current: MemoryRecord,
    pub participants: Vec<Participant>,
    /// Recent history, oldest first.
    pub recent_messages: Vec<MemoryRecord>,
    values: BTreeMap<String, String>,
}

/// Cycle facts the state needs beyond the stored record.
#[derive(Debug, Clone, Default)]
pub struct StateInput<'a> {
    pub sender_name: &'a str,
    pub agent_handle: Option<&'a str>,
    /// Rendered `[Image: ...]` text, if the message had one.
    pub attachment: Option<&'a str>,
}

impl ConversationState {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// All keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Render a template against this state.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        render(template, |key| self.get(key))
    }
}

/// Build the state for `current`, merging stored history, the participant
/// roster and the character profile.
pub async fn compose(
    runtime: &AgentRuntime,
    current: &MemoryRecord,
    input: StateInput<'_>,
) -> Result<ConversationState> {
    let conversation_id = current.conversation_id;
    let store = runtime.memory.store();
    let participants = store.participants(conversation_id).await?;
    let recent_messages = runtime
        .memory
        .recent(conversation_id, runtime.settings.recent_limit)
        .await?;

    let mut state = ConversationState {
        conversation_id,
        current: current.clone(),
        participants,
        recent_messages,
        values: BTreeMap::new(),
    };
    fill_profile(runtime, &mut state, input.agent_handle);
    state.set("senderName", input.sender_name);
    state.set(
        "currentPost",
        format!("{}: {}", input.sender_name, current.content.text),
    );
    state.set(
        "attachments",
        input
            .attachment
            .map(|a| format!("# Attachments\n{a}"))
            .unwrap_or_default(),
    );
    fill_history(runtime, &mut state);
    Ok(state)
}

/// Re-pull history and roster after outbound records were written.
pub async fn refresh(runtime: &AgentRuntime, state: ConversationState) -> Result<ConversationState> {
    let mut state = state;
    state.participants = runtime.memory.store().participants(state.conversation_id).await?;
    state.recent_messages = runtime
        .memory
        .recent(state.conversation_id, runtime.settings.recent_limit)
        .await?;
    fill_history(runtime, &mut state);
    Ok(state)
}

fn fill_profile(runtime: &AgentRuntime, state: &mut ConversationState, handle: Option<&str>) {
    let character = &runtime.character;
    let agent_name = runtime.identity.name.clone();
    let handle = handle
        .map(str::to_string)
        .or_else(|| runtime.identity.username.clone())
        .unwrap_or_else(|| agent_name.clone());

    for (i, name) in EXAMPLE_NAMES.iter().enumerate() {
        state.set(format!("user{}", i + 1), *name);
    }
    state.set("agent", agent_name.as_str());
    state.set("agentHandle", handle.as_str());
    state.set("twitterUserName", handle);
    state.set("bio", character.bio.join(" "));
    state.set("lore", character.lore.join("\n"));
    state.set("topics", character.topics.join(", "));
    state.set("adjectives", character.adjectives.join(", "));
    state.set("knowledge", bullet_list(&character.knowledge));
    state.set(
        "messageDirections",
        if character.style.is_empty() {
            String::new()
        } else {
            format!(
                "# Message Directions for {agent_name}\n{}",
                bullet_list(&character.style)
            )
        },
    );
    state.set(
        "messageExamples",
        format_examples(&character.message_examples, &agent_name),
    );
    let actions = runtime.actions.action_names();
    state.set(
        "actionNames",
        if actions.is_empty() {
            String::new()
        } else {
            format!("Possible response actions: {}", actions.join(", "))
        },
    );
    state.set("agentName", agent_name);
}

fn fill_history(runtime: &AgentRuntime, state: &mut ConversationState) {
    let agent_pid = runtime.identity.participant_id();
    let names: HashMap<ParticipantId, &str> = state
        .participants
        .iter()
        .map(|p| (p.id, p.display_name()))
        .collect();

    let lines: Vec<String> = state
        .recent_messages
        .iter()
        .map(|r| {
            let name = if r.participant_id == agent_pid {
                runtime.identity.name.as_str()
            } else {
                names.get(&r.participant_id).copied().unwrap_or("Unknown")
            };
            match r.content.action.as_deref() {
                Some(action) if action != CONTINUE_ACTION => {
                    format!("{name}: {} ({action})", r.content.text)
                },
                _ => format!("{name}: {}", r.content.text),
            }
        })
        .collect();
    let conversation = lines.join("\n");

    let actors: Vec<String> = state
        .participants
        .iter()
        .map(|p| match p.username.as_deref() {
            Some(username) => format!("{} (@{username})", p.display_name()),
            None => p.display_name().to_string(),
        })
        .collect();

    state.set("actors", actors.join("\n"));
    state.set(
        "recentMessages",
        if conversation.is_empty() {
            String::new()
        } else {
            format!("# Conversation Messages\n{conversation}")
        },
    );
    state.set("formattedConversation", conversation);
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_examples(examples: &[Vec<MessageExample>], agent_name: &str) -> String {
    examples
        .iter()
        .map(|dialog| {
            dialog
                .iter()
                .map(|line| {
                    let speaker = render(&line.user, |key| match key {
                        "agentName" => Some(agent_name),
                        "user1" => Some(EXAMPLE_NAMES[0]),
                        "user2" => Some(EXAMPLE_NAMES[1]),
                        "user3" => Some(EXAMPLE_NAMES[2]),
                        _ => None,
                    });
                    match line.action.as_deref() {
                        Some(action) => format!("{speaker}: {} ({action})", line.text),
                        None => format!("{speaker}: {}", line.text),
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
