//! Prompt templates and `{{key}}` rendering.

use parlor_config::{CharacterConfig, TemplateKind};

pub const DEFAULT_SHOULD_RESPOND_TEMPLATE: &str = r#"# About {{agentName}}:
{{bio}}

# Examples
{{user1}}: I just saw a really great movie
{{user2}}: Oh? Which movie?
Result: [IGNORE]

{{agentName}}: Oh, this is my favorite scene
{{user1}}: sick
{{user2}}: wait, why is it your favorite scene
Result: [RESPOND]

{{user1}}: stfu bot
Result: [STOP]

{{user1}}: Hey {{agentName}}, can you help me with something
Result: [RESPOND]

{{user1}}: {{agentName}} stop responding plz
Result: [STOP]

{{user1}}: i need help
{{agentName}}: how can I help you?
{{user1}}: no. i need help from someone else
Result: [IGNORE]

{{user1}}: okay, i want to test something. {{agentName}}, can you say marco?
{{agentName}}: marco
{{user1}}: great. okay, now do it again
Result: [RESPOND]

{{agentName}} is in a room with other users and should only respond when being addressed, and should not respond to the tail of a very long conversation.

Respond with [RESPOND] to messages directed at {{agentName}}, or to conversations that are interesting or relevant to their background.
Respond with [IGNORE] to messages that are not interesting or relevant, that do not address {{agentName}}, or that are very short and carry little information.
Respond with [STOP] if a user asks {{agentName}} to be quiet, or if {{agentName}} has concluded the conversation.

{{agentName}} hates being annoying: when in doubt, respond with [IGNORE]. If {{agentName}} is talking with a user who has not asked to stop, prefer [RESPOND].

{{recentMessages}}

# Instructions: Decide whether {{agentName}} should respond to the last message. Ignore messages addressed to someone else.
Answer with exactly one of [RESPOND], [IGNORE] or [STOP].
"#;

pub const DEFAULT_MESSAGE_HANDLER_TEMPLATE: &str = r#"# Action Names
{{actionNames}}

# Knowledge
{{knowledge}}

# Task: Generate dialog and actions for the character {{agentName}}.
About {{agentName}}:
{{bio}}
{{lore}}

Examples of {{agentName}}'s dialog and actions:
{{messageExamples}}

{{attachments}}

# Capabilities
{{agentName}} can read images; descriptions of recent images are included above under "Attachments".

{{messageDirections}}

{{recentMessages}}

# Task: Write the next reply in the voice, style and perspective of {{agentName}} (@{{agentHandle}}).
Current Post:
{{currentPost}}

Respond with a JSON block in this format:
```json
{ "user": "{{agentName}}", "text": "string", "action": "string" }
```
"#;

/// Built-in template for `kind`.
#[must_use]
pub fn builtin(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::ShouldRespond => DEFAULT_SHOULD_RESPOND_TEMPLATE,
        TemplateKind::MessageHandler => DEFAULT_MESSAGE_HANDLER_TEMPLATE,
    }
}

/// Template to use on `platform`: the platform override, then the generic
/// override, then the built-in.
#[must_use]
pub fn template_for<'a>(
    character: &'a CharacterConfig,
    platform: &str,
    kind: TemplateKind,
) -> &'a str {
    character
        .template(platform, kind)
        .unwrap_or_else(|| builtin(kind))
}

/// Replace every `{{key}}` with `lookup(key)`. Unknown keys render empty;
/// an unterminated `{{` is kept as-is.
#[must_use]
pub fn render<'v>(template: &str, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                out.push_str(lookup(key).unwrap_or_default());
                rest = &after[end + 2..];
            },
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            },
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashMap};

    #[test]
    fn render_substitutes_and_blanks_unknown() {
        let values: HashMap<&str, &str> = [("agentName", "Eliza"), ("bio", "a bot")].into();
        let out = render("{{agentName}} is {{ bio }}.{{missing}}", |k| {
            values.get(k).copied()
        });
        assert_eq!(out, "Eliza is a bot.");
    }

    #[test]
    fn render_keeps_unterminated_braces() {
        assert_eq!(render("a {{b", |_| Some("x")), "a {{b");
        assert_eq!(render("no keys", |_| Some("x")), "no keys");
    }

    #[test]
    fn template_chain_ends_in_builtin() {
        let mut character = CharacterConfig::default();
        assert_eq!(
            template_for(&character, "telegram", TemplateKind::ShouldRespond),
            DEFAULT_SHOULD_RESPOND_TEMPLATE
        );

        character
            .templates
            .insert("shouldRespondTemplate".into(), "generic".into());
        assert_eq!(
            template_for(&character, "telegram", TemplateKind::ShouldRespond),
            "generic"
        );

        character
            .templates
            .insert("telegramShouldRespondTemplate".into(), "telegram".into());
        assert_eq!(
            template_for(&character, "telegram", TemplateKind::ShouldRespond),
            "telegram"
        );
        assert_eq!(
            template_for(&character, "telegram", TemplateKind::MessageHandler),
            DEFAULT_MESSAGE_HANDLER_TEMPLATE
        );
    }

    #[test]
    fn builtin_templates_reference_state_keys() {
        assert!(DEFAULT_SHOULD_RESPOND_TEMPLATE.contains("{{recentMessages}}"));
        assert!(DEFAULT_MESSAGE_HANDLER_TEMPLATE.contains("{{currentPost}}"));
        assert!(DEFAULT_MESSAGE_HANDLER_TEMPLATE.contains("{{attachments}}"));
    }
}
