/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
///
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if closed && !var_name.is_empty() {
                match lookup(&var_name) {
                    Some(val) => result.push_str(&val),
                    None => {
                        // Leave unresolved placeholder as-is.
                        result.push_str("${");
                        result.push_str(&var_name);
                        result.push('}');
                    },
                }
            } else {
                // Unterminated: emit literally.
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "TELEGRAM_BOT_TOKEN" => Some("123:ABC".to_string()),
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_secrets_in_toml() {
        let raw = "token = \"${TELEGRAM_BOT_TOKEN}\"\napi_key = \"${OPENAI_API_KEY}\"";
        assert_eq!(
            substitute_env_with(raw, lookup),
            "token = \"123:ABC\"\napi_key = \"sk-test\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${PARLOR_NONEXISTENT_XYZ}", lookup),
            "${PARLOR_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("x=${OPENAI", lookup), "x=${OPENAI");
    }

    #[test]
    fn lone_dollar_is_kept() {
        assert_eq!(substitute_env_with("cost $5", lookup), "cost $5");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
