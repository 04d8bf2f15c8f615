//! Lenient extraction of JSON objects from model output.

/// Find the first JSON object in `text`.
///
/// Accepts a fenced ```` ```json ```` block, a bare object, or an object
/// embedded in surrounding prose. Returns `None` when nothing parses.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    if let Some(inner) = fenced_block(text)
        && let Some(obj) = parse_object(inner)
    {
        return Some(obj);
    }
    if let Some(obj) = parse_object(text.trim()) {
        return Some(obj);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&text[start..=end])
}

fn parse_object(candidate: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(candidate).ok()? {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Contents of the first fenced code block.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    // Skip the language tag line.
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// String field of a JSON object, trimmed; `None` when missing or empty.
#[must_use]
pub fn str_field<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<&'a str> {
    obj.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
