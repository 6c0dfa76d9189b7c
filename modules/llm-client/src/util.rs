/// Locate the JSON object embedded in a free-text model completion.
///
/// Tries a fenced code block first (` ```json ... ``` ` or bare ` ``` `),
/// then falls back to slicing from the first `{` to the last `}`. Returns
/// `None` when neither strategy finds anything object-shaped; callers are
/// expected to have their own deterministic fallback in that case.
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(fence) = text.find("```") {
        let body = &text[fence + 3..];
        let body = body.strip_prefix("json").unwrap_or(body);
        if let Some(close) = body.find("```") {
            let inner = body[..close].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
