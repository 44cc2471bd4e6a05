use std::borrow::Cow;

fn consume_secret(rest: &str) -> usize {
    let mut consumed = 0;
    for ch in rest.chars() {
        if ch == '&' || ch == ';' || ch == '\n' || ch == '\r' || ch.is_whitespace() {
            break;
        }
        consumed += ch.len_utf8();
    }
    consumed
}

fn redact_after_marker(input: &str, marker: &str) -> Option<String> {
    let lower = input.to_ascii_lowercase();
    if !lower.contains(marker) {
        return None;
    }

    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while let Some(rel) = lower[pos..].find(marker) {
        let end = pos + rel + marker.len();
        out.push_str(&input[pos..end]);
        let consumed = consume_secret(&input[end..]);
        if consumed > 0 {
            out.push_str("REDACTED");
        }
        pos = end + consumed;
    }
    out.push_str(&input[pos..]);
    Some(out)
}

/// Scrub known credential shapes out of a string before it reaches logs or
/// an error surfaced to the host: `token=` query values (the websocket URL
/// carries the bearer token as a query parameter) and `Bearer ` header
/// values.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = Cow::Borrowed(input);
    for marker in ["token=", "bearer "] {
        if let Some(redacted) = redact_after_marker(&value, marker) {
            value = Cow::Owned(redacted);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_token_query_value() {
        let input = "connect failed: ws://host/api/ws?token=abc123&x=1";
        let out = redact_secrets(input).to_string();
        assert!(out.contains("token=REDACTED&x=1"));
        assert!(!out.contains("abc123"));
    }

    #[test]
    fn redacts_bearer_value_case_insensitively() {
        let input = "Authorization: Bearer tok-secret\nOther: ok";
        let out = redact_secrets(input).to_string();
        assert!(out.contains("Bearer REDACTED"));
        assert!(out.contains("Other: ok"));
        assert!(!out.contains("tok-secret"));
    }

    #[test]
    fn redacts_every_occurrence() {
        let input = "a?token=one b?token=two";
        let out = redact_secrets(input).to_string();
        assert!(!out.contains("one"));
        assert!(!out.contains("two"));
    }

    #[test]
    fn leaves_clean_strings_borrowed() {
        let input = "nothing sensitive here";
        assert!(matches!(redact_secrets(input), Cow::Borrowed(_)));
    }
}
