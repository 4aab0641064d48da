//! Error body handling: pull out the server's message, redact secrets, truncate

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const MAX_ERROR_TEXT_CHARS: usize = 1_024;
const REDACTED: &str = "[REDACTED]";

static BEARER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._\-+/=]{8,}").expect("valid bearer token regex")
});

static KEY_VALUE_SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?key|access[_-]?token|token|secret|password|authorization|cookie)\b\s*[:=]\s*["']?[^"',\s}]+"#,
    )
    .expect("valid key/value secret regex")
});

/// The application message in an error body: `error`, `detail` or `message`
///
/// FastAPI-style `detail` arrays are joined by their `msg` fields.
pub fn extract_error_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body.trim()).ok()?;
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| match json.get(*key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                (!joined.is_empty()).then_some(joined)
            }
            _ => None,
        })
}

/// Sanitize an error body for logging: redact secrets and truncate
pub fn sanitize_error_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty error response body>".to_string();
    }

    if let Ok(mut json) = serde_json::from_str::<Value>(trimmed) {
        redact_json_value(&mut json);
        let serialized =
            serde_json::to_string(&json).unwrap_or_else(|_| "<unserializable error>".to_string());
        return truncate_with_suffix(serialized);
    }

    truncate_with_suffix(redact_inline_secrets(trimmed))
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact_json_value(val);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json_value),
        Value::String(s) => *s = redact_inline_secrets(s),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['-', ' '], "_");
    ["api_key", "token", "secret", "password", "authorization", "cookie"]
        .iter()
        .any(|needle| normalized.contains(needle))
}

fn redact_inline_secrets(input: &str) -> String {
    let redacted_bearer = BEARER_TOKEN_RE.replace_all(input, "Bearer [REDACTED]");
    KEY_VALUE_SECRET_RE
        .replace_all(&redacted_bearer, "$1=[REDACTED]")
        .into_owned()
}

fn truncate_with_suffix(input: String) -> String {
    let char_count = input.chars().count();
    if char_count <= MAX_ERROR_TEXT_CHARS {
        return input;
    }

    let truncated: String = input.chars().take(MAX_ERROR_TEXT_CHARS).collect();
    format!(
        "{}... [truncated {} chars]",
        truncated,
        char_count - MAX_ERROR_TEXT_CHARS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_error_and_detail_fields() {
        assert_eq!(
            extract_error_detail(r#"{"error": "GPU busy"}"#).as_deref(),
            Some("GPU busy")
        );
        assert_eq!(
            extract_error_detail(r#"{"detail": "Artifact not found"}"#).as_deref(),
            Some("Artifact not found")
        );
        assert_eq!(
            extract_error_detail(r#"{"detail": [{"msg": "field required"}, {"msg": "bad date"}]}"#)
                .as_deref(),
            Some("field required; bad date")
        );
        assert_eq!(extract_error_detail("<html>502</html>"), None);
    }

    #[test]
    fn redacts_json_sensitive_fields() {
        let raw = r#"{"error":{"message":"bad request","api_key":"sk-secret","token":"abc123"}}"#;
        let sanitized = sanitize_error_text(raw);
        assert!(!sanitized.contains("sk-secret"));
        assert!(!sanitized.contains("abc123"));
        assert!(sanitized.contains(REDACTED));
    }

    #[test]
    fn redacts_bearer_token_in_plain_text() {
        let sanitized = sanitize_error_text("Authorization failed for Bearer abcdefghijklmnop");
        assert!(!sanitized.contains("abcdefghijklmnop"));
    }

    #[test]
    fn truncates_long_bodies() {
        let sanitized = sanitize_error_text(&"x".repeat(2_000));
        assert!(sanitized.ends_with("[truncated 976 chars]"));
    }
}
