//! Redaction of log context.

use serde_json::{Map, Value};

/// Key fragments that mark a value as sensitive.
pub const SENSITIVE_KEY_FRAGMENTS: [&str; 6] =
    ["password", "token", "secret", "key", "auth", "credential"];

/// Replacement for sensitive values.
pub const REDACTED: &str = "[REDACTED]";

/// Appended to strings cut at [`MAX_STRING_LEN`].
pub const TRUNCATED_SUFFIX: &str = "... [TRUNCATED]";

/// Longest string value passed through unchanged, in characters.
pub const MAX_STRING_LEN: usize = 100;

/// Return a copy of `context` that is safe to write to a log sink.
///
/// Values under keys containing any of [`SENSITIVE_KEY_FRAGMENTS`]
/// (case-insensitive) become [`REDACTED`], long strings are truncated, and
/// everything else is copied as-is. Only top-level entries are inspected.
///
/// # Example
///
/// ```rust
/// use latchkey_core::audit::sanitize;
/// use serde_json::json;
///
/// let context = json!({"apiKey": "abc", "user": "bob"});
/// let clean = sanitize(context.as_object().unwrap());
/// assert_eq!(clean["apiKey"], "[REDACTED]");
/// assert_eq!(clean["user"], "bob");
/// ```
pub fn sanitize(context: &Map<String, Value>) -> Map<String, Value> {
    context
        .iter()
        .map(|(key, value)| {
            let value = if is_sensitive_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                match value {
                    Value::String(s) if s.chars().count() > MAX_STRING_LEN => {
                        let mut cut: String = s.chars().take(MAX_STRING_LEN).collect();
                        cut.push_str(TRUNCATED_SUFFIX);
                        Value::String(cut)
                    }
                    other => other.clone(),
                }
            };
            (key.clone(), value)
        })
        .collect()
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}
