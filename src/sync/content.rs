//! Content classification.
//!
//! Some records store configuration for other host subsystems as JSON. Those
//! are not prose and are kept out of the sync entirely.

use serde_json::Value;

/// Returns true if `text` parses as JSON whose root is an object or array.
///
/// Strings, numbers, booleans, `null`, and unparseable text are prose.
#[must_use]
pub fn is_structured_content(text: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(text),
        Ok(Value::Object(_) | Value::Array(_))
    )
}
