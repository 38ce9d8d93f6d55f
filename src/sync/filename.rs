//! File naming convention for exported documents.
//!
//! A document is stored as `"<name> (<id>).md"`; a bare `"<name>.md"` carries
//! no id. Names are parsed on scan and generated on first export.

/// Extension marking a Markdown document.
pub const MARKDOWN_EXT: &str = ".md";

/// Characters that cannot appear in an exported file name.
const FORBIDDEN_CHARS: &[char] = &['|', '*', '?', '\\', ':', '<', '>', '/', '$', '"'];

/// Parse `(derived_name, derived_id)` from a file name.
#[must_use]
pub fn parse_file_name(file_name: &str) -> (String, Option<String>) {
    if let Some(body) = file_name.strip_suffix(").md") {
        if let Some(open) = body.rfind(" (") {
            let id = &body[open + 2..];
            if !id.is_empty() {
                return (body[..open].to_string(), Some(id.to_string()));
            }
        }
    }
    let stem = file_name.strip_suffix(MARKDOWN_EXT).unwrap_or(file_name);
    (stem.to_string(), None)
}

/// File name for a record that has never been exported.
#[must_use]
pub fn generate_file_name(name: &str, id: &str) -> String {
    format!("{name} ({id}){MARKDOWN_EXT}")
}

/// Whether a record name can be used as a file name on common filesystems.
#[must_use]
pub fn is_valid_file_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('.') || name.ends_with('.') {
        return false;
    }
    if name.contains(FORBIDDEN_CHARS) {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    if matches!(lower.as_str(), "con" | "nul" | "prn") {
        return false;
    }
    for prefix in ["com", "lpt"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            if rest.len() == 1 && rest.chars().all(|c| c.is_ascii_digit()) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_with_id() {
        assert_eq!(
            parse_file_name("Notes (42).md"),
            ("Notes".to_string(), Some("42".to_string()))
        );
    }

    #[test]
    fn test_parse_name_without_id() {
        assert_eq!(parse_file_name("Intro.md"), ("Intro".to_string(), None));
    }

    #[test]
    fn test_parse_uses_last_parenthesized_suffix() {
        assert_eq!(
            parse_file_name("Map (old) (abc123).md"),
            ("Map (old)".to_string(), Some("abc123".to_string()))
        );
    }

    #[test]
    fn test_parenthesis_inside_name_is_not_an_id() {
        assert_eq!(
            parse_file_name("A (b) c.md"),
            ("A (b) c".to_string(), None)
        );
        assert_eq!(parse_file_name("Empty ().md"), ("Empty ()".to_string(), None));
    }

    #[test]
    fn test_generate_matches_parse() {
        let file = generate_file_name("Session 1", "xYz");
        assert_eq!(file, "Session 1 (xYz).md");
        assert_eq!(
            parse_file_name(&file),
            ("Session 1".to_string(), Some("xYz".to_string()))
        );
    }

    #[test]
    fn test_file_name_validity() {
        assert!(is_valid_file_name("Session Notes"));
        assert!(is_valid_file_name("Chapter 1 (draft)"));
        assert!(!is_valid_file_name(""));
        assert!(!is_valid_file_name(".hidden"));
        assert!(!is_valid_file_name("trailing."));
        assert!(!is_valid_file_name("a/b"));
        assert!(!is_valid_file_name("what?"));
        assert!(!is_valid_file_name("cost $5"));
        assert!(!is_valid_file_name("CON"));
        assert!(!is_valid_file_name("com1"));
        assert!(is_valid_file_name("com10"));
        assert!(is_valid_file_name("console"));
    }
}
