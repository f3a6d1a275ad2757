//! Annotation header parsing
//!
//! A playbook declares its metadata in leading comment lines:
//!
//! ```yaml
//! # Name: Core Packages
//! # Description: Base packages every machine needs
//! # Essential: true
//! # Essential-Order: 1
//! ---
//! - hosts: localhost
//! ```
//!
//! Only the first 10 lines are considered, and the first line that is
//! not a comment ends the header. Keys are a fixed vocabulary; unknown
//! keys and malformed values are ignored, never fatal.

/// Upper bound on header scanning
pub const MAX_HEADER_LINES: usize = 10;

/// Parsed annotation block; `name` absent means the file yields no record
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub name: Option<String>,
    pub description: String,
    pub essential: bool,
    pub essential_order: Option<i32>,
    pub requires_config: bool,
}

/// Extract the annotation header from file content
pub fn parse_header(content: &str) -> Header {
    let mut header = Header::default();

    for line in content.lines().take(MAX_HEADER_LINES) {
        let trimmed = line.trim_start();
        let Some(comment) = trimmed.strip_prefix('#') else {
            break;
        };

        let Some((key, value)) = comment.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "Name" if !value.is_empty() => header.name = Some(value.to_string()),
            "Description" => header.description = value.to_string(),
            "Essential" => header.essential = value == "true",
            "Essential-Order" => match value.parse::<i32>() {
                Ok(order) => header.essential_order = Some(order),
                Err(_) => {
                    log::debug!("Ignoring unparsable Essential-Order value: {value:?}");
                }
            },
            "RequiredVars" => header.requires_config = value == "true",
            _ => {}
        }
    }

    header
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_header() {
        let header = parse_header(
            "# Name: Core Packages\n\
             # Description: Base packages every machine needs\n\
             # Essential: true\n\
             # Essential-Order: 1\n\
             # RequiredVars: true\n\
             ---\n",
        );

        assert_eq!(header.name.as_deref(), Some("Core Packages"));
        assert_eq!(header.description, "Base packages every machine needs");
        assert!(header.essential);
        assert_eq!(header.essential_order, Some(1));
        assert!(header.requires_config);
    }

    #[test]
    fn test_missing_name_yields_no_record() {
        let header = parse_header("# Description: nameless\n---\n");
        assert!(header.name.is_none());
    }

    #[test]
    fn test_malformed_order_is_ignored_not_fatal() {
        let header = parse_header("# Name: Odd\n# Essential-Order: soon\n");
        assert_eq!(header.name.as_deref(), Some("Odd"));
        assert_eq!(header.essential_order, None);
    }

    #[test]
    fn test_essential_any_other_value_is_false() {
        let header = parse_header("# Name: X\n# Essential: yes\n# RequiredVars: 1\n");
        assert!(!header.essential);
        assert!(!header.requires_config);
    }

    #[test]
    fn test_first_non_comment_line_ends_header() {
        let header = parse_header(
            "# Name: Early\n\
             ---\n\
             # Essential: true\n",
        );
        assert_eq!(header.name.as_deref(), Some("Early"));
        assert!(!header.essential);
    }

    #[test]
    fn test_only_first_ten_lines_are_scanned() {
        let mut content = String::new();
        for i in 0..MAX_HEADER_LINES {
            content.push_str(&format!("# Filler: {i}\n"));
        }
        content.push_str("# Name: Too Late\n");

        let header = parse_header(&content);
        assert!(header.name.is_none());
    }

    #[test]
    fn test_comment_without_colon_is_skipped() {
        let header = parse_header("# plain comment\n# Name: After\n");
        assert_eq!(header.name.as_deref(), Some("After"));
    }

    #[test]
    fn test_indented_comment_still_counts() {
        let header = parse_header("  # Name: Indented\n");
        assert_eq!(header.name.as_deref(), Some("Indented"));
    }
}
