//! Candidate documents and contact extraction

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Contact identifier used when no email address is present.
pub const CONTACT_NOT_FOUND: &str = "Not Found";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("Invalid email regex")
    })
}

/// First email address in `text`, or [`CONTACT_NOT_FOUND`].
pub fn extract_contact(text: &str) -> String {
    email_regex()
        .find(text)
        .map(|found| found.as_str().to_string())
        .unwrap_or_else(|| CONTACT_NOT_FOUND.to_string())
}

/// One resume under evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub source_identifier: String,
    pub raw_text: String,
    pub contact_identifier: String,
}

impl Candidate {
    /// Build a candidate from page-ordered text.
    pub fn from_pages(source_identifier: impl Into<String>, pages: &[String]) -> Self {
        let raw_text = pages.join("\n");
        let contact_identifier = extract_contact(&raw_text);

        Self {
            source_identifier: source_identifier.into(),
            raw_text,
            contact_identifier,
        }
    }

    pub fn has_contact(&self) -> bool {
        self.contact_identifier != CONTACT_NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_email_wins() {
        let text = "Jane Roe\njane.roe+jobs@mail.example.org | backup: jr@other.io";
        assert_eq!(extract_contact(text), "jane.roe+jobs@mail.example.org");
    }

    #[test]
    fn test_email_requires_dotted_domain() {
        assert_eq!(extract_contact("reach me at jane@localhost"), CONTACT_NOT_FOUND);
        assert_eq!(extract_contact("jane@host.c"), CONTACT_NOT_FOUND);
        assert_eq!(extract_contact(""), CONTACT_NOT_FOUND);
    }

    #[test]
    fn test_pages_are_concatenated_in_order() {
        let pages = vec!["Page one jane@example.com".to_string(), "Page two".to_string()];
        let candidate = Candidate::from_pages("jane.pdf", &pages);

        assert_eq!(candidate.raw_text, "Page one jane@example.com\nPage two");
        assert_eq!(candidate.contact_identifier, "jane@example.com");
        assert!(candidate.has_contact());
    }

    #[test]
    fn test_empty_document_has_no_contact() {
        let candidate = Candidate::from_pages("blank.pdf", &[]);
        assert!(candidate.raw_text.is_empty());
        assert!(!candidate.has_contact());
    }
}
