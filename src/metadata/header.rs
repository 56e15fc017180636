//! `key: value` header block, one blank line, then a free-form body.
//!
//! ```text
//! User: alice
//! Title: Admin
//!
//! This is a note for the user
//! ```

use crate::error::{DropWatchError, Result};
use regex::Regex;
use std::sync::LazyLock;

static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n\r?\n").expect("header boundary pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl ExtractedContent {
    /// Header value for `key`. Lookup is case-insensitive; later lines win.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim().to_lowercase();
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get) but treats a missing or empty value as an error
    /// attributed to `plugin`.
    pub fn require(&self, plugin: &str, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(DropWatchError::plugin(
                plugin,
                format!("Missing required metadata key \"{}\"", key.trim().to_lowercase()),
            )),
        }
    }

    /// `None` when the content had no blank line separating header and body.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn body_or_empty(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

pub fn extract(content: &str) -> ExtractedContent {
    let (header_block, body) = match BOUNDARY.find(content) {
        Some(boundary) => (
            &content[..boundary.start()],
            Some(content[boundary.end()..].to_string()),
        ),
        None => (content, None),
    };

    let headers = header_block
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once(':') {
            Some((key, value)) => (key.trim().to_lowercase(), value.trim().to_string()),
            None => (line.trim().to_lowercase(), String::new()),
        })
        .collect();

    ExtractedContent { headers, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_body() {
        let extracted = extract("User: alice\nTitle: Admin\n\nHello");

        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted.get("user"), Some("alice"));
        assert_eq!(extracted.get("title"), Some("Admin"));
        assert_eq!(extracted.body(), Some("Hello"));
    }

    #[test]
    fn test_keys_are_lowercased_and_trimmed() {
        let extracted = extract("  Content-Type :  text/plain \nX-PRIORITY:5\n\nbody");

        let keys: Vec<&str> = extracted.headers().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["content-type", "x-priority"]);
        assert_eq!(extracted.get("Content-Type"), Some("text/plain"));
        assert_eq!(extracted.get("x-priority"), Some("5"));
    }

    #[test]
    fn test_value_keeps_inner_colons() {
        let extracted = extract("Link: https://example.com:8443/path\nTime: 12:30:00\n\n");

        assert_eq!(extracted.get("link"), Some("https://example.com:8443/path"));
        assert_eq!(extracted.get("time"), Some("12:30:00"));
        assert_eq!(extracted.body(), Some(""));
    }

    #[test]
    fn test_body_is_everything_after_first_blank_line() {
        let content = "Topic: alerts\n\nfirst paragraph\n\nsecond paragraph\r\n\r\nthird";
        let extracted = extract(content);

        assert_eq!(
            extracted.body(),
            Some("first paragraph\n\nsecond paragraph\r\n\r\nthird")
        );
    }

    #[test]
    fn test_crlf_boundary() {
        let extracted = extract("To: bob@example.com\r\nSubject: Hi\r\n\r\nLine one\r\nLine two");

        assert_eq!(extracted.get("to"), Some("bob@example.com"));
        assert_eq!(extracted.get("subject"), Some("Hi"));
        assert_eq!(extracted.body(), Some("Line one\r\nLine two"));
    }

    #[test]
    fn test_missing_boundary_leaves_body_empty() {
        let extracted = extract("User: alice\nTitle: Admin");

        assert_eq!(extracted.get("user"), Some("alice"));
        assert_eq!(extracted.body(), None);
        assert_eq!(extracted.body_or_empty(), "");
    }

    #[test]
    fn test_line_without_colon_becomes_empty_value() {
        let extracted = extract("urgent\nUser: alice\n\nbody");

        assert_eq!(extracted.get("urgent"), Some(""));
        assert_eq!(extracted.get("user"), Some("alice"));
    }

    #[test]
    fn test_blank_header_lines_are_dropped() {
        let extracted = extract("user: alice\n   \n\t\ntitle: Admin");

        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted.get(""), None);
        assert_eq!(extracted.get("title"), Some("Admin"));
        assert_eq!(extracted.body(), None);
    }

    #[test]
    fn test_later_duplicate_wins() {
        let extracted = extract("Topic: first\nTOPIC: second\n\n");

        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted.get("topic"), Some("second"));
    }

    #[test]
    fn test_require_reports_missing_key() {
        let extracted = extract("User: alice\nTitle:\n\nbody");

        assert_eq!(extracted.require("example", "User").unwrap(), "alice");

        let missing = extracted.require("example", "title").unwrap_err();
        assert!(missing.to_string().contains("\"title\""));
        assert!(matches!(missing, DropWatchError::Plugin { ref plugin, .. } if plugin == "example"));
    }

    #[test]
    fn test_empty_content() {
        let extracted = extract("");
        assert!(extracted.is_empty());
        assert_eq!(extracted.body(), None);
    }
}
