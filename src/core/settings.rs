//! Path resolution settings: base URL and query string.

use once_cell::sync::Lazy;
use regex::Regex;

// absolute or protocol-relative
static ABSOLUTE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:https?:)?//").unwrap());

/// Loader-wide settings applied to every subsequently dispatched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub base_url: Option<String>,
    pub querystring: Option<String>,
}

impl Settings {
    /// Create settings from an optional base URL and query string
    pub fn new(base_url: Option<String>, querystring: Option<String>) -> Self {
        Self {
            base_url,
            querystring,
        }
    }

    /// Normalized path for `file`: prefixed with the base URL unless the file
    /// is empty or already an absolute URL.
    pub fn resolve(&self, file: &str) -> String {
        match self.base_url.as_deref() {
            Some(base) if !base.is_empty() && !file.is_empty() && !ABSOLUTE_URL.is_match(file) => {
                format!("{base}{file}")
            }
            _ => file.to_string(),
        }
    }

    /// URL handed to the fetcher for a normalized path.
    pub fn url_for(&self, path: &str) -> String {
        match self.querystring.as_deref() {
            Some(query) if !query.is_empty() => {
                let separator = if path.contains('?') { '&' } else { '?' };
                format!("{path}{separator}{query}")
            }
            _ => path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_base_url() {
        let settings = Settings::new(Some("./js/".to_string()), None);

        assert_eq!(settings.resolve("base-url.js"), "./js/base-url.js");
        assert_eq!(
            settings.resolve("https://example.com/jquery.min.js"),
            "https://example.com/jquery.min.js"
        );
        assert_eq!(settings.resolve("http://example.com/a.js"), "http://example.com/a.js");
        assert_eq!(settings.resolve("//cdn.example.com/a.js"), "//cdn.example.com/a.js");
        assert_eq!(settings.resolve(""), "");
    }

    #[test]
    fn test_resolve_without_base_url() {
        let settings = Settings::default();
        assert_eq!(settings.resolve("a.js"), "a.js");

        let settings = Settings::new(Some(String::new()), None);
        assert_eq!(settings.resolve("a.js"), "a.js");
    }

    #[test]
    fn test_url_for_querystring() {
        let settings = Settings::new(None, Some("v=42".to_string()));
        assert_eq!(settings.url_for("a.js"), "a.js?v=42");
        assert_eq!(settings.url_for("a.js?x=1"), "a.js?x=1&v=42");

        let settings = Settings::default();
        assert_eq!(settings.url_for("a.js"), "a.js");
    }
}
