//! Direct URL-pattern providers: well-known CDN paths keyed by ISBN.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::isbn::Isbn;
use crate::provider::CoverProvider;

/// Digits of the ISBN that go into `{isbn_prefix}`; the remainder is `{isbn_rest}`.
const PREFIX_DIGITS: usize = 5;

/// Builds candidates by substituting the ISBN into URL templates.
///
/// Placeholders: `{isbn}`, `{isbn_prefix}` (first five digits) and
/// `{isbn_rest}` (everything after them).
#[derive(Debug, Clone)]
pub struct DirectProvider {
    name: String,
    templates: Vec<String>,
    timeout: Duration,
    enabled: bool,
}

impl DirectProvider {
    pub fn new(name: impl Into<String>, templates: Vec<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            templates,
            timeout,
            enabled: true,
        }
    }

    /// Google Books content server; the fastest and most available source.
    pub fn google_books(timeout: Duration) -> Self {
        Self::new(
            "google-books-direct",
            vec![
                "https://books.google.com/books/content?vid=ISBN{isbn}&printsec=frontcover&img=1&zoom=1".to_string(),
                "https://books.google.com/books/publisher/content?id=ISBN{isbn}&printsec=frontcover&img=1&zoom=1".to_string(),
            ],
            timeout,
        )
    }

    /// Aladin image CDN, sharded by the first five ISBN digits.
    pub fn aladin(timeout: Duration) -> Self {
        Self::new(
            "aladin",
            vec![
                "https://image.aladin.co.kr/product/{isbn_prefix}/{isbn_rest}_1.jpg".to_string(),
                "https://cover.aladin.co.kr/getbook.aspx?isbn={isbn}&Cover=Big".to_string(),
            ],
            timeout,
        )
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn expand(&self, isbn: &Isbn) -> Vec<String> {
        let (prefix, rest) = isbn.split_at(PREFIX_DIGITS);
        self.templates
            .iter()
            .map(|t| {
                t.replace("{isbn_prefix}", prefix)
                    .replace("{isbn_rest}", rest)
                    .replace("{isbn}", isbn.as_str())
            })
            .collect()
    }
}

#[async_trait]
impl CoverProvider for DirectProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn candidate_timeout(&self) -> Duration {
        self.timeout
    }

    async fn candidates(&self, isbn: &Isbn) -> Result<Vec<String>, LookupError> {
        Ok(self.expand(isbn))
    }
}
