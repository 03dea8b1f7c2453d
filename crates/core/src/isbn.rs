//! Book keys and ISBN normalization.

use serde::{Deserialize, Serialize};

/// What the caller knows about a book. Any field may be noisy or empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BookKey {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

impl BookKey {
    pub fn new(title: impl Into<String>, author: impl Into<String>, isbn: Option<&str>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: isbn.map(str::to_string),
        }
    }

    /// Normalized ISBN used for provider lookups, or `None` when nothing
    /// digit-like survives normalization.
    pub fn normalized_isbn(&self) -> Option<Isbn> {
        self.isbn.as_deref().and_then(Isbn::parse)
    }
}

/// An ISBN reduced to its digits. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Isbn(String);

impl Isbn {
    /// Strip every non-digit character. Returns `None` if the result is empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = normalize_isbn(raw);
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split after the first `at` digits (clamped to the length).
    pub fn split_at(&self, at: usize) -> (&str, &str) {
        self.0.split_at(at.min(self.0.len()))
    }

    /// ISBN-10 and ISBN-13 are the only lengths publishers assign.
    pub fn has_standard_length(&self) -> bool {
        matches!(self.0.len(), 10 | 13)
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keep only ASCII digits. `"978-89-374-6044-9"` becomes `"9788937460449"`.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
