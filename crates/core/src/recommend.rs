//! Book recommendation records as delivered by the recommendation service.
//!
//! The service itself (a structured generative-AI call) lives elsewhere; this
//! module only gives its JSON output a type, normalizes ISBNs and derives the
//! links the UI shows next to each book.

use std::path::Path;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::{CoverError, RecommendError};
use crate::isbn::{normalize_isbn, BookKey, Isbn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecommendation {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ai_reason: String,
    /// Three short theme tags.
    #[serde(default)]
    pub vibe: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryAvailability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryAvailability {
    pub name: String,
    pub available: bool,
    /// e.g. `"1.2km"`, when available.
    pub distance: Option<String>,
    /// Queue length, when not available.
    pub waitlist: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseLinks {
    pub yes24: String,
    pub kyobo: String,
    pub aladin: String,
}

/// Everything except the URI-component unreserved marks `-_.!~*'()`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

impl BookRecommendation {
    /// The part of the record cover resolution cares about.
    pub fn book_key(&self) -> BookKey {
        BookKey::new(&self.title, &self.author, Some(self.isbn.as_str()))
    }

    /// Error if the ISBN has no digits at all.
    pub fn require_isbn(&self) -> Result<Isbn, RecommendError> {
        Isbn::parse(&self.isbn).ok_or_else(|| RecommendError::InvalidIsbn {
            title: self.title.clone(),
        })
    }

    /// Bookstore search pages for this title.
    pub fn purchase_links(&self) -> PurchaseLinks {
        let q = encode(&self.title);
        PurchaseLinks {
            yes24: format!("https://www.yes24.com/Product/Search?query={q}"),
            kyobo: format!("https://search.kyobobook.co.kr/search?keyword={q}"),
            aladin: format!("https://www.aladin.co.kr/search/wsearchresult.aspx?SearchWord={q}"),
        }
    }
}

impl LibraryAvailability {
    /// Naver map search for the library, centred on `near` when known.
    pub fn map_url(&self, near: Option<GeoPoint>) -> String {
        let mut url = format!("https://map.naver.com/v5/search/{}", encode(&self.name));
        if let Some(p) = near {
            url.push_str(&format!("?c={},{},15,0,0,0,dh", p.longitude, p.latitude));
        }
        url
    }
}

/// Parse the service's JSON array and normalize every ISBN to digits.
///
/// Books whose ISBN is not 10 or 13 digits are kept (cover resolution will
/// still try, or fall back) but reported at warn level.
pub fn parse_recommendations(json: &str) -> Result<Vec<BookRecommendation>, RecommendError> {
    let mut books: Vec<BookRecommendation> = serde_json::from_str(json)?;
    for book in &mut books {
        book.isbn = normalize_isbn(&book.isbn);
        let standard = Isbn::parse(&book.isbn).is_some_and(|i| i.has_standard_length());
        if !standard {
            tracing::warn!(title = %book.title, isbn = %book.isbn, "recommendation has a non-standard ISBN");
        }
    }
    Ok(books)
}

/// Read a recommendations file and parse it.
pub fn load_recommendations(path: &Path) -> Result<Vec<BookRecommendation>, CoverError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_recommendations(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"[
        {
            "title": "데미안",
            "author": "헤르만 헤세",
            "publisher": "민음사",
            "isbn": "978-89-374-6044-9",
            "description": "자아를 찾아가는 성장 소설.",
            "aiReason": "지금의 고민과 닮아 있어요.",
            "vibe": ["성장", "자아", "고전"],
            "libraries": [
                { "name": "마포중앙도서관", "available": true, "distance": "1.2km" },
                { "name": "서초도서관", "available": false, "waitlist": 4 }
            ]
        },
        { "title": "무제", "author": "", "isbn": "" }
    ]"#;

    #[test]
    fn parses_and_normalizes() {
        let books = parse_recommendations(SAMPLE).unwrap();
        assert_eq!(books.len(), 2);
        let demian = &books[0];
        assert_eq!(demian.isbn, "9788937460449");
        assert_eq!(demian.ai_reason, "지금의 고민과 닮아 있어요.");
        assert_eq!(demian.vibe.len(), 3);
        assert_eq!(demian.libraries[1].waitlist, Some(4));
        assert_eq!(demian.libraries[0].distance.as_deref(), Some("1.2km"));

        let key = demian.book_key();
        assert_eq!(key.normalized_isbn().unwrap().as_str(), "9788937460449");
        assert!(books[1].book_key().normalized_isbn().is_none());
    }

    #[test]
    fn require_isbn() {
        let books = parse_recommendations(SAMPLE).unwrap();
        assert!(books[0].require_isbn().is_ok());
        assert!(matches!(books[1].require_isbn(), Err(RecommendError::InvalidIsbn { .. })));
    }

    #[test]
    fn malformed_payload() {
        assert!(matches!(parse_recommendations("{"), Err(RecommendError::Parse(_))));
    }

    #[test]
    fn links_are_encoded() {
        let books = parse_recommendations(SAMPLE).unwrap();
        let links = books[0].purchase_links();
        assert_eq!(links.yes24, "https://www.yes24.com/Product/Search?query=%EB%8D%B0%EB%AF%B8%EC%95%88");
        assert!(links.kyobo.starts_with("https://search.kyobobook.co.kr/search?keyword=%EB"));

        let lib = &books[0].libraries[0];
        assert!(lib.map_url(None).starts_with("https://map.naver.com/v5/search/%EB%A7%88"));
        let near = lib.map_url(Some(GeoPoint { latitude: 37.5, longitude: 126.9 }));
        assert!(near.ends_with("?c=126.9,37.5,15,0,0,0,dh"));
    }

    #[test]
    fn links_keep_unreserved_marks() {
        let book = BookRecommendation {
            title: "Tom's (Best)-Of_Vol.1! ~*".into(),
            author: String::new(),
            publisher: String::new(),
            isbn: String::new(),
            description: String::new(),
            ai_reason: String::new(),
            vibe: Vec::new(),
            libraries: Vec::new(),
        };
        assert_eq!(
            book.purchase_links().yes24,
            "https://www.yes24.com/Product/Search?query=Tom's%20(Best)-Of_Vol.1!%20~*"
        );
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_recommendations(&path).unwrap().len(), 2);

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_recommendations(&missing), Err(CoverError::Io(_))));

        std::fs::write(&path, "[{").unwrap();
        assert!(matches!(
            load_recommendations(&path),
            Err(CoverError::Recommend(RecommendError::Parse(_)))
        ));
    }
}
