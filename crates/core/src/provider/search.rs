//! JSON search-API providers (Kakao, Naver, Google Books and user-defined).
//!
//! Each one issues a single read-only GET, takes the image URL from the first
//! result via a JSON path and applies a light cleanup. Any failure of that
//! step is a [`LookupError`], which the resolver turns into "no candidates".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json_path::JsonPath;

use crate::error::{ConfigError, LookupError};
use crate::isbn::Isbn;
use crate::provider::{force_https, CoverProvider};

pub const KAKAO_BASE_URL: &str = "https://dapi.kakao.com";
pub const NAVER_BASE_URL: &str = "https://openapi.naver.com";
pub const GOOGLE_BOOKS_API_BASE_URL: &str = "https://www.googleapis.com";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_CANDIDATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Post-processing applied to the extracted image URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlCleanup {
    /// Leave the URL exactly as returned.
    Verbatim,
    /// Rewrite `http:` to `https:`.
    ForceHttps,
    /// `ForceHttps`, drop the decorative `edge` parameter and pin `zoom=1`.
    GoogleThumbnail,
}

impl UrlCleanup {
    pub fn apply(self, url: &str) -> String {
        match self {
            UrlCleanup::Verbatim => url.to_string(),
            UrlCleanup::ForceHttps => force_https(url),
            UrlCleanup::GoogleThumbnail => canonical_google_thumbnail(url),
        }
    }
}

fn canonical_google_thumbnail(url: &str) -> String {
    let https = force_https(url);
    let Ok(mut parsed) = reqwest::Url::parse(&https) else {
        return https;
    };
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "edge")
        .map(|(k, v)| {
            let v = if k == "zoom" { "1".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parsed.to_string()
}

/// A provider backed by one JSON search endpoint.
#[derive(Debug, Clone)]
pub struct SearchProvider {
    name: String,
    client: reqwest::Client,
    url_template: String,
    headers: Vec<(String, String)>,
    image_path: JsonPath,
    cleanup: UrlCleanup,
    request_timeout: Duration,
    candidate_timeout: Duration,
    enabled: bool,
}

impl SearchProvider {
    /// `url_template` must contain `{isbn}`; `image_path` is a JSON path such
    /// as `$.items[0].image`.
    pub fn new(
        name: impl Into<String>,
        client: reqwest::Client,
        url_template: impl Into<String>,
        image_path: &str,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let image_path = JsonPath::parse(image_path).map_err(|e| ConfigError::InvalidJsonPath {
            provider: name.clone(),
            path: image_path.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name,
            client,
            url_template: url_template.into(),
            headers: Vec::new(),
            image_path,
            cleanup: UrlCleanup::ForceHttps,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            candidate_timeout: DEFAULT_CANDIDATE_TIMEOUT,
            enabled: true,
        })
    }

    /// Kakao book search. Disabled without an API key.
    pub fn kakao(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut p = Self::new(
            "kakao",
            client,
            format!("{}/v3/search/book?query={{isbn}}&size=1", base_url.trim_end_matches('/')),
            "$.documents[0].thumbnail",
        )?;
        match api_key.filter(|k| !k.is_empty()) {
            Some(key) => p = p.with_header("Authorization", format!("KakaoAK {key}")),
            None => p.enabled = false,
        }
        Ok(p)
    }

    /// Naver book search. Needs both the client id and the client secret.
    pub fn naver(
        client: reqwest::Client,
        base_url: &str,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut p = Self::new(
            "naver",
            client,
            format!("{}/v1/search/book.json?query={{isbn}}&display=1", base_url.trim_end_matches('/')),
            "$.items[0].image",
        )?;
        match (client_id.filter(|s| !s.is_empty()), client_secret.filter(|s| !s.is_empty())) {
            (Some(id), Some(secret)) => {
                p = p
                    .with_header("X-Naver-Client-Id", id)
                    .with_header("X-Naver-Client-Secret", secret);
            }
            _ => p.enabled = false,
        }
        Ok(p)
    }

    /// Google Books volumes API. Keyless.
    pub fn google_books_api(client: reqwest::Client, base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            "google-books-api",
            client,
            format!("{}/books/v1/volumes?q=isbn:{{isbn}}", base_url.trim_end_matches('/')),
            "$.items[0].volumeInfo.imageLinks.thumbnail",
        )?
        .with_cleanup(UrlCleanup::GoogleThumbnail)
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(3)))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cleanup(mut self, cleanup: UrlCleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// `request` bounds the search call itself; `candidate` bounds each probe.
    pub fn with_timeouts(mut self, request: Duration, candidate: Duration) -> Self {
        self.request_timeout = request;
        self.candidate_timeout = candidate;
        self
    }

    /// Can only switch a provider off; a missing credential stays missing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = self.enabled && enabled;
        self
    }
}

#[async_trait]
impl CoverProvider for SearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn candidate_timeout(&self) -> Duration {
        self.candidate_timeout
    }

    async fn candidates(&self, isbn: &Isbn) -> Result<Vec<String>, LookupError> {
        let url = self.url_template.replace("{isbn}", isbn.as_str());
        let mut request = self.client.get(&url).timeout(self.request_timeout);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(0);
            return Err(LookupError::RateLimited {
                provider: self.name.clone(),
                retry_after_ms,
            });
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                provider: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| LookupError::ProviderError {
                    provider: self.name.clone(),
                    message: e.to_string(),
                })?;

        let image = self
            .image_path
            .query(&body)
            .first()
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(LookupError::NotFound)?;

        Ok(vec![self.cleanup.apply(image)])
    }
}
