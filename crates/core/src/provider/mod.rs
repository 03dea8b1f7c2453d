//! Cover providers: named strategies that turn a normalized ISBN into
//! candidate image URLs.
//!
//! Two shapes cover every source we know about:
//! - [`direct::DirectProvider`]: URL templates filled with the ISBN, no network
//!   call needed to build the candidates.
//! - [`search::SearchProvider`]: one GET to a JSON search endpoint, image URL
//!   extracted from the first result with a JSON path.

pub mod direct;
pub mod search;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::isbn::Isbn;

/// A single source of cover images.
///
/// Implementations must be cheap to query for `is_enabled` (it is evaluated
/// once at the start of every resolution) and must not perform network I/O
/// when disabled.
#[async_trait]
pub trait CoverProvider: Send + Sync {
    /// Short, stable identifier (e.g. `"kakao"`), reported with a winning URL.
    fn name(&self) -> &str;

    /// `false` when a required credential is missing or the provider was
    /// switched off by configuration.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Probe budget for each candidate this provider yields.
    fn candidate_timeout(&self) -> Duration;

    /// Candidate URLs in the order they should be probed. An `Err` is treated
    /// by the resolver as zero candidates.
    async fn candidates(&self, isbn: &Isbn) -> Result<Vec<String>, LookupError>;
}

/// Snapshot of a provider's static description, for listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderSpec {
    pub name: String,
    pub enabled: bool,
    pub candidate_timeout_ms: u64,
}

impl ProviderSpec {
    pub fn of(provider: &dyn CoverProvider) -> Self {
        Self {
            name: provider.name().to_string(),
            enabled: provider.is_enabled(),
            candidate_timeout_ms: provider.candidate_timeout().as_millis() as u64,
        }
    }
}

/// Rewrite a leading `http:` scheme to `https:`. Other URLs pass through.
pub fn force_https(url: &str) -> String {
    match url.strip_prefix("http:") {
        Some(rest) => format!("https:{rest}"),
        None => url.to_string(),
    }
}
