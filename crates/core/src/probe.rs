//! Bounded probe: confirm a candidate URL is a real, usable image within a
//! deadline.
//!
//! The probe is split in two. [`ImageProbe`] is the capability "load this URL
//! and tell me its dimensions"; [`BoundedProbe`] wraps any implementation with
//! the per-candidate deadline and the minimum-size sanity check, and collapses
//! every failure into `None`.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::ProbeError;

/// Widths at or below this are tracking pixels or "no cover" placeholders.
pub const DEFAULT_MIN_WIDTH: u32 = 5;

/// Cap on how much of a candidate we are willing to download.
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Load a resource and measure it. Implementations need not enforce a
/// deadline; [`BoundedProbe`] does that by dropping the future.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn load_and_measure(&self, url: &str) -> Result<Dimensions, ProbeError>;
}

/// Decode just enough of `bytes` to learn the image dimensions.
pub fn measure(bytes: &[u8]) -> Result<Dimensions, ProbeError> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ProbeError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ProbeError::Decode(e.to_string()))?;
    Ok(Dimensions { width, height })
}

/// Fetches candidates with a plain GET and reads the image header.
#[derive(Debug, Clone)]
pub struct HttpImageProbe {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpImageProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn load_and_measure(&self, url: &str) -> Result<Dimensions, ProbeError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }
        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(ProbeError::TooLarge {
                    size: len,
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?
        {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_bytes {
                return Err(ProbeError::TooLarge {
                    size: body.len() as u64,
                    limit: self.max_bytes,
                });
            }
        }

        measure(&body)
    }
}

/// Deadline plus sanity threshold around an [`ImageProbe`].
#[derive(Clone)]
pub struct BoundedProbe {
    inner: Arc<dyn ImageProbe>,
    min_width: u32,
}

impl BoundedProbe {
    pub fn new(inner: Arc<dyn ImageProbe>) -> Self {
        Self {
            inner,
            min_width: DEFAULT_MIN_WIDTH,
        }
    }

    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = min_width;
        self
    }

    /// Like [`probe`](Self::probe) but keeps the failure reason.
    ///
    /// On timeout the inner future is dropped, so a response arriving after
    /// the deadline has nowhere to go.
    pub async fn check(&self, url: &str, timeout: Duration) -> Result<Dimensions, ProbeError> {
        let dims = tokio::time::timeout(timeout, self.inner.load_and_measure(url))
            .await
            .map_err(|_| ProbeError::Timeout {
                ms: timeout.as_millis() as u64,
            })??;
        if dims.width <= self.min_width {
            return Err(ProbeError::TooSmall {
                width: dims.width,
                height: dims.height,
            });
        }
        Ok(dims)
    }

    /// `Some(url)` if the candidate is a usable image, `None` otherwise.
    /// Never fails.
    pub async fn probe(&self, url: &str, timeout: Duration) -> Option<String> {
        match self.check(url, timeout).await {
            Ok(dims) => {
                debug!(url, width = dims.width, height = dims.height, "candidate accepted");
                Some(url.to_string())
            }
            Err(e) => {
                debug!(url, error = %e, "candidate rejected");
                None
            }
        }
    }
}

impl std::fmt::Debug for BoundedProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedProbe")
            .field("min_width", &self.min_width)
            .finish_non_exhaustive()
    }
}
