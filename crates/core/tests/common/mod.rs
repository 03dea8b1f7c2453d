//! Scripted providers and probes for resolver tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use cover_resolver_core::error::{LookupError, ProbeError};
use cover_resolver_core::isbn::Isbn;
use cover_resolver_core::probe::{BoundedProbe, Dimensions, ImageProbe};
use cover_resolver_core::provider::CoverProvider;
use cover_resolver_core::registry::ProviderRegistry;
use cover_resolver_core::resolve::Resolver;

pub const ISBN: &str = "9788937460449";

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Provider returning a fixed candidate list (or a lookup failure) and
/// counting how often it was asked.
pub struct ScriptedProvider {
    name: String,
    enabled: bool,
    candidates: Option<Vec<String>>,
    timeout: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn build(name: &str, enabled: bool, candidates: Option<&[&str]>, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            enabled,
            candidates: candidates.map(|c| c.iter().map(|u| u.to_string()).collect()),
            timeout,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn new(name: &str, candidates: &[&str]) -> Arc<Self> {
        Self::build(name, true, Some(candidates), Duration::from_secs(4))
    }

    /// Its own lookup step fails.
    pub fn failing(name: &str) -> Arc<Self> {
        Self::build(name, true, None, Duration::from_secs(4))
    }

    pub fn disabled(name: &str, candidates: &[&str]) -> Arc<Self> {
        Self::build(name, false, Some(candidates), Duration::from_secs(4))
    }

    pub fn with_timeout(name: &str, candidates: &[&str], timeout: Duration) -> Arc<Self> {
        Self::build(name, true, Some(candidates), timeout)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoverProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn candidate_timeout(&self) -> Duration {
        self.timeout
    }

    async fn candidates(&self, _isbn: &Isbn) -> Result<Vec<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.candidates.clone().ok_or(LookupError::Network("connection refused".into()))
    }
}

#[derive(Clone)]
pub enum Behavior {
    Image(u32, u32),
    Fail,
    Hang,
    /// Signal `entered`, wait for `release`, then succeed with a cover.
    Gated { entered: Arc<Notify>, release: Arc<Notify> },
}

/// Probe answering per URL; unknown URLs fail. Records every URL loaded.
#[derive(Default)]
pub struct ScriptedProbe {
    behavior: HashMap<String, Behavior>,
    loaded: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(script: &[(&str, Behavior)]) -> Arc<Self> {
        Arc::new(Self {
            behavior: script.iter().map(|(u, b)| (u.to_string(), b.clone())).collect(),
            loaded: Mutex::new(Vec::new()),
        })
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProbe for ScriptedProbe {
    async fn load_and_measure(&self, url: &str) -> Result<Dimensions, ProbeError> {
        self.loaded.lock().unwrap().push(url.to_string());
        match self.behavior.get(url).cloned() {
            Some(Behavior::Image(width, height)) => Ok(Dimensions { width, height }),
            Some(Behavior::Hang) => std::future::pending().await,
            Some(Behavior::Gated { entered, release }) => {
                entered.notify_one();
                release.notified().await;
                Ok(Dimensions { width: 120, height: 174 })
            }
            Some(Behavior::Fail) | None => Err(ProbeError::Status(404)),
        }
    }
}

pub fn resolver(providers: &[&Arc<ScriptedProvider>], probe: &Arc<ScriptedProbe>) -> Resolver {
    let mut registry = ProviderRegistry::new();
    for p in providers {
        let p: Arc<dyn CoverProvider> = Arc::clone(*p) as Arc<dyn CoverProvider>;
        registry.register(p);
    }
    Resolver::new(registry, BoundedProbe::new(Arc::clone(probe) as Arc<dyn ImageProbe>))
}
