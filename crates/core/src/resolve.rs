//! Resolution orchestrator: walk the registry in order, probe each candidate,
//! stop at the first usable image.
//!
//! Per session the walk is `Idle -> Probing(i) -> Resolved | Unresolved`.
//! Providers are tried strictly in registry order and candidates strictly in
//! the order a provider yields them; nothing runs concurrently inside one
//! resolution. The session's `active` flag is checked before every step and
//! after every await, so a cancelled session never reports a result.
//!
//! Resolution never fails outwardly. Provider and probe errors are logged at
//! debug level and fall through to the next candidate or provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::isbn::{BookKey, Isbn};
use crate::probe::{BoundedProbe, HttpImageProbe};
use crate::registry::{build_client, ProviderRegistry};
use crate::session::{ResolutionSession, ResolveState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolutionResult {
    Resolved { url: String, provider: String },
    Unresolved,
}

impl ResolutionResult {
    pub fn url(&self) -> Option<&str> {
        match self {
            ResolutionResult::Resolved { url, .. } => Some(url),
            ResolutionResult::Unresolved => None,
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            ResolutionResult::Resolved { provider, .. } => Some(provider),
            ResolutionResult::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved { .. })
    }
}

pub struct Resolver {
    registry: ProviderRegistry,
    probe: BoundedProbe,
    deadline: Option<Duration>,
    memo: Option<Mutex<HashMap<Isbn, ResolutionResult>>>,
}

impl Resolver {
    pub fn new(registry: ProviderRegistry, probe: BoundedProbe) -> Self {
        Self {
            registry,
            probe,
            deadline: None,
            memo: None,
        }
    }

    /// Default registry, HTTP probe and deadline from configuration.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ConfigError> {
        let client = build_client(&cfg.probe)?;
        let registry = ProviderRegistry::from_config(cfg, client.clone())?;
        let probe = BoundedProbe::new(Arc::new(
            HttpImageProbe::new(client).with_max_bytes(cfg.probe.max_bytes),
        ))
        .with_min_width(cfg.probe.min_width);
        Ok(Self::new(registry, probe).with_deadline(cfg.resolve.deadline()))
    }

    /// Upper bound on a whole resolution. Per-candidate timeouts still apply.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Remember winners per ISBN for the lifetime of this resolver.
    /// Misses are not remembered.
    pub fn with_memo(mut self) -> Self {
        self.memo = Some(Mutex::new(HashMap::new()));
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolve with a fresh session nobody else can cancel.
    pub async fn resolve_once(&self, key: &BookKey) -> ResolutionResult {
        self.resolve(key, &ResolutionSession::new()).await
    }

    pub async fn resolve(&self, key: &BookKey, session: &ResolutionSession) -> ResolutionResult {
        let Some(isbn) = key.normalized_isbn() else {
            debug!(title = %key.title, "no ISBN, keeping fallback");
            session.transition(ResolveState::Unresolved);
            return ResolutionResult::Unresolved;
        };
        if !session.is_active() {
            return ResolutionResult::Unresolved;
        }

        if let Some(hit) = self.remembered(&isbn) {
            if let Some(provider) = hit.provider() {
                session.record_winner(provider);
            }
            session.transition(ResolveState::Resolved);
            return hit;
        }

        let walk = self.walk(&isbn, session);
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, walk).await.unwrap_or_else(|_| {
                debug!(isbn = %isbn, ms = deadline.as_millis() as u64, "resolution deadline reached");
                ResolutionResult::Unresolved
            }),
            None => walk.await,
        };

        if !session.is_active() {
            return ResolutionResult::Unresolved;
        }

        match &result {
            ResolutionResult::Resolved { url, provider } => {
                info!(title = %key.title, isbn = %isbn, provider = %provider, url = %url, "cover resolved");
                session.transition(ResolveState::Resolved);
                self.remember(&isbn, &result);
            }
            ResolutionResult::Unresolved => {
                info!(title = %key.title, isbn = %isbn, "all providers exhausted, keeping fallback");
                session.transition(ResolveState::Unresolved);
            }
        }
        result
    }

    async fn walk(&self, isbn: &Isbn, session: &ResolutionSession) -> ResolutionResult {
        // Availability is fixed for the whole run.
        let enabled: Vec<bool> = self.registry.providers().iter().map(|p| p.is_enabled()).collect();

        for (index, provider) in self.registry.providers().iter().enumerate() {
            if !session.is_active() {
                return ResolutionResult::Unresolved;
            }
            let name = provider.name();
            if !enabled[index] {
                debug!(provider = name, "provider unavailable, skipping");
                continue;
            }

            session.transition(ResolveState::Probing(index));
            session.record_attempt(name);

            let candidates = match provider.candidates(isbn).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    debug!(provider = name, error = %e, "provider yielded no candidates");
                    continue;
                }
            };

            for url in candidates {
                if !session.is_active() {
                    return ResolutionResult::Unresolved;
                }
                if let Some(url) = self.probe.probe(&url, provider.candidate_timeout()).await {
                    if !session.is_active() {
                        return ResolutionResult::Unresolved;
                    }
                    session.record_winner(name);
                    return ResolutionResult::Resolved {
                        url,
                        provider: name.to_string(),
                    };
                }
            }
        }

        ResolutionResult::Unresolved
    }

    fn remembered(&self, isbn: &Isbn) -> Option<ResolutionResult> {
        let memo = self.memo.as_ref()?;
        let memo = memo.lock().unwrap_or_else(|p| p.into_inner());
        memo.get(isbn).cloned()
    }

    fn remember(&self, isbn: &Isbn, result: &ResolutionResult) {
        if let Some(memo) = &self.memo {
            let mut memo = memo.lock().unwrap_or_else(|p| p.into_inner());
            memo.insert(isbn.clone(), result.clone());
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("probe", &self.probe)
            .field("deadline", &self.deadline)
            .field("memo", &self.memo.is_some())
            .finish()
    }
}
