//! Per-cover resolution session: the cancellation flag and what was tried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Where a session is in its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum ResolveState {
    #[default]
    Idle,
    /// Working through the provider at this registry index.
    Probing(usize),
    Resolved,
    Unresolved,
}

impl ResolveState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ResolveState::Resolved | ResolveState::Unresolved)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    state: ResolveState,
    attempted: Vec<String>,
    winner: Option<String>,
}

/// Mutable run-time state of one in-flight resolution.
///
/// Cloning yields another handle to the *same* session: the owning cover
/// keeps one to cancel, the resolver task keeps the other. Sessions are never
/// shared between covers.
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    active: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
}

impl Default for ResolutionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionSession {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the session as no longer wanted. Idempotent. In-flight requests
    /// keep running but their results are discarded.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn state(&self) -> ResolveState {
        self.lock().state
    }

    /// Providers entered so far, in order.
    pub fn attempted_providers(&self) -> Vec<String> {
        self.lock().attempted.clone()
    }

    /// Provider that produced the winning image, if any.
    pub fn winner(&self) -> Option<String> {
        self.lock().winner.clone()
    }

    pub(crate) fn transition(&self, next: ResolveState) {
        let mut state = self.lock();
        tracing::trace!(from = ?state.state, to = ?next, "session transition");
        state.state = next;
    }

    pub(crate) fn record_attempt(&self, provider: &str) {
        self.lock().attempted.push(provider.to_string());
    }

    pub(crate) fn record_winner(&self, provider: &str) {
        self.lock().winner = Some(provider.to_string());
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // State is plain data; a panic mid-push cannot leave it inconsistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
