//! Cover surface: what one cover slot should display, over time.
//!
//! A slot shows the deterministic fallback synchronously, runs one resolution
//! session in the background and, if an image is found, moves through a
//! cross-fade to the real image. Views are published on a
//! [`tokio::sync::watch`] channel so any renderer can follow along.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::identity::FallbackCover;
use crate::isbn::BookKey;
use crate::resolve::{ResolutionResult, Resolver};
use crate::session::ResolutionSession;

pub const DEFAULT_CROSSFADE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedImage {
    pub url: String,
    pub provider: String,
}

/// Display state of a slot. The fallback is always carried so a renderer can
/// draw it underneath during the fade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CoverView {
    /// Nothing mounted.
    Empty,
    Fallback { fallback: FallbackCover },
    CrossFading { fallback: FallbackCover, image: ResolvedImage },
    Image { fallback: FallbackCover, image: ResolvedImage },
}

impl CoverView {
    pub fn image(&self) -> Option<&ResolvedImage> {
        match self {
            CoverView::CrossFading { image, .. } | CoverView::Image { image, .. } => Some(image),
            CoverView::Empty | CoverView::Fallback { .. } => None,
        }
    }

    pub fn fallback(&self) -> Option<&FallbackCover> {
        match self {
            CoverView::Empty => None,
            CoverView::Fallback { fallback }
            | CoverView::CrossFading { fallback, .. }
            | CoverView::Image { fallback, .. } => Some(fallback),
        }
    }
}

/// One place on screen where a cover is shown. At most one session is active
/// per slot.
pub struct CoverSlot {
    resolver: Arc<Resolver>,
    crossfade: Duration,
    tx: watch::Sender<CoverView>,
    current: Option<Mounted>,
}

struct Mounted {
    key: BookKey,
    session: ResolutionSession,
    task: Option<JoinHandle<ResolutionResult>>,
}

impl CoverSlot {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        let (tx, _rx) = watch::channel(CoverView::Empty);
        Self {
            resolver,
            crossfade: DEFAULT_CROSSFADE,
            tx,
            current: None,
        }
    }

    /// Slot using the configured cross-fade (`resolve.crossfade_ms`).
    pub fn from_config(resolver: Arc<Resolver>, cfg: &AppConfig) -> Self {
        Self::new(resolver).with_crossfade(cfg.resolve.crossfade())
    }

    pub fn crossfade(&self) -> Duration {
        self.crossfade
    }

    pub fn with_crossfade(mut self, crossfade: Duration) -> Self {
        self.crossfade = crossfade;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<CoverView> {
        self.tx.subscribe()
    }

    pub fn view(&self) -> CoverView {
        self.tx.borrow().clone()
    }

    /// Session of the currently mounted book, if any.
    pub fn session(&self) -> Option<&ResolutionSession> {
        self.current.as_ref().map(|m| &m.session)
    }

    /// Show `key` in this slot. Returns the fallback view, which is already
    /// published. Showing the same key again is a no-op. Must be called from
    /// within a Tokio runtime.
    pub fn show(&mut self, key: BookKey) -> CoverView {
        if let Some(current) = &self.current {
            if current.key == key {
                return self.view();
            }
        }
        self.unmount();

        let fallback = FallbackCover::new(&key.title, &key.author);
        let view = CoverView::Fallback {
            fallback: fallback.clone(),
        };
        self.tx.send_replace(view.clone());

        let session = ResolutionSession::new();
        let task = tokio::spawn(run_session(
            Arc::clone(&self.resolver),
            key.clone(),
            session.clone(),
            self.tx.clone(),
            fallback,
            self.crossfade,
        ));
        self.current = Some(Mounted {
            key,
            session,
            task: Some(task),
        });
        view
    }

    /// Cancel the active session, if any. The current view is left as is.
    pub fn unmount(&mut self) {
        if let Some(mounted) = self.current.take() {
            mounted.session.cancel();
        }
    }

    /// Wait for the mounted session's background task, including the
    /// cross-fade. Returns `None` if nothing is mounted or it was already
    /// awaited.
    pub async fn settled(&mut self) -> Option<ResolutionResult> {
        let task = self.current.as_mut()?.task.take()?;
        task.await.ok()
    }
}

impl Drop for CoverSlot {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn run_session(
    resolver: Arc<Resolver>,
    key: BookKey,
    session: ResolutionSession,
    tx: watch::Sender<CoverView>,
    fallback: FallbackCover,
    crossfade: Duration,
) -> ResolutionResult {
    let result = resolver.resolve(&key, &session).await;
    let ResolutionResult::Resolved { url, provider } = &result else {
        return result;
    };
    let image = ResolvedImage {
        url: url.clone(),
        provider: provider.clone(),
    };

    // The active check runs under the channel's write lock, so a concurrent
    // `show` either sees our update and overwrites it, or cancels first.
    let published = publish_if_active(
        &tx,
        &session,
        CoverView::CrossFading {
            fallback: fallback.clone(),
            image: image.clone(),
        },
    );
    if published {
        tokio::time::sleep(crossfade).await;
        publish_if_active(&tx, &session, CoverView::Image { fallback, image });
    }
    result
}

fn publish_if_active(tx: &watch::Sender<CoverView>, session: &ResolutionSession, view: CoverView) -> bool {
    tx.send_if_modified(|current| {
        if !session.is_active() {
            return false;
        }
        *current = view;
        true
    })
}
