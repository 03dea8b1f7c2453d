//! Book cover resolution.
//!
//! Every book gets a deterministic fallback cover instantly ([`identity`]);
//! a [`resolve::Resolver`] then walks an ordered [`registry`] of image
//! [`provider`]s through a time-bounded [`probe`] and reports the first usable
//! image, if any. [`surface::CoverSlot`] ties the two together for one place
//! on screen.

pub mod config;
pub mod error;
pub mod identity;
pub mod isbn;
pub mod probe;
pub mod provider;
pub mod recommend;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod surface;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::identity::{identity_of, FallbackCover, VisualIdentity};
    pub use crate::isbn::{BookKey, Isbn};
    pub use crate::resolve::{ResolutionResult, Resolver};
    pub use crate::session::ResolutionSession;
    pub use crate::surface::{CoverSlot, CoverView};
}
