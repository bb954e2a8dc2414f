//! Upstream capabilities the graph builder consumes.
//!
//! - `HandleResolver`: handle → identity (name registry)
//! - `ProfileProvider`: identity → profile
//! - `RelationshipProvider`: (source, target) → follow link, plus readiness
//!
//! Concrete Farcaster bindings live in `fname` and `hub`; tests swap in
//! in-memory fakes.

mod fname;
mod hub;

pub use fname::FnameRegistry;
pub use hub::HubClient;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::graph::{Identity, FARCASTER_EPOCH_MS};

/// Profile attributes of one identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
    pub bio: Option<String>,
}

/// A confirmed follow as reported upstream, timestamp in the provider's time base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub timestamp: i64,
}

/// Unit of the raw timestamps a relationship provider reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
}

impl TimestampUnit {
    pub fn millis_per_unit(self) -> i64 {
        match self {
            Self::Seconds => 1000,
            Self::Milliseconds => 1,
        }
    }
}

/// How to turn a provider timestamp into Unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub unit: TimestampUnit,
    /// Unix milliseconds of the provider's time origin
    pub epoch_offset_ms: i64,
}

impl TimeBase {
    /// Seconds since 2021-01-01T00:00:00Z
    pub const FARCASTER: TimeBase = TimeBase {
        unit: TimestampUnit::Seconds,
        epoch_offset_ms: FARCASTER_EPOCH_MS,
    };
}

#[async_trait]
pub trait HandleResolver: Send + Sync {
    /// `Ok(None)` when the handle has no active binding.
    async fn resolve(&self, handle: &str) -> Result<Option<Identity>>;
}

#[async_trait]
pub trait ProfileProvider: Send + Sync {
    /// `Ok(None)` when the identity has no profile.
    async fn fetch_profile(&self, identity: Identity) -> Result<Option<Profile>>;
}

#[async_trait]
pub trait RelationshipProvider: Send + Sync {
    /// Does `source` follow `target`? `Ok(None)` means no.
    async fn probe(&self, source: Identity, target: Identity) -> Result<Option<Link>>;

    /// Time base of [`Link::timestamp`].
    fn time_base(&self) -> TimeBase;

    /// Fails unless the backend answers within `deadline`.
    async fn check_ready(&self, deadline: Duration) -> Result<()>;
}
