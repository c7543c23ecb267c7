//! Model availability cache
//!
//! Remembers whether the target model was last seen loaded in the daemon.
//! Only positive results are ever trusted, and only for [`AVAILABILITY_TTL`].
//! The cache is an owned value; the service keeps one behind an `Arc` and
//! tests build their own.

use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// How long a positive availability check is trusted without re-verification
pub const AVAILABILITY_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvailabilityStatus {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AvailabilityRecord {
    pub status: AvailabilityStatus,
    pub last_checked_at: Option<Instant>,
}

impl AvailabilityRecord {
    /// Status as seen at `now`: anything older than `ttl` reads as `Unknown`.
    pub fn effective_status(&self, now: Instant, ttl: Duration) -> AvailabilityStatus {
        match self.last_checked_at {
            Some(checked) if now.saturating_duration_since(checked) < ttl => self.status,
            _ => AvailabilityStatus::Unknown,
        }
    }
}

#[derive(Debug)]
pub struct AvailabilityCache {
    record: RwLock<AvailabilityRecord>,
    ttl: Duration,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::with_ttl(AVAILABILITY_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            record: RwLock::new(AvailabilityRecord::default()),
            ttl,
        }
    }

    pub async fn read(&self) -> AvailabilityRecord {
        *self.record.read().await
    }

    pub async fn write(&self, status: AvailabilityStatus, checked_at: Instant) {
        let mut record = self.record.write().await;
        *record = AvailabilityRecord {
            status,
            last_checked_at: Some(checked_at),
        };
    }

    /// Forget everything, bypassing the TTL
    pub async fn invalidate(&self) {
        *self.record.write().await = AvailabilityRecord::default();
    }

    /// True only for a positive result younger than the TTL
    pub async fn is_fresh(&self, now: Instant) -> bool {
        self.read().await.effective_status(now, self.ttl) == AvailabilityStatus::Available
    }
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new()
    }
}
