//! Wall clock anchored to the tokio monotonic clock
//!
//! Sample timestamps are derived from a single anchor taken at startup, so they can
//! never run backwards when the system clock is adjusted, and they follow tokio's
//! paused clock in tests. When the wall clock pulls ahead by more than
//! [`CATCH_UP_THRESHOLD`], as after a suspend, the clock jumps forward to it.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// How far the wall clock may run ahead before the clock catches up with it
///
/// The monotonic clock stops while the machine is suspended, the wall clock does not.
pub const CATCH_UP_THRESHOLD: TimeDelta = TimeDelta::seconds(30);

#[derive(Debug, Clone)]
pub struct Clock {
    wall_anchor: DateTime<Utc>,
    mono_anchor: Instant,
    /// Forward corrections taken so far, in milliseconds; only ever grows
    skew_ms: Arc<AtomicI64>,
}

impl Clock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Create a clock whose "now" starts at the given wall time
    pub fn anchored_at(wall_anchor: DateTime<Utc>) -> Self {
        Self {
            wall_anchor,
            mono_anchor: Instant::now(),
            skew_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Current time, never earlier than a previous call on this clock or its clones
    pub fn now(&self) -> DateTime<Utc> {
        let skew = self.skew_ms.load(Ordering::Acquire);
        let estimate = self.estimate(skew);

        let behind = Utc::now() - estimate;
        if behind <= CATCH_UP_THRESHOLD {
            return estimate;
        }

        let target = skew.saturating_add(behind.num_milliseconds());
        let skew = self.skew_ms.fetch_max(target, Ordering::AcqRel).max(target);
        self.estimate(skew)
    }

    fn estimate(&self, skew_ms: i64) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.mono_anchor);
        let delta = TimeDelta::from_std(elapsed)
            .unwrap_or(TimeDelta::MAX)
            .checked_add(&TimeDelta::milliseconds(skew_ms))
            .unwrap_or(TimeDelta::MAX);
        self.wall_anchor
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
