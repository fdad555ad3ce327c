//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to a specific sampler via mpsc
//! 2. **Events**: Chart updates broadcast to the chart surface
//! 3. **Immutability**: All events are cloneable for multi-subscriber patterns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{GroupId, Sample, storage::GroupSnapshot};

/// Update pushed from a sampler to the chart surface
///
/// Delivery is at-most-once. A surface that misses an `Append` can rebuild the group
/// from a store snapshot at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartUpdate {
    /// Full contents of a group, sent once when the group is created
    Seed { snapshot: GroupSnapshot },

    /// One new point per series of the group, keyed by series name
    Append {
        group: GroupId,
        timestamp: DateTime<Utc>,
        points: Vec<(String, f64)>,
    },
}

impl ChartUpdate {
    pub fn group(&self) -> &GroupId {
        match self {
            ChartUpdate::Seed { snapshot } => &snapshot.group,
            ChartUpdate::Append { group, .. } => group,
        }
    }

    /// Append event carrying every metric of a sample
    pub fn append(group: &GroupId, sample: &Sample) -> Self {
        ChartUpdate::Append {
            group: group.clone(),
            timestamp: sample.timestamp,
            points: sample
                .metrics
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
        }
    }
}

/// Commands that can be sent to a SamplerActor
#[derive(Debug)]
pub enum SamplerCommand {
    /// Measure immediately, outside the wait schedule
    ///
    /// The sample is appended and rendered like a scheduled one. The pending wait
    /// keeps running.
    SampleNow {
        respond_to: oneshot::Sender<anyhow::Result<Sample>>,
    },
}

/// Counters of a sampler's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Measurements attempted
    pub ticks: u64,

    /// Samples appended to the store
    pub appended: u64,

    /// Ticks dropped because the probe or the store failed
    pub skipped: u64,
}
