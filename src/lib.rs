pub mod actors;
pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod probes;
pub mod render;
pub mod storage;
pub mod util;
pub mod viewer;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value recorded for a metric whose measurement failed in a recoverable way.
pub const SENTINEL: f64 = 0.0;

/// Identifier of a metric group (e.g. "speed" or "ping")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One timestamped measurement across all metrics of a group
///
/// Samples are produced exactly once per scheduler tick and never change afterwards.
/// A failed measurement still yields a sample, carrying [`SENTINEL`] for the affected metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, f64>,
}

impl Sample {
    pub fn new<I, K>(timestamp: DateTime<Utc>, metrics: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            timestamp,
            metrics: metrics.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Sample with every named metric set to the sentinel value
    pub fn sentinel<I, K>(timestamp: DateTime<Utc>, names: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::new(timestamp, names.into_iter().map(|name| (name, SENTINEL)))
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}
