//! Error types for time-series store operations

use std::fmt;

use chrono::{DateTime, Utc};

use crate::GroupId;

/// Result type alias for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Reasons an append, group creation or snapshot can be rejected
///
/// A rejected append never leaves a group partially updated.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// No group with this id was created
    UnknownGroup(GroupId),

    /// A group with this id already exists
    GroupExists(GroupId),

    /// The sample lacks a metric tracked by the group
    MissingMetric { group: GroupId, metric: String },

    /// The sample carries a metric the group does not track
    UnexpectedMetric { group: GroupId, metric: String },

    /// The sample is older than the last appended point
    OutOfOrder {
        group: GroupId,
        last: DateTime<Utc>,
        sample: DateTime<Utc>,
    },

    /// A writer panicked while holding the group lock
    Poisoned(GroupId),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::UnknownGroup(group) => write!(f, "unknown metric group '{}'", group),
            StorageError::GroupExists(group) => {
                write!(f, "metric group '{}' already exists", group)
            }
            StorageError::MissingMetric { group, metric } => {
                write!(f, "sample for '{}' is missing metric '{}'", group, metric)
            }
            StorageError::UnexpectedMetric { group, metric } => {
                write!(f, "metric '{}' is not tracked by group '{}'", metric, group)
            }
            StorageError::OutOfOrder {
                group,
                last,
                sample,
            } => write!(
                f,
                "sample for '{}' at {} is older than last point at {}",
                group, sample, last
            ),
            StorageError::Poisoned(group) => {
                write!(f, "lock for metric group '{}' is poisoned", group)
            }
        }
    }
}

impl std::error::Error for StorageError {}
