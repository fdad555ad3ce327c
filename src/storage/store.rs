//! Shared time-series store holding every metric group
//!
//! Each group sits behind its own lock: its sampler is the only writer, while the
//! chart surface takes snapshots concurrently. Groups never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::{GroupId, Sample};

use super::error::{StorageError, StorageResult};
use super::series::{GroupSeries, GroupSnapshot};

/// Append-only in-memory store, cheap to clone and share across tasks
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    groups: Arc<RwLock<HashMap<GroupId, Arc<RwLock<GroupSeries>>>>>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group and append its seed sample
    ///
    /// Groups are created exactly once; the seed must carry every listed metric.
    pub fn create_group<I, K>(&self, group: GroupId, metrics: I, seed: &Sample) -> StorageResult<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut series = GroupSeries::new(group.clone(), metrics);
        series.append(seed)?;

        let mut groups = self
            .groups
            .write()
            .map_err(|_| StorageError::Poisoned(group.clone()))?;

        if groups.contains_key(&group) {
            return Err(StorageError::GroupExists(group));
        }

        debug!("created metric group '{group}' with seed at {}", seed.timestamp);
        groups.insert(group, Arc::new(RwLock::new(series)));

        Ok(())
    }

    fn group(&self, group: &GroupId) -> StorageResult<Arc<RwLock<GroupSeries>>> {
        let groups = self
            .groups
            .read()
            .map_err(|_| StorageError::Poisoned(group.clone()))?;

        groups
            .get(group)
            .cloned()
            .ok_or_else(|| StorageError::UnknownGroup(group.clone()))
    }

    /// Append one sample to a group, growing every series by exactly one point
    pub fn append(&self, group: &GroupId, sample: &Sample) -> StorageResult<()> {
        let series = self.group(group)?;
        let mut series = series
            .write()
            .map_err(|_| StorageError::Poisoned(group.clone()))?;

        series.append(sample)?;
        trace!("appended sample to '{group}' (len {})", series.len());

        Ok(())
    }

    /// Owned copy of a group's series
    pub fn snapshot(&self, group: &GroupId) -> StorageResult<GroupSnapshot> {
        let series = self.group(group)?;
        let series = series
            .read()
            .map_err(|_| StorageError::Poisoned(group.clone()))?;

        Ok(series.snapshot())
    }

    /// Number of points in a group
    pub fn len(&self, group: &GroupId) -> StorageResult<usize> {
        let series = self.group(group)?;
        let series = series
            .read()
            .map_err(|_| StorageError::Poisoned(group.clone()))?;

        Ok(series.len())
    }

    /// Ids of all registered groups, sorted
    pub fn groups(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = match self.groups.read() {
            Ok(groups) => groups.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }
}
