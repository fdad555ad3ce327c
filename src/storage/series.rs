//! Columnar, append-only series for one metric group
//!
//! All metrics of a group share one timestamp column, so every series in the group
//! has the same length and the same timestamp at every index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GroupId, Sample};

use super::error::{StorageError, StorageResult};

/// Live storage for a metric group, mutated only by appending
#[derive(Debug)]
pub struct GroupSeries {
    group: GroupId,
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

/// Values of one metric, index-aligned with the group's timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl GroupSeries {
    /// Create an empty group tracking the given metrics (order is preserved)
    pub fn new<I, K>(group: GroupId, metrics: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let columns = metrics
            .into_iter()
            .map(|name| Column {
                name: name.into(),
                values: Vec::new(),
            })
            .collect();

        Self {
            group,
            timestamps: Vec::new(),
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Append one point to every series of the group
    ///
    /// The sample is validated completely before anything is pushed.
    pub fn append(&mut self, sample: &Sample) -> StorageResult<()> {
        if let Some(last) = self.timestamps.last()
            && sample.timestamp < *last
        {
            return Err(StorageError::OutOfOrder {
                group: self.group.clone(),
                last: *last,
                sample: sample.timestamp,
            });
        }

        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match sample.get(&column.name) {
                Some(value) => values.push(value),
                None => {
                    return Err(StorageError::MissingMetric {
                        group: self.group.clone(),
                        metric: column.name.clone(),
                    });
                }
            }
        }

        if let Some(extra) = sample
            .metrics
            .keys()
            .find(|name| !self.columns.iter().any(|c| &c.name == *name))
        {
            return Err(StorageError::UnexpectedMetric {
                group: self.group.clone(),
                metric: extra.clone(),
            });
        }

        self.timestamps.push(sample.timestamp);
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.values.push(value);
        }

        Ok(())
    }

    /// Owned copy of the current contents
    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            group: self.group.clone(),
            timestamps: self.timestamps.clone(),
            columns: self.columns.clone(),
        }
    }
}

/// Read-only copy of a group, safe to hand to a renderer while appends continue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub group: GroupId,
    pub timestamps: Vec<DateTime<Utc>>,
    pub columns: Vec<Column>,
}

impl GroupSnapshot {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, metric: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == metric)
    }

    /// Ordered `(timestamp, value)` pairs for one metric
    pub fn series(&self, metric: &str) -> Option<Vec<(DateTime<Utc>, f64)>> {
        self.column(metric).map(|column| {
            self.timestamps
                .iter()
                .copied()
                .zip(column.values.iter().copied())
                .collect()
        })
    }

    /// The most recent sample of the group
    pub fn latest(&self) -> Option<Sample> {
        let idx = self.timestamps.len().checked_sub(1)?;
        Some(Sample::new(
            self.timestamps[idx],
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values[idx])),
        ))
    }
}
