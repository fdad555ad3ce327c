//! In-memory time-series storage
//!
//! Samples are appended per metric group and never rewritten, reordered or evicted.
//! The store lives for the whole process; nothing is persisted.
//!
//! ## Design
//!
//! - **Columnar**: one timestamp column per group plus one value column per metric
//! - **Append-only**: `append` pushes a single point, O(1) amortized
//! - **Snapshot reads**: renderers get owned copies and never hold a lock while drawing
//!
//! ## Usage
//!
//! ```
//! use chrono::Utc;
//! use netcheck::{GroupId, Sample, storage::TimeSeriesStore};
//!
//! let store = TimeSeriesStore::new();
//! let group = GroupId::from("speed");
//! let seed = Sample::new(Utc::now(), [("Download", 25.4), ("Upload", 3.2)]);
//!
//! store.create_group(group.clone(), ["Download", "Upload"], &seed).unwrap();
//! assert_eq!(store.snapshot(&group).unwrap().len(), 1);
//! ```

pub mod error;
pub mod series;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use series::{Column, GroupSeries, GroupSnapshot};
pub use store::TimeSeriesStore;
