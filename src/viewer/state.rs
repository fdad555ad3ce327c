//! State shared by the chart surfaces

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use crate::{
    actors::{messages::ChartUpdate, sampler::describe},
    render::{ChartModel, ChartRegion},
    storage::TimeSeriesStore,
};

/// What a surface should do after draining the update stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Nothing more to read right now
    Idle,
    /// Every sender is gone
    Closed,
}

pub struct ViewState {
    pub title: String,
    pub model: ChartModel,
    pub paused: bool,
    /// Number of times the surface fell behind the update stream
    pub lag_events: u64,
    pub error_message: Option<String>,
}

impl ViewState {
    pub fn new(title: impl Into<String>, regions: Vec<ChartRegion>) -> Self {
        Self {
            title: title.into(),
            model: ChartModel::new(regions),
            paused: false,
            lag_events: 0,
            error_message: None,
        }
    }

    /// Apply an update, or remember that the replica is behind while paused
    pub fn apply(&mut self, update: &ChartUpdate) {
        if self.paused {
            self.model.mark_all_stale();
            return;
        }
        self.model.apply(update);
    }

    pub fn lagged(&mut self, skipped: u64) {
        warn!("chart fell behind by {skipped} updates, resyncing from the store");
        self.lag_events += 1;
        self.model.mark_all_stale();
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Rebuild every stale group from a fresh store snapshot
    pub fn resync_stale(&mut self, store: &TimeSeriesStore) {
        if self.paused {
            return;
        }

        for group in self.model.stale_groups() {
            match store.snapshot(&group) {
                Ok(snapshot) => {
                    self.model.resync(&snapshot);
                    self.error_message = None;
                }
                Err(e) => {
                    warn!("failed to resync '{group}': {e}");
                    self.error_message = Some(e.to_string());
                }
            }
        }
    }

    /// Force a resync of every group
    pub fn reload(&mut self, store: &TimeSeriesStore) {
        self.model.mark_all_stale();
        self.resync_stale(store);
    }

    /// Handle one result of a blocking receive
    pub fn receive(&mut self, received: Result<ChartUpdate, RecvError>) -> StreamStatus {
        match received {
            Ok(update) => {
                debug!("{}", summarize(&update));
                self.apply(&update);
                StreamStatus::Idle
            }
            Err(RecvError::Lagged(skipped)) => {
                self.lagged(skipped);
                StreamStatus::Idle
            }
            Err(RecvError::Closed) => StreamStatus::Closed,
        }
    }

    /// Drain everything currently buffered without waiting
    pub fn drain(
        &mut self,
        updates: &mut tokio::sync::broadcast::Receiver<ChartUpdate>,
    ) -> StreamStatus {
        loop {
            match updates.try_recv() {
                Ok(update) => self.apply(&update),
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty) => return StreamStatus::Idle,
                Err(TryRecvError::Closed) => return StreamStatus::Closed,
            }
        }
    }
}

/// One-line description of an update for logs
pub fn summarize(update: &ChartUpdate) -> String {
    match update {
        ChartUpdate::Seed { snapshot } => {
            let latest = snapshot
                .latest()
                .map(|sample| describe(&sample))
                .unwrap_or_default();
            format!("{}: {} points, latest {}", snapshot.group, snapshot.len(), latest)
        }
        ChartUpdate::Append { group, points, .. } => {
            let values = points
                .iter()
                .map(|(name, value)| format!("{name} = {value:.1}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{group}: {values}")
        }
    }
}
