//! Forwards store appends to the chart surface
//!
//! Publishing is fire-and-forget: a broadcast send never waits for the surface, so a
//! slow or missing surface can never stall a sampler.

use tokio::sync::broadcast;
use tracing::trace;

use crate::{GroupId, Sample, actors::messages::ChartUpdate, storage::GroupSnapshot};

/// Capacity of the update channel; a surface lagging further behind resyncs from the store
pub const UPDATE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct RenderBridge {
    tx: broadcast::Sender<ChartUpdate>,
}

impl RenderBridge {
    pub fn new(tx: broadcast::Sender<ChartUpdate>) -> Self {
        Self { tx }
    }

    /// Create a bridge together with its update channel
    pub fn channel() -> (Self, broadcast::Receiver<ChartUpdate>) {
        let (tx, rx) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChartUpdate> {
        self.tx.subscribe()
    }

    /// A handle that can subscribe without keeping the channel open
    pub fn downgrade(&self) -> WeakRenderBridge {
        WeakRenderBridge {
            tx: self.tx.downgrade(),
        }
    }

    /// Push the full seed contents of a group
    pub fn push_seed(&self, snapshot: &GroupSnapshot) {
        self.publish(ChartUpdate::Seed {
            snapshot: snapshot.clone(),
        });
    }

    /// Push the single new point per series of an appended sample
    pub fn push_append(&self, group: &GroupId, sample: &Sample) {
        self.publish(ChartUpdate::append(group, sample));
    }

    fn publish(&self, update: ChartUpdate) {
        let group = update.group().clone();

        // Ignoring send errors: no subscribed surface just means nobody is drawing.
        match self.tx.send(update) {
            Ok(num_receivers) => {
                trace!("published chart update for '{group}' to {num_receivers} receivers");
            }
            Err(_) => {
                trace!("no chart surface subscribed, dropped update for '{group}'");
            }
        }
    }
}

/// Bridge reference that does not count as a publisher
///
/// The update stream closes once every [`RenderBridge`] is dropped, even while weak
/// handles remain.
#[derive(Clone)]
pub struct WeakRenderBridge {
    tx: broadcast::WeakSender<ChartUpdate>,
}

impl WeakRenderBridge {
    /// `None` once every publisher is gone
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ChartUpdate>> {
        self.tx.upgrade().map(|tx| tx.subscribe())
    }
}
