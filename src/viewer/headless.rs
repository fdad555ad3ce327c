//! Log-only chart surface for terminals without a dashboard

use std::future::Future;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{actors::messages::ChartUpdate, storage::TimeSeriesStore};

use super::state::{StreamStatus, ViewState, summarize};

/// Follow the update stream and log every update until `shutdown` resolves
pub async fn run_headless(
    mut state: ViewState,
    mut updates: broadcast::Receiver<ChartUpdate>,
    store: TimeSeriesStore,
    shutdown: impl Future<Output = ()>,
) -> ViewState {
    tokio::pin!(shutdown);

    info!("{}", state.title);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("headless surface shutting down");
                break;
            }

            received = updates.recv() => {
                if let Ok(update) = &received {
                    info!("{}", summarize(update));
                }

                if state.receive(received) == StreamStatus::Closed {
                    debug!("update stream closed");
                    break;
                }
                state.resync_stale(&store);
            }
        }
    }

    state
}
