//! SamplerActor - Drives the measurements of one metric group
//!
//! Each group gets its own sampler running on its own timeline. A sampler is the only
//! writer of its group in the store.
//!
//! ## Message Flow
//!
//! ```text
//! stop? → wait (policy + jitter) → Probe → TimeSeriesStore::append → RenderBridge
//!                ↑
//!                └─── Commands (SampleNow), stop signal
//! ```
//!
//! Suspension only happens in the wait step and inside the probe (cooldown, network
//! timeouts). The stop flag is checked at the top of every iteration.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    GroupId, Sample,
    clock::Clock,
    config::{WaitPolicy, random_wait},
    probes::Probe,
    render::RenderBridge,
    storage::TimeSeriesStore,
};

use super::messages::{SamplerCommand, SamplerStats};

/// Scheduling parameters of a sampler
#[derive(Debug, Clone, Default)]
pub struct SamplerSettings {
    pub wait: WaitPolicy,

    /// Extra uniform wait in `[0, jitter_max_minutes]` on top of the policy
    pub jitter_max_minutes: Option<f64>,

    /// Stop after this many ticks (unbounded if `None`)
    pub max_ticks: Option<u64>,

    /// Seed for the wait randomization (entropy if `None`)
    pub rng_seed: Option<u64>,
}

/// Actor that samples a single metric group
pub struct SamplerActor {
    group: GroupId,
    probe: Box<dyn Probe>,
    store: TimeSeriesStore,
    bridge: RenderBridge,
    clock: Clock,
    settings: SamplerSettings,
    rng: StdRng,

    /// Cooperative stop flag
    stop_rx: watch::Receiver<bool>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SamplerCommand>,

    /// Live counters, readable from the handle
    stats_tx: watch::Sender<SamplerStats>,
    stats: SamplerStats,
}

impl SamplerActor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        group: GroupId,
        probe: Box<dyn Probe>,
        store: TimeSeriesStore,
        bridge: RenderBridge,
        clock: Clock,
        settings: SamplerSettings,
        stop_rx: watch::Receiver<bool>,
        command_rx: mpsc::Receiver<SamplerCommand>,
        stats_tx: watch::Sender<SamplerStats>,
    ) -> Self {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            group,
            probe,
            store,
            bridge,
            clock,
            settings,
            rng,
            stop_rx,
            command_rx,
            stats_tx,
            stats: SamplerStats::default(),
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until the stop flag is raised or `max_ticks` ticks have been taken.
    #[instrument(skip(self), fields(group = %self.group))]
    pub async fn run(mut self) -> SamplerStats {
        debug!("starting sampler actor");

        loop {
            if *self.stop_rx.borrow() {
                debug!("stop requested");
                break;
            }

            if self
                .settings
                .max_ticks
                .is_some_and(|max| self.stats.ticks >= max)
            {
                debug!("reached {} ticks", self.stats.ticks);
                break;
            }

            let wait = self.next_wait();
            info!("Next sample in {} seconds", wait.as_secs());

            if !self.wait(wait).await {
                debug!("stop requested while waiting");
                break;
            }

            let _ = self.tick().await;
        }

        debug!("sampler actor stopped: {:?}", self.stats);
        self.stats
    }

    fn next_wait(&mut self) -> Duration {
        let mut wait = self.settings.wait.next_wait(&mut self.rng);

        if let Some(jitter) = self.settings.jitter_max_minutes
            && jitter > 0.0
        {
            wait = wait.saturating_add(random_wait(&mut self.rng, jitter));
        }

        wait
    }

    /// Sleep for `duration` while serving commands; `false` if stopped meanwhile
    async fn wait(&mut self, duration: Duration) -> bool {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,

                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        return false;
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SamplerCommand::SampleNow { respond_to } => {
                            debug!("received SampleNow command");
                            let result = self.tick().await;
                            let _ = respond_to.send(result);
                        }
                    }
                }
            }
        }
    }

    /// Measure, append and render one sample
    ///
    /// Failures are logged and the tick is skipped; they never end the loop.
    async fn tick(&mut self) -> Result<Sample> {
        self.stats.ticks += 1;

        let result = self.measure().await;
        match &result {
            Ok(_) => self.stats.appended += 1,
            Err(e) => {
                error!("tick {} skipped: {:#}", self.stats.ticks, e);
                self.stats.skipped += 1;
            }
        }

        self.stats_tx.send_replace(self.stats);
        result
    }

    async fn measure(&self) -> Result<Sample> {
        let sample = self
            .probe
            .sample(&self.clock)
            .await
            .context("measurement failed")?;

        self.store
            .append(&self.group, &sample)
            .context("failed to append sample")?;

        self.bridge.push_append(&self.group, &sample);

        info!("{}", describe(&sample));
        Ok(sample)
    }
}

/// One-line summary of a sample's values
pub fn describe(sample: &Sample) -> String {
    sample
        .metrics
        .iter()
        .map(|(name, value)| format!("{name} = {value:.1}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Handle for controlling a SamplerActor
pub struct SamplerHandle {
    sender: mpsc::Sender<SamplerCommand>,
    stop_tx: watch::Sender<bool>,
    stats_rx: watch::Receiver<SamplerStats>,
    task: JoinHandle<SamplerStats>,
    group: GroupId,
}

impl SamplerHandle {
    /// Spawn a new sampler actor
    ///
    /// The group must already exist in the store.
    pub fn spawn(
        group: GroupId,
        probe: Box<dyn Probe>,
        store: TimeSeriesStore,
        bridge: RenderBridge,
        clock: Clock,
        settings: SamplerSettings,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (stats_tx, stats_rx) = watch::channel(SamplerStats::default());

        let actor = SamplerActor::new(
            group.clone(),
            probe,
            store,
            bridge,
            clock,
            settings,
            stop_rx,
            cmd_rx,
            stats_tx,
        );

        let task = tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            stop_tx,
            stats_rx,
            task,
            group,
        }
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// Measure immediately and return the appended sample
    pub async fn sample_now(&self) -> Result<Sample> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SamplerCommand::SampleNow { respond_to: tx })
            .await
            .context("failed to send SampleNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Current counters
    pub fn stats(&self) -> SamplerStats {
        *self.stats_rx.borrow()
    }

    /// Raise the stop flag; the actor exits at its next check
    pub fn stop(&self) {
        if self.stop_tx.send(true).is_err() {
            warn!("sampler for '{}' already stopped", self.group);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the actor to finish on its own
    pub async fn join(self) -> Result<SamplerStats> {
        self.task
            .await
            .with_context(|| format!("sampler for '{}' panicked", self.group))
    }

    /// Stop the actor and wait for it to finish
    pub async fn shutdown(self) -> Result<SamplerStats> {
        self.stop();
        self.join().await
    }
}
