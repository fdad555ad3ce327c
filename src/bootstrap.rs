//! Composition root
//!
//! Builds the store, the render bridge and one sampler per configured group. Every
//! group is seeded with one synchronous measurement before its sampler starts, so the
//! chart never starts empty.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    GroupId, Sample,
    actors::{
        messages::{ChartUpdate, SamplerStats},
        sampler::{SamplerHandle, SamplerSettings, describe},
    },
    clock::Clock,
    config::{Config, LatencyConfig, ProbeConfig, ThroughputConfig},
    probes::{
        CombinedProbe, LatencyProbe, Probe, ThroughputProbe,
        http::{HttpReachability, HttpSpeedService},
    },
    render::{ChartRegion, RenderBridge, WeakRenderBridge},
    storage::TimeSeriesStore,
};

/// Builds the probe of a group from its configuration
pub trait ProbeFactory {
    fn build(&self, config: &ProbeConfig) -> Result<Box<dyn Probe>>;
}

/// Probes backed by real HTTP speed test servers and reachability checks
pub struct HttpProbeFactory;

impl HttpProbeFactory {
    fn throughput(config: &ThroughputConfig) -> Result<Box<dyn Probe>> {
        let service = HttpSpeedService::new(
            config.servers.clone(),
            config.download_bytes,
            config.upload_bytes,
        )?;

        Ok(Box::new(ThroughputProbe::with_cooldown(
            service,
            Duration::from_secs(config.cooldown_secs),
        )))
    }

    fn latency(config: &LatencyConfig) -> Result<Box<dyn Probe>> {
        Ok(Box::new(LatencyProbe::with_timeout(
            HttpReachability::new()?,
            config.targets.clone(),
            Duration::from_millis(config.timeout_ms),
        )))
    }
}

impl ProbeFactory for HttpProbeFactory {
    fn build(&self, config: &ProbeConfig) -> Result<Box<dyn Probe>> {
        match config {
            ProbeConfig::Throughput(throughput) => Self::throughput(throughput),
            ProbeConfig::Latency(latency) => Self::latency(latency),
            ProbeConfig::Combined {
                throughput,
                latency,
            } => Ok(Box::new(CombinedProbe::new(vec![
                Self::throughput(throughput)?,
                Self::latency(latency)?,
            ]))),
        }
    }
}

/// Knobs for bounded runs
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Stop every sampler after this many ticks
    pub max_ticks: Option<u64>,

    /// Seed for the wait randomization of every sampler
    pub rng_seed: Option<u64>,
}

/// The running system: store, chart regions and one sampler per group
pub struct Monitor {
    title: String,
    store: TimeSeriesStore,
    bridge: WeakRenderBridge,
    updates: Option<broadcast::Receiver<ChartUpdate>>,
    regions: Vec<ChartRegion>,
    samplers: Vec<SamplerHandle>,
}

impl Monitor {
    pub async fn start(
        config: &Config,
        factory: &dyn ProbeFactory,
        options: StartOptions,
    ) -> Result<Self> {
        config.validate()?;

        info!("Starting Test");

        let clock = Clock::new();
        let store = TimeSeriesStore::new();
        // The first receiver buffers the seeds until the chart surface takes it
        let (bridge, updates) = RenderBridge::channel();

        let probes = config
            .groups
            .iter()
            .map(|group| {
                factory
                    .build(&group.probe)
                    .with_context(|| format!("failed to build probe for '{}'", group.id))
            })
            .collect::<Result<Vec<_>>>()?;

        let seeds = join_all(probes.iter().map(|probe| probe.sample(&clock))).await;

        let mut regions = Vec::new();
        let mut samplers = Vec::new();

        for ((group, probe), seed) in config.groups.iter().zip(probes).zip(seeds) {
            let metrics = probe.metrics();
            let seed = match seed {
                Ok(seed) => seed,
                Err(e) => {
                    error!("seed measurement for '{}' failed: {e}, starting from zero", group.id);
                    Sample::sentinel(clock.now(), metrics.iter().cloned())
                }
            };

            info!("Start values for '{}': {}", group.id, describe(&seed));

            store
                .create_group(group.id.clone(), metrics, &seed)
                .with_context(|| format!("failed to create group '{}'", group.id))?;
            bridge.push_seed(&store.snapshot(&group.id)?);

            regions.extend(group.charts().into_iter().map(|spec| ChartRegion {
                group: group.id.clone(),
                spec,
            }));

            let settings = SamplerSettings {
                wait: group.wait.clone(),
                jitter_max_minutes: group.jitter_max_minutes,
                max_ticks: options.max_ticks,
                rng_seed: options.rng_seed,
            };

            samplers.push(SamplerHandle::spawn(
                group.id.clone(),
                probe,
                store.clone(),
                bridge.clone(),
                clock.clone(),
                settings,
            ));
        }

        info!("Waiting for samples");

        Ok(Self {
            title: config.title.clone(),
            store,
            bridge: bridge.downgrade(),
            updates: Some(updates),
            regions,
            samplers,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn regions(&self) -> &[ChartRegion] {
        &self.regions
    }

    /// The update stream, starting with every group's seed
    ///
    /// Only the first call gets the seeds; later calls subscribe from now on. Only the
    /// samplers publish, so the stream closes once every sampler has exited.
    pub fn updates(&mut self) -> broadcast::Receiver<ChartUpdate> {
        self.updates
            .take()
            .or_else(|| self.bridge.subscribe())
            .unwrap_or_else(|| broadcast::channel(1).1)
    }

    pub fn samplers(&self) -> &[SamplerHandle] {
        &self.samplers
    }

    /// Whether every sampler has exited (only happens for bounded runs)
    pub fn is_finished(&self) -> bool {
        self.samplers.iter().all(SamplerHandle::is_finished)
    }

    /// Wait for every sampler to finish on its own
    pub async fn join(self) -> Result<Vec<(GroupId, SamplerStats)>> {
        let mut stats = Vec::with_capacity(self.samplers.len());
        for sampler in self.samplers {
            let group = sampler.group().clone();
            stats.push((group, sampler.join().await?));
        }
        Ok(stats)
    }

    /// Stop every sampler and wait for them
    pub async fn shutdown(self) -> Result<Vec<(GroupId, SamplerStats)>> {
        for sampler in &self.samplers {
            sampler.stop();
        }
        self.join().await
    }
}
