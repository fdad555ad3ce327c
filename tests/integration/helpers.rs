//! Helper fakes for integration tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use netcheck::{
    GroupId,
    bootstrap::ProbeFactory,
    config::{Config, GroupConfig, LatencyConfig, ProbeConfig, ThroughputConfig, WaitPolicy},
    probes::{
        LatencyTarget, Probe, ProbeError, ProbeResult, Reachability, SpeedServer, SpeedService,
    },
};

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Speed service replaying one scripted outcome per discovery, rates in MB/s
#[derive(Default)]
pub struct ScriptedSpeedService {
    script: Mutex<VecDeque<ProbeResult<(f64, f64)>>>,
    current: Mutex<(f64, f64)>,
}

impl ScriptedSpeedService {
    pub fn new(script: Vec<ProbeResult<(f64, f64)>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            current: Mutex::new((0.0, 0.0)),
        }
    }
}

#[async_trait]
impl SpeedService for ScriptedSpeedService {
    async fn discover(&self) -> ProbeResult<SpeedServer> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProbeError::Unexpected(anyhow!("script exhausted"))));

        let rates = next?;
        *self.current.lock().unwrap() = rates;

        Ok(SpeedServer {
            url: "http://speed.test".to_string(),
            latency: Duration::from_millis(5),
        })
    }

    async fn download(&self, _server: &SpeedServer) -> ProbeResult<f64> {
        Ok(self.current.lock().unwrap().0 * BYTES_PER_MB)
    }

    async fn upload(&self, _server: &SpeedServer) -> ProbeResult<f64> {
        Ok(self.current.lock().unwrap().1 * BYTES_PER_MB)
    }
}

/// Outcome of a reachability check against one fake address
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Answers(Duration),
    Refused,
    TimesOut,
}

/// Reachability check answering from a fixed table
pub struct TableReachability {
    table: HashMap<String, Outcome>,
}

impl TableReachability {
    pub fn new(entries: &[(&str, Outcome)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(address, outcome)| (address.to_string(), *outcome))
                .collect(),
        }
    }
}

#[async_trait]
impl Reachability for TableReachability {
    async fn request(&self, address: &str, _timeout: Duration) -> ProbeResult<Duration> {
        match self.table.get(address) {
            Some(Outcome::Answers(elapsed)) => Ok(*elapsed),
            Some(Outcome::Refused) => Err(ProbeError::Connection(format!("{address}: refused"))),
            Some(Outcome::TimesOut) => Err(ProbeError::Timeout(format!("{address}: timed out"))),
            None => Err(ProbeError::Unexpected(anyhow!("unknown address {address}"))),
        }
    }
}

/// Factory handing out prepared probes in group order
pub struct QueuedFactory {
    probes: Mutex<VecDeque<Box<dyn Probe>>>,
}

impl QueuedFactory {
    pub fn new(probes: Vec<Box<dyn Probe>>) -> Self {
        Self {
            probes: Mutex::new(probes.into()),
        }
    }
}

impl ProbeFactory for QueuedFactory {
    fn build(&self, _config: &ProbeConfig) -> anyhow::Result<Box<dyn Probe>> {
        self.probes
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no probe prepared"))
    }
}

pub fn speed_group(id: &str, minutes: f64) -> GroupConfig {
    GroupConfig {
        id: GroupId::from(id),
        probe: ProbeConfig::Throughput(ThroughputConfig::default()),
        wait: WaitPolicy::Fixed { minutes },
        jitter_max_minutes: None,
        charts: Vec::new(),
    }
}

pub fn ping_group(id: &str, minutes: f64) -> GroupConfig {
    GroupConfig {
        id: GroupId::from(id),
        probe: ProbeConfig::Latency(LatencyConfig {
            targets: legacy_targets(),
            timeout_ms: 1000,
        }),
        wait: WaitPolicy::Fixed { minutes },
        jitter_max_minutes: None,
        charts: Vec::new(),
    }
}

pub fn legacy_targets() -> Vec<LatencyTarget> {
    vec![
        LatencyTarget::new("Home", "192.168.0.1"),
        LatencyTarget::new("Google", "google.com"),
    ]
}

pub fn config_with(groups: Vec<GroupConfig>) -> Config {
    Config {
        title: "Internet Check".to_string(),
        groups,
    }
}
