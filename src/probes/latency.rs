//! Latency probe: round-trip time to a set of named targets in milliseconds

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{SENTINEL, Sample, clock::Clock};

use super::{Probe, ProbeResult, Reachability};

/// Upper bound for a single reachability check
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A named address whose response time is charted as its own series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyTarget {
    pub name: String,
    pub address: String,
}

impl LatencyTarget {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

pub struct LatencyProbe<R> {
    reachability: R,
    targets: Vec<LatencyTarget>,
    timeout: Duration,
}

impl<R: Reachability> LatencyProbe<R> {
    pub fn new(reachability: R, targets: Vec<LatencyTarget>) -> Self {
        Self::with_timeout(reachability, targets, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(reachability: R, targets: Vec<LatencyTarget>, timeout: Duration) -> Self {
        Self {
            reachability,
            targets,
            timeout,
        }
    }

    /// Response time of one address in milliseconds, `0.0` if unreachable
    pub async fn measure_latency(&self, address: &str) -> ProbeResult<f64> {
        match self.reachability.request(address, self.timeout).await {
            Ok(elapsed) if elapsed > self.timeout => {
                debug!("{address}: answered after timeout ({}ms)", elapsed.as_millis());
                Ok(SENTINEL)
            }
            Ok(elapsed) => {
                let millis = elapsed.as_nanos() as f64 / 1_000_000.0;
                trace!("{address}: {millis:.1}ms");
                Ok(millis)
            }
            Err(e) if e.is_unreachable() => {
                debug!("{address}: unreachable ({e})");
                Ok(SENTINEL)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<R: Reachability> Probe for LatencyProbe<R> {
    fn metrics(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name.clone()).collect()
    }

    async fn sample(&self, clock: &Clock) -> ProbeResult<Sample> {
        let mut metrics = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let millis = self.measure_latency(&target.address).await?;
            metrics.push((target.name.clone(), millis));
        }

        Ok(Sample::new(clock.now(), metrics))
    }
}
