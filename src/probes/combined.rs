//! Several probes measured in one tick and merged into a single sample

use async_trait::async_trait;

use crate::{Sample, clock::Clock};

use super::{Probe, ProbeResult};

/// Runs its probes in order and stamps the merged sample once all have finished
///
/// Metric names must be unique across the inner probes.
pub struct CombinedProbe {
    probes: Vec<Box<dyn Probe>>,
}

impl CombinedProbe {
    pub fn new(probes: Vec<Box<dyn Probe>>) -> Self {
        Self { probes }
    }
}

#[async_trait]
impl Probe for CombinedProbe {
    fn metrics(&self) -> Vec<String> {
        self.probes.iter().flat_map(|p| p.metrics()).collect()
    }

    async fn sample(&self, clock: &Clock) -> ProbeResult<Sample> {
        let mut metrics = Vec::new();
        for probe in &self.probes {
            let sample = probe.sample(clock).await?;
            metrics.extend(sample.metrics);
        }

        Ok(Sample::new(clock.now(), metrics))
    }
}
