//! Throughput probe: download and upload speed in MB/s

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::{SENTINEL, Sample, clock::Clock};

use super::{Probe, ProbeError, ProbeResult, SpeedService};

pub const DOWNLOAD: &str = "Download";
pub const UPLOAD: &str = "Upload";

/// Pause imposed after a failed server discovery before the probe returns
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct ThroughputProbe<S> {
    service: S,
    cooldown: Duration,
}

impl<S: SpeedService> ThroughputProbe<S> {
    pub fn new(service: S) -> Self {
        Self::with_cooldown(service, DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(service: S, cooldown: Duration) -> Self {
        Self { service, cooldown }
    }

    /// Measure `(download, upload)` in MB/s
    ///
    /// Discovery failures yield `(0.0, 0.0)` after sleeping for the cooldown, which
    /// delays the caller's next tick. Other failures are returned as errors.
    #[instrument(skip(self))]
    pub async fn measure_throughput(&self) -> ProbeResult<(f64, f64)> {
        match self.run().await {
            Ok((download, upload)) => Ok((download / BYTES_PER_MB, upload / BYTES_PER_MB)),
            Err(e) if e.is_server_discovery() => {
                warn!(
                    "speed test failed ({e}), retrying in {}s",
                    self.cooldown.as_secs()
                );
                tokio::time::sleep(self.cooldown).await;
                Ok((SENTINEL, SENTINEL))
            }
            Err(e) => Err(e),
        }
    }

    async fn run(&self) -> ProbeResult<(f64, f64)> {
        let server = self.service.discover().await?;
        debug!(
            "selected speed test server {} ({}ms)",
            server.url,
            server.latency.as_millis()
        );

        let download = checked_rate("download", self.service.download(&server).await?)?;
        let upload = checked_rate("upload", self.service.upload(&server).await?)?;

        Ok((download, upload))
    }
}

fn checked_rate(direction: &str, bytes_per_sec: f64) -> ProbeResult<f64> {
    if bytes_per_sec.is_finite() && bytes_per_sec >= 0.0 {
        Ok(bytes_per_sec)
    } else {
        Err(ProbeError::Unexpected(anyhow::anyhow!(
            "invalid {direction} rate reported: {bytes_per_sec}"
        )))
    }
}

#[async_trait]
impl<S: SpeedService> Probe for ThroughputProbe<S> {
    fn metrics(&self) -> Vec<String> {
        vec![DOWNLOAD.to_string(), UPLOAD.to_string()]
    }

    async fn sample(&self, clock: &Clock) -> ProbeResult<Sample> {
        let (download, upload) = self.measure_throughput().await?;
        Ok(Sample::new(clock.now(), [(DOWNLOAD, download), (UPLOAD, upload)]))
    }
}
