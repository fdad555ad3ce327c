//! Probe adapters around the external measurement services
//!
//! The services themselves (speed test servers, reachability targets) sit behind the
//! [`SpeedService`] and [`Reachability`] traits. The adapters normalize their results
//! into [`Sample`]s and absorb recoverable failures into sentinel values.
//!
//! ## Failure policy
//!
//! | Failure | Result |
//! |---|---|
//! | configuration retrieval / server selection | `0.0` for both speeds, after a cooldown |
//! | connection refused / timeout on a ping | `0.0` for that target |
//! | anything else | error propagated, tick skipped by the scheduler |

pub mod combined;
pub mod error;
pub mod http;
pub mod latency;
pub mod throughput;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Sample, clock::Clock};

pub use combined::CombinedProbe;
pub use error::{ProbeError, ProbeResult};
pub use latency::{LatencyProbe, LatencyTarget};
pub use throughput::ThroughputProbe;

/// A measurement producing one sample per invocation
#[async_trait]
pub trait Probe: Send + Sync {
    /// Names of the metrics every sample of this probe carries
    fn metrics(&self) -> Vec<String>;

    /// Run the measurement and timestamp the result once it completes
    async fn sample(&self, clock: &Clock) -> ProbeResult<Sample>;
}

/// Server chosen by a speed service's discovery step
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedServer {
    pub url: String,
    pub latency: Duration,
}

/// External throughput measurement service
#[async_trait]
pub trait SpeedService: Send + Sync {
    /// Retrieve configuration and pick the best server
    async fn discover(&self) -> ProbeResult<SpeedServer>;

    /// Measured download rate in bytes per second
    async fn download(&self, server: &SpeedServer) -> ProbeResult<f64>;

    /// Measured upload rate in bytes per second
    async fn upload(&self, server: &SpeedServer) -> ProbeResult<f64>;
}

/// External reachability check: one bounded request, timed
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn request(&self, address: &str, timeout: Duration) -> ProbeResult<Duration>;
}

#[async_trait]
impl<T: SpeedService + ?Sized> SpeedService for Arc<T> {
    async fn discover(&self) -> ProbeResult<SpeedServer> {
        (**self).discover().await
    }

    async fn download(&self, server: &SpeedServer) -> ProbeResult<f64> {
        (**self).download(server).await
    }

    async fn upload(&self, server: &SpeedServer) -> ProbeResult<f64> {
        (**self).upload(server).await
    }
}

#[async_trait]
impl<T: Reachability + ?Sized> Reachability for Arc<T> {
    async fn request(&self, address: &str, timeout: Duration) -> ProbeResult<Duration> {
        (**self).request(address, timeout).await
    }
}

#[async_trait]
impl<T: Probe + ?Sized> Probe for Box<T> {
    fn metrics(&self) -> Vec<String> {
        (**self).metrics()
    }

    async fn sample(&self, clock: &Clock) -> ProbeResult<Sample> {
        (**self).sample(clock).await
    }
}
