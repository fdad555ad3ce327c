//! HTTP implementations of the external measurement services
//!
//! Both services reuse one `reqwest::Client` across measurements.
//!
//! The speed service talks to servers exposing `GET /__down?bytes=N` and
//! `POST /__up` (the layout used by speed.cloudflare.com).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::{ProbeError, ProbeResult, Reachability, SpeedServer, SpeedService};

/// Map a reqwest failure of a reachability check onto the probe taxonomy
fn classify(address: &str, err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout(format!("{address}: {err}"))
    } else if err.is_connect() || err.is_request() {
        ProbeError::Connection(format!("{address}: {err}"))
    } else {
        ProbeError::Unexpected(anyhow::Error::new(err).context(format!("request to {address}")))
    }
}

fn url_for(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Times a single GET request until the response headers arrive
///
/// Any HTTP status counts as reachable.
#[derive(Clone)]
pub struct HttpReachability {
    client: reqwest::Client,
}

impl HttpReachability {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Reachability for HttpReachability {
    async fn request(&self, address: &str, timeout: Duration) -> ProbeResult<Duration> {
        let url = url_for(address);
        trace!("pinging {url}");

        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(address, e))?;
        let elapsed = start.elapsed();

        trace!("{url}: {} after {}ms", response.status(), elapsed.as_millis());
        Ok(elapsed)
    }
}

/// Speed service backed by a list of candidate HTTP speed test servers
#[derive(Clone)]
pub struct HttpSpeedService {
    client: reqwest::Client,
    servers: Vec<String>,
    download_bytes: u64,
    upload_bytes: u64,
    discovery_timeout: Duration,
}

impl HttpSpeedService {
    pub fn new(servers: Vec<String>, download_bytes: u64, upload_bytes: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            servers: servers
                .into_iter()
                .map(|s| s.trim_end_matches('/').to_string())
                .collect(),
            download_bytes,
            upload_bytes,
            discovery_timeout: Duration::from_secs(5),
        })
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Latency of one candidate, `Ok(None)` if it answered with an error status
    async fn probe_server(&self, base: &str) -> Result<Option<Duration>, reqwest::Error> {
        let start = Instant::now();
        let response = self
            .client
            .get(format!("{base}/__down?bytes=0"))
            .timeout(self.discovery_timeout)
            .send()
            .await?;
        let elapsed = start.elapsed();

        if response.status().is_success() {
            Ok(Some(elapsed))
        } else {
            debug!("{base}: discovery answered {}", response.status());
            Ok(None)
        }
    }
}

fn rate(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-6);
    bytes as f64 / secs
}

#[async_trait]
impl SpeedService for HttpSpeedService {
    async fn discover(&self) -> ProbeResult<SpeedServer> {
        if self.servers.is_empty() {
            return Err(ProbeError::ConfigRetrieval(
                "no speed test servers configured".to_string(),
            ));
        }

        let results = join_all(self.servers.iter().map(|s| self.probe_server(s))).await;

        let mut answered = false;
        let mut last_error = None;
        let mut best: Option<SpeedServer> = None;

        for (url, result) in self.servers.iter().zip(results) {
            match result {
                Ok(Some(latency)) => {
                    answered = true;
                    if best.as_ref().is_none_or(|b| latency < b.latency) {
                        best = Some(SpeedServer {
                            url: url.clone(),
                            latency,
                        });
                    }
                }
                Ok(None) => answered = true,
                Err(e) => last_error = Some(format!("{url}: {e}")),
            }
        }

        match best {
            Some(server) => Ok(server),
            None if answered => Err(ProbeError::BestServerSelection(
                "no server answered successfully".to_string(),
            )),
            None => Err(ProbeError::ConfigRetrieval(format!(
                "no server reachable ({})",
                last_error.unwrap_or_default()
            ))),
        }
    }

    async fn download(&self, server: &SpeedServer) -> ProbeResult<f64> {
        let url = format!("{}/__down?bytes={}", server.url, self.download_bytes);

        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::Transfer(format!("download from {}: {e}", server.url)))?;

        if !response.status().is_success() {
            return Err(ProbeError::Transfer(format!(
                "download from {}: HTTP {}",
                server.url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProbeError::Transfer(format!("download from {}: {e}", server.url)))?;
        let elapsed = start.elapsed();

        trace!("downloaded {} bytes in {}ms", body.len(), elapsed.as_millis());
        Ok(rate(body.len() as u64, elapsed))
    }

    async fn upload(&self, server: &SpeedServer) -> ProbeResult<f64> {
        let url = format!("{}/__up", server.url);
        let payload = vec![0u8; self.upload_bytes as usize];

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .body(payload)
            .send()
            .await
            .map_err(|e| ProbeError::Transfer(format!("upload to {}: {e}", server.url)))?;
        let elapsed = start.elapsed();

        if !response.status().is_success() {
            return Err(ProbeError::Transfer(format!(
                "upload to {}: HTTP {}",
                server.url,
                response.status()
            )));
        }

        trace!("uploaded {} bytes in {}ms", self.upload_bytes, elapsed.as_millis());
        Ok(rate(self.upload_bytes, elapsed))
    }
}
