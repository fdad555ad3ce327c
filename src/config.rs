use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail, ensure};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    GroupId,
    probes::{
        LatencyTarget,
        throughput::{DOWNLOAD, UPLOAD},
    },
    render::ChartSpec,
};

/// How long a sampler waits before each measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum WaitPolicy {
    /// Exactly this many minutes
    Fixed { minutes: f64 },

    /// Uniformly random in `[0, max_minutes]`
    Uniform { max_minutes: f64 },

    /// Every tick of a short timer; randomization comes from the separate jitter
    None {
        #[serde(default = "default_tick_seconds")]
        tick_seconds: f64,
    },
}

fn default_tick_seconds() -> f64 {
    1.0
}

/// Longest single wait a policy or jitter may produce
pub const MAX_WAIT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Convert seconds to a wait, clamped to `[0, MAX_WAIT]`
fn clamp_wait(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(wait) => wait.min(MAX_WAIT),
        Err(_) if secs > 0.0 => MAX_WAIT,
        Err(_) => Duration::ZERO,
    }
}

/// Uniformly random wait in `[0, max_minutes]`
pub(crate) fn random_wait<R: Rng + ?Sized>(rng: &mut R, max_minutes: f64) -> Duration {
    if max_minutes.is_nan() || max_minutes < 0.0 {
        return Duration::ZERO;
    }

    let max_minutes = max_minutes.min(MAX_WAIT.as_secs_f64() / 60.0);
    clamp_wait(rng.gen_range(0.0..=max_minutes) * 60.0)
}

fn check_wait_minutes(minutes: f64) -> bool {
    minutes.is_finite() && minutes >= 0.0 && minutes * 60.0 <= MAX_WAIT.as_secs_f64()
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy::Uniform { max_minutes: 2.0 }
    }
}

impl WaitPolicy {
    /// Never longer than [`MAX_WAIT`]
    pub fn next_wait<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            WaitPolicy::Fixed { minutes } => clamp_wait(minutes * 60.0),
            WaitPolicy::Uniform { max_minutes } => random_wait(rng, max_minutes),
            WaitPolicy::None { tick_seconds } => clamp_wait(tick_seconds),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let minutes = match *self {
            WaitPolicy::Fixed { minutes } => minutes,
            WaitPolicy::Uniform { max_minutes } => max_minutes,
            WaitPolicy::None { tick_seconds } => tick_seconds / 60.0,
        };
        ensure!(
            check_wait_minutes(minutes),
            "wait policy {self:?} needs a non-negative value of at most {} minutes",
            MAX_WAIT.as_secs() / 60
        );
        Ok(())
    }
}

impl FromStr for WaitPolicy {
    type Err = anyhow::Error;

    /// Parses `fixed:<minutes>`, `uniform:<max minutes>`, `none` or `none:<tick seconds>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = match s.split_once(':') {
            Some((kind, value)) => (kind.trim(), Some(value.trim())),
            None => (s.trim(), None),
        };

        let number = |value: Option<&str>| -> anyhow::Result<f64> {
            let value = value.with_context(|| format!("wait policy '{s}' needs a value"))?;
            value
                .parse::<f64>()
                .with_context(|| format!("invalid number '{value}' in wait policy '{s}'"))
        };

        let policy = match kind.to_ascii_lowercase().as_str() {
            "fixed" => WaitPolicy::Fixed {
                minutes: number(value)?,
            },
            "uniform" => WaitPolicy::Uniform {
                max_minutes: number(value)?,
            },
            "none" => WaitPolicy::None {
                tick_seconds: match value {
                    Some(_) => number(value)?,
                    None => default_tick_seconds(),
                },
            },
            other => bail!("unknown wait policy '{other}' (expected fixed, uniform or none)"),
        };

        policy.validate()?;
        Ok(policy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputConfig {
    #[serde(default = "default_speed_servers")]
    pub servers: Vec<String>,
    #[serde(default = "default_download_bytes")]
    pub download_bytes: u64,
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: u64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_speed_servers() -> Vec<String> {
    vec!["https://speed.cloudflare.com".to_string()]
}

fn default_download_bytes() -> u64 {
    25 * 1024 * 1024
}

fn default_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_cooldown_secs() -> u64 {
    300
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            servers: default_speed_servers(),
            download_bytes: default_download_bytes(),
            upload_bytes: default_upload_bytes(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default = "default_targets")]
    pub targets: Vec<LatencyTarget>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_targets() -> Vec<LatencyTarget> {
    vec![
        LatencyTarget::new("Home", "192.168.0.1"),
        LatencyTarget::new("Google", "google.com"),
    ]
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// What a group measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeConfig {
    Throughput(ThroughputConfig),
    Latency(LatencyConfig),
    /// Throughput and latency measured in the same tick
    Combined {
        #[serde(default)]
        throughput: ThroughputConfig,
        #[serde(default)]
        latency: LatencyConfig,
    },
}

impl ProbeConfig {
    /// Metric names every sample of this probe carries
    pub fn metric_names(&self) -> Vec<String> {
        let speed = || vec![DOWNLOAD.to_string(), UPLOAD.to_string()];
        let ping = |latency: &LatencyConfig| {
            latency
                .targets
                .iter()
                .map(|t| t.name.clone())
                .collect::<Vec<_>>()
        };

        match self {
            ProbeConfig::Throughput(_) => speed(),
            ProbeConfig::Latency(latency) => ping(latency),
            ProbeConfig::Combined { latency, .. } => {
                let mut names = speed();
                names.extend(ping(latency));
                names
            }
        }
    }

    /// Chart regions used when a group configures none
    pub fn default_charts(&self) -> Vec<ChartSpec> {
        match self {
            ProbeConfig::Throughput(_) => vec![ChartSpec::speed()],
            ProbeConfig::Latency(latency) => vec![ChartSpec::ping(&latency.targets)],
            ProbeConfig::Combined { latency, .. } => {
                vec![ChartSpec::speed(), ChartSpec::ping(&latency.targets)]
            }
        }
    }

    fn latency_mut(&mut self) -> Option<&mut LatencyConfig> {
        match self {
            ProbeConfig::Throughput(_) => None,
            ProbeConfig::Latency(latency) | ProbeConfig::Combined { latency, .. } => Some(latency),
        }
    }

    fn throughput_mut(&mut self) -> Option<&mut ThroughputConfig> {
        match self {
            ProbeConfig::Latency(_) => None,
            ProbeConfig::Throughput(throughput) | ProbeConfig::Combined { throughput, .. } => {
                Some(throughput)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: GroupId,
    pub probe: ProbeConfig,
    #[serde(default)]
    pub wait: WaitPolicy,
    /// Extra random wait in `[0, jitter_max_minutes]` added to every computed wait
    #[serde(default)]
    pub jitter_max_minutes: Option<f64>,
    /// Chart regions drawn from this group (defaults depend on the probe)
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
}

impl GroupConfig {
    pub fn charts(&self) -> Vec<ChartSpec> {
        if self.charts.is_empty() {
            self.probe.default_charts()
        } else {
            self.charts.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_groups")]
    pub groups: Vec<GroupConfig>,
}

fn default_title() -> String {
    "Internet Check".to_string()
}

fn default_groups() -> Vec<GroupConfig> {
    vec![
        GroupConfig {
            id: GroupId::from("speed"),
            probe: ProbeConfig::Throughput(ThroughputConfig::default()),
            wait: WaitPolicy::default(),
            jitter_max_minutes: None,
            charts: Vec::new(),
        },
        GroupConfig {
            id: GroupId::from("ping"),
            probe: ProbeConfig::Latency(LatencyConfig::default()),
            wait: WaitPolicy::default(),
            jitter_max_minutes: None,
            charts: Vec::new(),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: default_title(),
            groups: default_groups(),
        }
    }
}

/// Command line / environment overrides applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub wait: Option<WaitPolicy>,
    pub targets: Vec<LatencyTarget>,
    pub title: Option<String>,
    pub cooldown_secs: Option<u64>,
}

impl Config {
    /// Load configuration from file, or use defaults if no file exists
    ///
    /// Files ending in `.json` are read as JSON, everything else as TOML.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.map(Path::to_path_buf).or_else(|| {
            let default_path = default_config_path()?;
            default_path.exists().then_some(default_path)
        });

        let config = match config_path {
            Some(path) => Self::read(&path)?,
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Self = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        trace!("loaded config: {config:?}");
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(title) = overrides.title {
            self.title = title;
        }

        for group in &mut self.groups {
            if let Some(wait) = &overrides.wait {
                group.wait = wait.clone();
            }

            if !overrides.targets.is_empty()
                && let Some(latency) = group.probe.latency_mut()
            {
                latency.targets = overrides.targets.clone();
                // Styles reference the old target names
                group.charts.clear();
            }

            if let Some(cooldown) = overrides.cooldown_secs
                && let Some(throughput) = group.probe.throughput_mut()
            {
                throughput.cooldown_secs = cooldown;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.groups.is_empty(), "at least one metric group must be configured");

        let mut ids = HashSet::new();
        for group in &self.groups {
            ensure!(ids.insert(&group.id), "duplicate metric group '{}'", group.id);

            group
                .wait
                .validate()
                .with_context(|| format!("invalid wait policy for '{}'", group.id))?;

            if let Some(jitter) = group.jitter_max_minutes {
                ensure!(
                    check_wait_minutes(jitter),
                    "jitter for '{}' must be non-negative and at most {} minutes",
                    group.id,
                    MAX_WAIT.as_secs() / 60
                );
            }

            let metrics = group.probe.metric_names();
            ensure!(!metrics.is_empty(), "group '{}' measures nothing", group.id);

            let mut unique = HashSet::new();
            for metric in &metrics {
                ensure!(
                    unique.insert(metric),
                    "metric '{metric}' appears twice in group '{}'",
                    group.id
                );
            }

            for chart in group.charts() {
                for series in &chart.series {
                    ensure!(
                        metrics.contains(&series.metric),
                        "chart '{}' draws '{}', which group '{}' does not measure",
                        chart.title,
                        series.metric,
                        group.id
                    );
                }
            }
        }

        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("netcheck").join("config.toml"))
}

/// Parse a `name=address` latency target
pub fn parse_target(s: &str) -> anyhow::Result<LatencyTarget> {
    match s.split_once('=') {
        Some((name, address)) if !name.trim().is_empty() && !address.trim().is_empty() => {
            Ok(LatencyTarget::new(name.trim(), address.trim()))
        }
        _ => bail!("invalid target '{s}', expected name=address"),
    }
}
