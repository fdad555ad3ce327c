//! Internet quality monitor
//!
//! Measures download/upload throughput and response times on independent schedules and
//! draws them as live step charts in the terminal.

use std::{fs::File, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use netcheck::{
    bootstrap::{HttpProbeFactory, Monitor, StartOptions},
    config::{Config, Overrides, WaitPolicy, parse_target},
    util::{get_wait_policy, log_level_for},
    viewer::{ViewState, run_headless},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{
    filter, fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Parser, Debug)]
#[command(name = "netcheck")]
#[command(about = "Live chart of internet speed and response times", long_about = None)]
struct Args {
    /// Configuration file path (TOML, or JSON by extension)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Wait policy for every group: fixed:<min>, uniform:<max min>, none
    #[arg(long, value_name = "POLICY")]
    wait: Option<String>,

    /// Latency target as name=address (repeatable, replaces the configured targets)
    #[arg(long = "target", value_name = "NAME=ADDRESS")]
    targets: Vec<String>,

    /// Chart title
    #[arg(long)]
    title: Option<String>,

    /// Log updates instead of drawing the dashboard
    #[arg(long)]
    headless: bool,

    /// Sleep after a failed server discovery
    #[arg(long, value_name = "SECONDS")]
    cooldown_secs: Option<u64>,

    /// Stop every sampler after this many ticks
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_file() -> Option<File> {
    let log_path = dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())?
        .join("netcheck")
        .join("netcheck.log");

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()
}

/// Logs go to stderr when headless and to a file while the dashboard owns the terminal
fn init(args: &Args) {
    let level = log_level_for(args.verbose);

    let (writer, level) = if args.headless {
        (BoxMakeWriter::new(std::io::stderr), level)
    } else {
        match log_file() {
            Some(file) => (BoxMakeWriter::new(Mutex::new(file)), level),
            // Without a log file only errors may reach the terminal
            None => (BoxMakeWriter::new(std::io::stderr), LevelFilter::ERROR),
        }
    };

    let filter = filter::Targets::new().with_targets(vec![("netcheck", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .compact()
                .with_ansi(args.headless),
        )
        .with(filter)
        .init();
}

/// Environment first, then the command line on top
fn overrides(args: &Args) -> Result<Overrides> {
    let env_wait = get_wait_policy().context("invalid NETCHECK_WAIT")?;
    let cli_wait = args
        .wait
        .as_deref()
        .map(str::parse::<WaitPolicy>)
        .transpose()
        .context("invalid --wait")?;

    let targets = args
        .targets
        .iter()
        .map(|target| parse_target(target))
        .collect::<Result<Vec<_>>>()?;

    Ok(Overrides {
        wait: cli_wait.or(env_wait),
        targets,
        title: args.title.clone(),
        cooldown_secs: args.cooldown_secs,
    })
}

async fn wait_until_done(monitor: &Monitor) {
    loop {
        if monitor.is_finished() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn headless(monitor: &mut Monitor) {
    let updates = monitor.updates();
    let state = ViewState::new(monitor.title(), monitor.regions().to_vec());
    let store = monitor.store().clone();
    let monitor = &*monitor;

    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
            _ = wait_until_done(monitor) => info!("all samplers finished"),
        }
    };

    run_headless(state, updates, store, shutdown).await;
}

#[cfg(feature = "dashboard")]
async fn dashboard(monitor: &mut Monitor) -> Result<()> {
    let updates = monitor.updates();
    let mut app = netcheck::viewer::App::new(
        monitor.title(),
        monitor.regions().to_vec(),
        updates,
        monitor.store().clone(),
    );
    app.run().await
}

#[cfg(not(feature = "dashboard"))]
async fn dashboard(_monitor: &mut Monitor) -> Result<()> {
    anyhow::bail!("this binary was built without dashboard support, run with --headless")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    init(&args);
    trace!("started with args: {args:?}");

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_overrides(overrides(&args)?);
    config.validate()?;

    let options = StartOptions {
        max_ticks: args.ticks,
        rng_seed: None,
    };
    let mut monitor = Monitor::start(&config, &HttpProbeFactory, options).await?;

    let surface = if args.headless {
        headless(&mut monitor).await;
        Ok(())
    } else {
        dashboard(&mut monitor).await
    };

    for (group, stats) in monitor.shutdown().await? {
        info!(
            "{group}: {} ticks, {} appended, {} skipped",
            stats.ticks, stats.appended, stats.skipped
        );
    }

    surface
}
