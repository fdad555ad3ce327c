//! End-to-end runs of the composed system with fake measurement services
//!
//! All tests run on tokio's paused clock, so minute-long waits and cooldowns complete
//! instantly while timestamps still reflect them.

use std::time::Duration;

use anyhow::anyhow;
use chrono::TimeDelta;
use netcheck::{
    GroupId,
    actors::messages::{ChartUpdate, SamplerStats},
    bootstrap::{Monitor, StartOptions},
    probes::{
        LatencyProbe, Probe, ProbeError, ThroughputProbe,
        throughput::{DOWNLOAD, UPLOAD},
    },
    storage::TimeSeriesStore,
    viewer::{ViewState, run_headless},
};
use pretty_assertions::assert_eq;
use tokio::sync::broadcast::error::RecvError;

use crate::helpers::*;

fn bounded(ticks: u64) -> StartOptions {
    StartOptions {
        max_ticks: Some(ticks),
        rng_seed: Some(7),
    }
}

fn values(store: &TimeSeriesStore, group: &str, metric: &str) -> Vec<f64> {
    store
        .snapshot(&GroupId::from(group))
        .unwrap()
        .column(metric)
        .unwrap()
        .values
        .clone()
}

fn throughput(script: Vec<Result<(f64, f64), ProbeError>>) -> Box<dyn Probe> {
    Box::new(ThroughputProbe::with_cooldown(
        ScriptedSpeedService::new(script),
        Duration::from_secs(300),
    ))
}

fn latency() -> Box<dyn Probe> {
    Box::new(LatencyProbe::new(
        TableReachability::new(&[
            ("192.168.0.1", Outcome::Answers(Duration::from_millis(3))),
            ("google.com", Outcome::TimesOut),
        ]),
        legacy_targets(),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_discovery_failure_records_zero_after_cooldown() {
    let factory = QueuedFactory::new(vec![throughput(vec![
        Ok((25.4, 3.2)),
        Err(ProbeError::ConfigRetrieval("speed test config unavailable".to_string())),
    ])]);
    let config = config_with(vec![speed_group("speed", 1.0)]);

    let monitor = Monitor::start(&config, &factory, bounded(1)).await.unwrap();
    let store = monitor.store().clone();
    let stats = monitor.join().await.unwrap();

    assert_eq!(
        stats,
        vec![(
            GroupId::from("speed"),
            SamplerStats {
                ticks: 1,
                appended: 1,
                skipped: 0
            }
        )]
    );
    assert_eq!(values(&store, "speed", DOWNLOAD), vec![25.4, 0.0]);
    assert_eq!(values(&store, "speed", UPLOAD), vec![3.2, 0.0]);

    // One minute of waiting plus the full cooldown before the sentinel is stamped
    let timestamps = store.snapshot(&GroupId::from("speed")).unwrap().timestamps;
    let gap = timestamps[1] - timestamps[0];
    assert!(gap >= TimeDelta::seconds(360), "gap was {gap}");
    assert!(gap < TimeDelta::seconds(361), "gap was {gap}");
}

#[tokio::test(start_paused = true)]
async fn test_latency_group_appends_every_tick() {
    let factory = QueuedFactory::new(vec![latency()]);
    let config = config_with(vec![ping_group("ping", 1.0)]);

    let monitor = Monitor::start(&config, &factory, bounded(2)).await.unwrap();
    let store = monitor.store().clone();
    monitor.join().await.unwrap();

    assert_eq!(values(&store, "ping", "Home"), vec![3.0, 3.0, 3.0]);
    assert_eq!(values(&store, "ping", "Google"), vec![0.0, 0.0, 0.0]);

    let timestamps = store.snapshot(&GroupId::from("ping")).unwrap().timestamps;
    assert_eq!(timestamps[1] - timestamps[0], TimeDelta::minutes(1));
    assert_eq!(timestamps[2] - timestamps[1], TimeDelta::minutes(1));
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_failure_skips_tick_and_keeps_running() {
    let factory = QueuedFactory::new(vec![throughput(vec![
        Ok((25.4, 3.2)),
        Err(ProbeError::Unexpected(anyhow!("speed test crashed"))),
        Ok((30.0, 4.0)),
    ])]);
    let config = config_with(vec![speed_group("speed", 1.0)]);

    let monitor = Monitor::start(&config, &factory, bounded(2)).await.unwrap();
    let store = monitor.store().clone();
    let stats = monitor.join().await.unwrap();

    // The error line of the skipped tick is checked by the sampler unit tests
    assert_eq!(
        stats[0].1,
        SamplerStats {
            ticks: 2,
            appended: 1,
            skipped: 1
        }
    );
    assert_eq!(values(&store, "speed", DOWNLOAD), vec![25.4, 30.0]);
    assert_eq!(values(&store, "speed", UPLOAD), vec![3.2, 4.0]);
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_seed_failure_starts_from_sentinel() {
    let factory = QueuedFactory::new(vec![throughput(vec![
        Err(ProbeError::Unexpected(anyhow!("no network stack"))),
        Ok((25.4, 3.2)),
    ])]);
    let config = config_with(vec![speed_group("speed", 1.0)]);

    let monitor = Monitor::start(&config, &factory, bounded(1)).await.unwrap();
    let store = monitor.store().clone();
    monitor.join().await.unwrap();

    assert_eq!(values(&store, "speed", DOWNLOAD), vec![0.0, 25.4]);
}

#[tokio::test(start_paused = true)]
async fn test_groups_run_on_independent_timelines() {
    let factory = QueuedFactory::new(vec![
        throughput(vec![Ok((25.4, 3.2)), Ok((20.0, 2.0)), Ok((22.0, 2.5))]),
        latency(),
    ]);
    let config = config_with(vec![speed_group("speed", 5.0), ping_group("ping", 1.0)]);

    let mut monitor = Monitor::start(&config, &factory, bounded(2)).await.unwrap();
    let mut updates = monitor.updates();
    let store = monitor.store().clone();

    assert_eq!(monitor.regions().len(), 2);
    assert_eq!(monitor.regions()[0].spec.title, "Speed");
    assert_eq!(monitor.regions()[1].spec.title, "Ping");

    monitor.join().await.unwrap();

    let speed = store.snapshot(&GroupId::from("speed")).unwrap();
    let ping = store.snapshot(&GroupId::from("ping")).unwrap();
    assert_eq!(speed.len(), 3);
    assert_eq!(ping.len(), 3);
    assert_eq!(speed.timestamps[1] - speed.timestamps[0], TimeDelta::minutes(5));
    assert_eq!(ping.timestamps[1] - ping.timestamps[0], TimeDelta::minutes(1));

    // Both seeds arrive first, then one append per tick
    let mut received = Vec::new();
    while let Ok(update) = updates.try_recv() {
        received.push(update);
    }
    assert!(matches!(&received[0], ChartUpdate::Seed { snapshot } if snapshot.group.as_str() == "speed"));
    assert!(matches!(&received[1], ChartUpdate::Seed { snapshot } if snapshot.group.as_str() == "ping"));

    let appends = |group: &str| {
        received
            .iter()
            .filter(|u| matches!(u, ChartUpdate::Append { .. }) && u.group().as_str() == group)
            .count()
    };
    assert_eq!(appends("speed"), 2);
    assert_eq!(appends("ping"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_update_stream_closes_when_bounded_run_ends() {
    let factory = QueuedFactory::new(vec![latency()]);
    let config = config_with(vec![ping_group("ping", 1.0)]);

    let mut monitor = Monitor::start(&config, &factory, bounded(1)).await.unwrap();
    let state = ViewState::new(monitor.title(), monitor.regions().to_vec());
    let updates = monitor.updates();

    // The surface is never told to stop, the closed stream ends it
    let state = run_headless(state, updates, monitor.store().clone(), std::future::pending()).await;

    assert!(monitor.is_finished());
    assert_eq!(state.model.len(&GroupId::from("ping")), 2);
    assert_eq!(monitor.updates().recv().await, Err(RecvError::Closed));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_long_wait() {
    let factory = QueuedFactory::new(vec![latency()]);
    let config = config_with(vec![ping_group("ping", 60.0)]);

    let monitor = Monitor::start(&config, &factory, StartOptions::default())
        .await
        .unwrap();
    let store = monitor.store().clone();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!monitor.is_finished());

    let stats = monitor.shutdown().await.unwrap();

    assert_eq!(stats[0].1.ticks, 0);
    assert_eq!(store.len(&GroupId::from("ping")).unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sample_now_outside_schedule() {
    let factory = QueuedFactory::new(vec![latency()]);
    let config = config_with(vec![ping_group("ping", 60.0)]);

    let monitor = Monitor::start(&config, &factory, StartOptions::default())
        .await
        .unwrap();

    let sample = monitor.samplers()[0].sample_now().await.unwrap();

    assert_eq!(sample.get("Home"), Some(3.0));
    assert_eq!(monitor.store().len(&GroupId::from("ping")).unwrap(), 2);

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_is_rejected_before_sampling() {
    let factory = QueuedFactory::new(vec![latency(), latency()]);
    let config = config_with(vec![ping_group("ping", 1.0), ping_group("ping", 1.0)]);

    assert!(Monitor::start(&config, &factory, bounded(1)).await.is_err());
}
