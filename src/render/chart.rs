//! Chart layout and the client-side replica of the plotted series
//!
//! The chart surface keeps its own copy of every group, built from one seed snapshot
//! and then extended point by point from [`ChartUpdate`] events. If an event is lost,
//! the group is flagged and rebuilt from a fresh store snapshot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    GroupId,
    actors::messages::ChartUpdate,
    probes::{
        LatencyTarget,
        throughput::{DOWNLOAD, UPLOAD},
    },
    storage::GroupSnapshot,
};

/// Static description of one chart region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub y_label: String,
    pub series: Vec<SeriesStyle>,
    #[serde(default)]
    pub bands: Vec<ThresholdBand>,
}

/// Line style of one series, drawn as a step-after line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    /// Metric column the line is drawn from
    pub metric: String,
    /// Legend label
    pub label: String,
    /// Color name or `#rrggbb`
    pub color: String,
    #[serde(default = "default_width")]
    pub width: u16,
    #[serde(default)]
    pub dashed: bool,
}

fn default_width() -> u16 {
    3
}

/// Static colored value range overlaid on a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub lower: f64,
    /// `None` extends the band to the top of the chart
    pub upper: Option<f64>,
    pub color: String,
}

impl ThresholdBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.is_none_or(|upper| value < upper)
    }
}

impl SeriesStyle {
    pub fn new(metric: &str, label: &str, color: &str) -> Self {
        Self {
            metric: metric.to_string(),
            label: label.to_string(),
            color: color.to_string(),
            width: default_width(),
            dashed: false,
        }
    }

    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }
}

impl ChartSpec {
    /// Download/upload chart
    pub fn speed() -> Self {
        Self {
            title: "Speed".to_string(),
            y_label: "Speed [MB/S]".to_string(),
            series: vec![
                SeriesStyle::new(DOWNLOAD, "Download", "blue"),
                SeriesStyle::new(UPLOAD, "Upload", "#ffa500"),
            ],
            bands: Vec::new(),
        }
    }

    /// Response time chart with good / degraded / bad bands
    pub fn ping(targets: &[LatencyTarget]) -> Self {
        let series = targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let style =
                    SeriesStyle::new(&target.name, &format!("{} Ping", target.name), "white");
                if i == 0 { style } else { style.dashed() }
            })
            .collect();

        Self {
            title: "Ping".to_string(),
            y_label: "Response Time [ms]".to_string(),
            series,
            bands: vec![
                ThresholdBand {
                    lower: 0.0,
                    upper: Some(20.0),
                    color: "#7fff00".to_string(),
                },
                ThresholdBand {
                    lower: 20.0,
                    upper: Some(100.0),
                    color: "#ffd700".to_string(),
                },
                ThresholdBand {
                    lower: 100.0,
                    upper: None,
                    color: "#ff6347".to_string(),
                },
            ],
        }
    }

    /// Band a value falls into, if any
    pub fn band_for(&self, value: f64) -> Option<&ThresholdBand> {
        self.bands.iter().find(|band| band.contains(value))
    }
}

/// Chart region bound to the group it reads from
#[derive(Debug, Clone)]
pub struct ChartRegion {
    pub group: GroupId,
    pub spec: ChartSpec,
}

/// Client-side replica of one group's series
#[derive(Debug, Clone, Default)]
struct GroupView {
    timestamps: Vec<DateTime<Utc>>,
    columns: HashMap<String, Vec<f64>>,
}

impl GroupView {
    fn from_snapshot(snapshot: &GroupSnapshot) -> Self {
        Self {
            timestamps: snapshot.timestamps.clone(),
            columns: snapshot
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.values.clone()))
                .collect(),
        }
    }

    /// Extend by one point; `false` if the point does not fit this replica
    fn push(&mut self, timestamp: DateTime<Utc>, points: &[(String, f64)]) -> bool {
        let complete = points.len() == self.columns.len()
            && points.iter().all(|(name, _)| self.columns.contains_key(name));
        if !complete {
            return false;
        }

        self.timestamps.push(timestamp);
        for (name, value) in points {
            if let Some(column) = self.columns.get_mut(name) {
                column.push(*value);
            }
        }
        true
    }
}

/// All chart regions plus the replicated data they draw
#[derive(Debug, Default)]
pub struct ChartModel {
    regions: Vec<ChartRegion>,
    groups: HashMap<GroupId, GroupView>,
    stale: HashSet<GroupId>,
}

impl ChartModel {
    pub fn new(regions: Vec<ChartRegion>) -> Self {
        Self {
            regions,
            groups: HashMap::new(),
            stale: HashSet::new(),
        }
    }

    pub fn regions(&self) -> &[ChartRegion] {
        &self.regions
    }

    /// Apply one pushed update
    pub fn apply(&mut self, update: &ChartUpdate) {
        match update {
            ChartUpdate::Seed { snapshot } => self.resync(snapshot),
            ChartUpdate::Append {
                group,
                timestamp,
                points,
            } => {
                let fits = self
                    .groups
                    .get_mut(group)
                    .is_some_and(|view| view.push(*timestamp, points));

                if !fits {
                    warn!("update for '{group}' does not match the chart replica, resync needed");
                    self.stale.insert(group.clone());
                }
            }
        }
    }

    /// Replace a group's replica with a full snapshot
    pub fn resync(&mut self, snapshot: &GroupSnapshot) {
        debug!(
            "loaded {} points for '{}' into chart",
            snapshot.len(),
            snapshot.group
        );
        self.stale.remove(&snapshot.group);
        self.groups
            .insert(snapshot.group.clone(), GroupView::from_snapshot(snapshot));
    }

    /// Mark every group as needing a resync (e.g. after lagging behind the update stream)
    pub fn mark_all_stale(&mut self) {
        self.stale
            .extend(self.regions.iter().map(|r| r.group.clone()));
    }

    pub fn stale_groups(&self) -> Vec<GroupId> {
        let mut stale: Vec<GroupId> = self.stale.iter().cloned().collect();
        stale.sort();
        stale
    }

    pub fn len(&self, group: &GroupId) -> usize {
        self.groups.get(group).map_or(0, |view| view.timestamps.len())
    }

    /// Ordered `(timestamp, value)` pairs as plotted
    pub fn points(&self, group: &GroupId, metric: &str) -> Vec<(DateTime<Utc>, f64)> {
        let Some(view) = self.groups.get(group) else {
            return Vec::new();
        };
        let Some(values) = view.columns.get(metric) else {
            return Vec::new();
        };

        view.timestamps
            .iter()
            .copied()
            .zip(values.iter().copied())
            .collect()
    }

    /// Latest value of a metric
    pub fn latest(&self, group: &GroupId, metric: &str) -> Option<f64> {
        self.groups
            .get(group)
            .and_then(|view| view.columns.get(metric))
            .and_then(|values| values.last().copied())
    }

    /// Step-after polyline of a metric in chart coordinates
    pub fn stepped(&self, group: &GroupId, metric: &str) -> Vec<(f64, f64)> {
        let points: Vec<(f64, f64)> = self
            .points(group, metric)
            .into_iter()
            .map(|(t, v)| (x_coord(t), v))
            .collect();

        step_after(&points)
    }

    /// Time range shared by every region, in chart coordinates
    pub fn x_bounds(&self) -> [f64; 2] {
        let first = self.groups.values().filter_map(|v| v.timestamps.first()).min();
        let last = self.groups.values().filter_map(|v| v.timestamps.last()).max();

        match (first, last) {
            (Some(first), Some(last)) if last > first => [x_coord(*first), x_coord(*last)],
            (Some(first), _) => [x_coord(*first), x_coord(*first) + 60.0],
            _ => [0.0, 60.0],
        }
    }

    /// Value range of a region covering its data and bounded bands
    pub fn y_bounds(&self, region: &ChartRegion) -> [f64; 2] {
        let data_max = region
            .spec
            .series
            .iter()
            .flat_map(|s| self.points(&region.group, &s.metric))
            .map(|(_, v)| v)
            .fold(0.0, f64::max);

        let band_max = region
            .spec
            .bands
            .iter()
            .map(|b| b.upper.unwrap_or(b.lower))
            .fold(0.0, f64::max);

        let top = data_max.max(band_max);
        [0.0, if top > 0.0 { top * 1.1 } else { 1.0 }]
    }
}

/// Chart x coordinate of a timestamp (seconds since the Unix epoch)
pub fn x_coord(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64 / 1000.0
}

/// Expand points into a step-after polyline
///
/// Every value holds until the next point's x, then jumps.
pub fn step_after(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut stepped = Vec::with_capacity(points.len() * 2);

    for (i, &(x, y)) in points.iter().enumerate() {
        if i > 0 {
            let (_, previous) = points[i - 1];
            stepped.push((x, previous));
        }
        stepped.push((x, y));
    }

    stepped
}

/// Tick label format for a visible time span
pub fn time_format(span: TimeDelta) -> &'static str {
    if span < TimeDelta::days(1) {
        "%I:%M %p"
    } else if span < TimeDelta::days(60) {
        "%d-%b"
    } else {
        "%b/%Y"
    }
}

/// Evenly spaced tick labels across the x range
pub fn time_labels(bounds: [f64; 2], count: usize) -> Vec<String> {
    let [start, end] = bounds;
    let span = TimeDelta::milliseconds(((end - start) * 1000.0) as i64);
    let format = time_format(span);
    let count = count.max(2);

    (0..count)
        .filter_map(|i| {
            let x = start + (end - start) * i as f64 / (count - 1) as f64;
            DateTime::<Utc>::from_timestamp_millis((x * 1000.0) as i64)
        })
        .map(|t| t.with_timezone(&chrono::Local).format(format).to_string())
        .collect()
}
