//! Render bridge between the store and the live chart surface
//!
//! ```text
//! Sampler ──append──▶ TimeSeriesStore
//!    │
//!    └──push──▶ RenderBridge ──broadcast──▶ chart surface (ChartModel)
//!                                              │
//!                         snapshot on lag ◀────┘
//! ```

pub mod bridge;
pub mod chart;

pub use bridge::{RenderBridge, WeakRenderBridge};
pub use chart::{ChartModel, ChartRegion, ChartSpec, SeriesStyle, ThresholdBand};
