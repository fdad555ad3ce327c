//! Chart surfaces
//!
//! The dashboard draws every chart region in the terminal; the headless surface only
//! logs the update stream. Both keep a [`ChartModel`](crate::render::ChartModel) replica
//! fed by the render bridge.

pub mod headless;
pub mod state;

#[cfg(feature = "dashboard")]
mod app;
#[cfg(feature = "dashboard")]
mod ui;

#[cfg(feature = "dashboard")]
pub use app::App;
pub use headless::run_headless;
pub use state::ViewState;
