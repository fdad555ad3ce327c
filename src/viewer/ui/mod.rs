//! UI rendering module

mod chart;
mod layout;

pub use layout::render;
