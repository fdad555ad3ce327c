//! Actor-based sampling
//!
//! Each metric group is sampled by its own actor running as an independent tokio task.
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────┐
//!                    │    Bootstrap    │
//!                    └────────┬────────┘
//!                             │ seeds + spawns
//!                ┌────────────┴────────────┐
//!                │                         │
//!        ┌───────▼───────┐         ┌───────▼───────┐
//!        │ Sampler       │         │ Sampler       │
//!        │ (speed)       │         │ (ping)        │
//!        └───┬───────┬───┘         └───┬───────┬───┘
//!            │       │ append          │       │
//!            │   ┌───▼─────────────────▼───┐   │
//!            │   │     TimeSeriesStore     │   │
//!            │   └─────────────────────────┘   │
//!            │ push                       push │
//!            └──────────┐           ┌──────────┘
//!                  ┌────▼───────────▼────┐
//!                  │  Broadcast Channel  │ (chart updates)
//!                  └──────────┬──────────┘
//!                             │ subscribe
//!                     ┌───────▼───────┐
//!                     │ Chart surface │
//!                     └───────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each sampler has an mpsc command channel (`SampleNow`)
//! 2. **Stop signal**: a watch flag checked at the top of every iteration
//! 3. **Events**: chart updates are broadcast, never awaited

pub mod messages;
pub mod sampler;
