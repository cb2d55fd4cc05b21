//! Crossterm dashboard: key routing, layout, colours, and the event loop.

#![allow(missing_docs)]

pub mod input;
pub mod render;
pub mod runtime;
pub mod terminal_guard;
pub mod theme;

pub use runtime::{DashboardOptions, run};
pub use theme::ColorMode;
