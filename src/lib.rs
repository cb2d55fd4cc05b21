#![forbid(unsafe_code)]

//! SquAd: a terminal dashboard for Squonk2 Account Server and Data Manager
//! deployments.
//!
//! The engine polls one topic at a time through per-topic [`topics::source::TopicSource`]s:
//! 1. **Credential cache**: per-backend bearer tokens with coalesced refresh
//! 2. **TTL gate**: a topic is fetched at most once per refresh interval
//! 3. **Sortable datasets**: stable, typed sorting of the last good rows
//!
//! # Library usage
//!
//! ```rust,no_run
//! use squad::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use squad::core::config::Config;
//! use squad::topics::catalog::definition;
//! ```

pub mod prelude;

pub mod auth;
pub mod backend;
pub mod core;
pub mod dashboard;
pub mod logger;
pub mod topics;
#[cfg(feature = "tui")]
pub mod tui;
