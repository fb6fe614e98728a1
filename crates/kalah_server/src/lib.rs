//! Kalah match server.
//!
//! Wraps the rules in [`kalah_rules`] with persistence, per-match locking and
//! a REST + WebSocket transport.
//!
//! # Architecture
//!
//! - **Store**: [`MatchStore`] gateway with in-memory and SQLite backends
//! - **Service**: [`MatchService`] runs each operation as one locked
//!   load/apply/commit cycle
//! - **Hub**: [`MatchHub`] fans updates out to WebSocket subscribers
//! - **API**: axum router returning the `{version, result, code, message}`
//!   envelope

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
mod config;
mod db;
mod hub;
mod locks;
mod service;
mod store;

pub use config::{ConfigError, ServerConfig};
pub use db::{MIGRATIONS, SqliteStore};
pub use hub::{MatchHub, Subscription};
pub use locks::MatchLocks;
pub use service::{MatchObserver, MatchService, MatchView, PlayerDescriptor, ServiceError};
pub use store::{Commit, MatchStore, MemoryStore, StoreError};
