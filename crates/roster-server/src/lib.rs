//! # Roster Server Library
//!
//! Wiring and process lifecycle for the Roster server: logging and metrics
//! setup, the startup database probe, cache backend selection, and
//! graceful shutdown.

pub mod app;
pub mod startup;
pub mod telemetry;

pub use app::{build_cache, build_router, Application, CacheBackendHandle};
