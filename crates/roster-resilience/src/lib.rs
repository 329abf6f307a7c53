//! # Roster Resilience
//!
//! Resilience patterns for Roster.
//! Provides the bounded retry used to wait for backing services at startup.

pub mod retry;

pub use retry::*;
