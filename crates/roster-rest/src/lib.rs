//! # Roster REST
//!
//! REST API layer using Axum for Roster.
//! Exposes user creation, lookup and listing, plus health probes and
//! Swagger UI.

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
