//! # Roster Core
//!
//! Core types, traits, and error definitions for Roster.
//! This crate provides the foundational abstractions shared by the
//! store, cache, service, and transport layers.

pub mod domain;
pub mod error;
pub mod id;
pub mod result;
pub mod traits;

pub use domain::*;
pub use error::*;
pub use id::*;
pub use result::*;
pub use traits::*;

// Re-export shaku's interface bound for injected components
pub use shaku::Interface;
