//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod app_settings;
pub mod bus;
pub mod clock;
pub mod in_memory;
pub mod outbound;
pub mod ports;
