//! mudmesh Engine library.
//!
//! Zone ownership, instance scaling and live player handoff between engines.
//!
//! ## Structure
//!
//! - `stores/` - In-memory runtime state (zone registry)
//! - `use_cases/` - Handoff, movement, scaling and maintenance orchestration
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - Inter-engine bus entry point
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

/// Test fixtures module for integration testing.
#[cfg(test)]
pub mod test_fixtures;

/// End-to-end tests running several engines in one process.
#[cfg(test)]
mod e2e_tests;

pub use app::{AppError, Cluster, EngineNode};
