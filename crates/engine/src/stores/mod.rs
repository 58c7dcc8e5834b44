//! In-memory state storage modules.
//!
//! Stores hold runtime state shared across use cases:
//! - `ZoneRegistry` - zone ownership and reported zone load

pub mod zone_registry;

pub use zone_registry::{TopologyError, ZoneRegistry};
