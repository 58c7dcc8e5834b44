//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Local player/item registries (could swap in-memory -> persistent)
//! - Inter-engine transport (in-process, pub/sub)
//! - The gateway-facing outbound sink
//! - Scale actuation (process management lives outside this crate)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;
pub mod types;

// =============================================================================
// Registry Ports
// =============================================================================
pub use repos::{ItemRepo, PlayerRepo};

// =============================================================================
// External Boundary Ports
// =============================================================================
pub use external::{InterEngineBus, OutboundPort, PubSubTransport, ScaleActuator};

pub use types::OutboundEvent;

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockItemRepo, MockPlayerRepo};

#[cfg(test)]
pub use external::{MockInterEngineBus, MockOutboundPort, MockScaleActuator};

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{BusError, RepoError, ScaleError};
