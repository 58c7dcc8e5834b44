//! mudmesh domain types.
//!
//! Value types shared by every engine: identifiers, topology, player and item
//! state, and scaling intents. No I/O and no runtime dependencies.

pub mod error;
pub mod ids;
pub mod item;
pub mod player;
pub mod scaling;
pub mod session_id_factory;
pub mod topology;

pub use error::DomainError;
pub use ids::{EngineId, GatewayId, RoomId, SessionId};
pub use item::{Item, ItemSlot};
pub use player::{PlayerId, PlayerState};
pub use scaling::ScaleDecision;
pub use session_id_factory::{SessionIdFactory, MAX_GATEWAY_ID};
pub use topology::{EngineAddress, ZoneAssignment, ZoneInstance, ZoneMode};
