//! mudmesh Shared - wire contract between engine processes
//!
//! This crate contains the types one engine sends another:
//! - `InterEngineMessage` and its two payloads (`PlayerHandoff`, `HandoffAck`)
//! - Flattened player/item snapshots carried by a handoff
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde and the domain vocabulary
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Closed message set** - receivers match exhaustively

pub mod inter_engine;
pub mod serialized;

pub use inter_engine::{HandoffAck, InterEngineMessage, PlayerHandoff};
pub use serialized::{SerializedItem, SerializedPlayerState};
