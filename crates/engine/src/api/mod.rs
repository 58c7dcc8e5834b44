//! API layer - entry points into the engine.

pub mod bus_listener;

pub use bus_listener::BusListener;
