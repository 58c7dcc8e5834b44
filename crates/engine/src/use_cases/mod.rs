//! Use cases - protocol and gameplay orchestration.
//!
//! Each module coordinates ports and stores for one concern.

pub mod handoff;
pub mod maintenance;
pub mod movement;
pub mod scaling;

pub use handoff::{HandoffManager, HandoffResult};
pub use maintenance::{ReportZoneLoad, SweepExpiredHandoffs};
pub use movement::MovePlayer;
pub use scaling::{run_scaler, ThresholdInstanceScaler};
