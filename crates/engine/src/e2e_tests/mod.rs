//! End-to-end tests running a whole cluster in one process.
//!
//! Every engine of a small topology is wired through [`crate::app::Cluster`]
//! with its real bus endpoint, listener and background tasks; only the
//! session transport is replaced by a recording sink.
//!
//! ```bash
//! cargo test -p mudmesh-engine --lib e2e_tests
//! ```

mod e2e_helpers;

pub use e2e_helpers::*;
