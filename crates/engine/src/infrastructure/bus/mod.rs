//! Inter-engine bus implementations.

mod distributed;
mod in_process;
mod local_pubsub;
mod signing;

pub use distributed::{engine_channel, DistributedBus};
pub use in_process::{InProcessBus, LocalBusHub};
pub use local_pubsub::LocalPubSub;
pub use signing::{EnvelopeSigner, SigningError};
