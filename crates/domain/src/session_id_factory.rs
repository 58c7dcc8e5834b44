//! Session identifier allocation.
//!
//! Ids pack three fields into a positive `i64`:
//!
//! ```text
//! | 0 | gateway (15 bits) | seconds since 2024-01-01 (32 bits) | sequence (16 bits) |
//! ```
//!
//! The gateway prefix makes ids from different gateways disjoint; the
//! timestamp and sequence make them unique within one gateway. When more than
//! 65536 ids are requested in one second the factory borrows the next second
//! rather than waiting.
//!
//! Gateways own a factory each and number new connections with it; engines
//! only ever receive the resulting ids.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DomainError;
use crate::ids::{GatewayId, SessionId};

pub(crate) const GATEWAY_SHIFT: u32 = 48;
pub(crate) const GATEWAY_MASK: i64 = 0x7FFF;
const TIMESTAMP_SHIFT: u32 = 16;
const TIMESTAMP_MASK: u64 = 0xFFFF_FFFF;
const SEQUENCE_MASK: u64 = 0xFFFF;

/// 2024-01-01T00:00:00Z, in seconds since the Unix epoch.
const EPOCH_OFFSET_SECS: i64 = 1_704_067_200;

/// Largest gateway id that still fits the id layout.
pub const MAX_GATEWAY_ID: u16 = GATEWAY_MASK as u16;

/// Allocates globally unique [`SessionId`]s for one gateway.
///
/// Lock-free; safe to share across tasks.
#[derive(Debug)]
pub struct SessionIdFactory {
    gateway: GatewayId,
    // (logical second << 16) | sequence of the last id handed out
    last: AtomicU64,
}

impl SessionIdFactory {
    pub fn new(gateway: GatewayId) -> Result<Self, DomainError> {
        if gateway.as_u16() > MAX_GATEWAY_ID {
            return Err(DomainError::validation(format!(
                "gateway id {gateway} exceeds maximum {MAX_GATEWAY_ID}"
            )));
        }
        Ok(Self {
            gateway,
            last: AtomicU64::new(0),
        })
    }

    pub fn gateway(&self) -> GatewayId {
        self.gateway
    }

    /// Allocate the next id, using `now_epoch_ms` as the time source.
    ///
    /// A clock that moves backwards never produces a duplicate: the factory
    /// keeps counting from the last second it handed out.
    pub fn next_id(&self, now_epoch_ms: i64) -> SessionId {
        let now_secs = (now_epoch_ms.div_euclid(1000) - EPOCH_OFFSET_SECS).max(0) as u64;

        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let prev_secs = prev >> TIMESTAMP_SHIFT;
            let prev_seq = prev & SEQUENCE_MASK;

            let (secs, seq) = if now_secs > prev_secs {
                (now_secs, 0)
            } else if prev_seq == SEQUENCE_MASK {
                (prev_secs + 1, 0)
            } else {
                (prev_secs, prev_seq + 1)
            };

            let next = (secs << TIMESTAMP_SHIFT) | seq;
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return self.compose(secs, seq),
                Err(actual) => prev = actual,
            }
        }
    }

    fn compose(&self, secs: u64, seq: u64) -> SessionId {
        let gateway = i64::from(self.gateway.as_u16()) & GATEWAY_MASK;
        let stamp = ((secs & TIMESTAMP_MASK) << TIMESTAMP_SHIFT) | (seq & SEQUENCE_MASK);
        SessionId::new((gateway << GATEWAY_SHIFT) | stamp as i64)
    }
}
