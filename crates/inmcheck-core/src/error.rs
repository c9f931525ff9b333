//! Error type shared by every health-check component.
//!
//! Only [`HealthError::RunLengthExceeded`] can happen after start-up. Health
//! degradation is not an error: it withholds entropy credit and clears itself
//! once the stream is back within tolerance.

use std::collections::TryReserveError;

use crate::context::MAX_CONTEXT_BITS;
use crate::run_length::{MAX_SEQUENCE, RunFault};

pub type Result<T> = std::result::Result<T, HealthError>;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("context width {bits} outside 1..={max}", max = MAX_CONTEXT_BITS)]
    InvalidContextWidth { bits: u8 },

    #[error("gain {gain} must be finite and greater than 1.0")]
    InvalidGain { gain: f64 },

    #[error("status interval {bits} must be a non-zero power of two")]
    InvalidStatusInterval { bits: u64 },

    #[error("could not allocate {slots} counter slots: {source}")]
    Allocation {
        slots: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("run of {run} consecutive {bit}'s exceeds the maximum of {max}", max = MAX_SEQUENCE)]
    RunLengthExceeded { bit: u8, run: u32 },
}

impl HealthError {
    /// True for a catastrophic signal fault. The source must be treated as
    /// broken; no entropy may be credited from it afterwards.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RunLengthExceeded { .. })
    }
}

impl From<RunFault> for HealthError {
    fn from(fault: RunFault) -> Self {
        Self::RunLengthExceeded {
            bit: u8::from(fault.bit),
            run: fault.run,
        }
    }
}

impl From<serde_json::Error> for HealthError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}
