//! Monitor configuration, fixed for the lifetime of a [`HealthMonitor`].
//!
//! [`HealthMonitor`]: crate::monitor::HealthMonitor

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::MAX_CONTEXT_BITS;
use crate::error::{HealthError, Result};

/// Default diagnostic cadence: one status report every 2^20 bits.
pub const DEFAULT_STATUS_INTERVAL_BITS: u64 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Number of previous bits used to predict the next one (N).
    pub context_bits: u8,
    /// Multiplier gain (K). Theory requires 1 < K < 2.
    pub gain: f64,
    /// Emit periodic status reports.
    pub debug: bool,
    /// Bits between status reports. Must be a power of two.
    pub status_interval_bits: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            context_bits: 14,
            gain: 1.82,
            debug: false,
            status_interval_bits: DEFAULT_STATUS_INTERVAL_BITS,
        }
    }
}

impl HealthConfig {
    pub fn new(context_bits: u8, gain: f64, debug: bool) -> Self {
        Self {
            context_bits,
            gain,
            debug,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.context_bits == 0 || self.context_bits > MAX_CONTEXT_BITS {
            return Err(HealthError::InvalidContextWidth {
                bits: self.context_bits,
            });
        }
        if !self.gain.is_finite() || self.gain <= 1.0 {
            return Err(HealthError::InvalidGain { gain: self.gain });
        }
        if !self.status_interval_bits.is_power_of_two() {
            return Err(HealthError::InvalidStatusInterval {
                bits: self.status_interval_bits,
            });
        }
        if self.gain >= 2.0 {
            log::warn!(
                "gain {} is outside the multiplier's theoretical range (1, 2)",
                self.gain
            );
        }
        Ok(())
    }

    /// Theoretical entropy per output bit.
    pub fn expected_entropy_per_bit(&self) -> f64 {
        self.gain.log2()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| HealthError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }
}
