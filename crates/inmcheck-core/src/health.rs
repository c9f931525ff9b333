//! Health evaluator.
//!
//! A multiplier with gain `K` produces `log2(K)` bits of entropy per output
//! bit. The evaluator accepts the stream only when the measured rate is within
//! [`ACCURACY`] of that figure, in both directions: too little entropy means a
//! degraded source, too much means the device is not behaving as modeled.

use crate::accountant::INM_MIN_DATA;

/// Multiplicative tolerance between measured and theoretical entropy.
pub const ACCURACY: f64 = 1.02;

#[derive(Debug, Clone, Copy)]
pub struct HealthEvaluator {
    expected_entropy_per_bit: f64,
}

impl HealthEvaluator {
    pub fn new(gain: f64) -> Self {
        Self {
            expected_entropy_per_bit: gain.log2(),
        }
    }

    /// Theoretical entropy per output bit, `log2(K)`.
    pub fn expected_entropy_per_bit(&self) -> f64 {
        self.expected_entropy_per_bit
    }

    /// Ok-to-use verdict for a stream of `total_bits` whose measured entropy
    /// rate is `entropy_per_bit`. Always false before [`INM_MIN_DATA`] bits.
    pub fn verdict(&self, total_bits: u64, entropy_per_bit: f64) -> bool {
        total_bits >= u64::from(INM_MIN_DATA)
            && entropy_per_bit * ACCURACY >= self.expected_entropy_per_bit
            && entropy_per_bit / ACCURACY <= self.expected_entropy_per_bit
    }

    /// Batch audit: is `claimed` bits of entropy over `num_bits` output bits
    /// plausible for this gain? The theoretical amount is truncated to whole
    /// bits before comparing.
    pub fn entropy_on_target(&self, claimed: u32, num_bits: u32) -> bool {
        let expected = (f64::from(num_bits) * self.expected_entropy_per_bit) as u64;
        (expected as f64) < f64::from(claimed) * ACCURACY
    }
}
