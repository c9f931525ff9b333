//! Probability accountant.
//!
//! Keeps the likelihood of the sequence observed since the last
//! renormalization under the adaptive context model. Every time the running
//! probability drops to 0.5 or below it is doubled and one bit of entropy is
//! counted: after `n` doublings the sequence had probability about `2^-n`.

use crate::context::Counts;

/// Sampled-bit count at which the lifetime counters are halved.
pub const INM_MIN_DATA: u32 = 80_000;

#[derive(Debug, Clone)]
pub struct ProbabilityAccountant {
    current_probability: f64,
    entropy_bits: u32,
    sampled_bits: u32,
}

impl Default for ProbabilityAccountant {
    fn default() -> Self {
        Self {
            current_probability: 1.0,
            entropy_bits: 0,
            sampled_bits: 0,
        }
    }
}

impl ProbabilityAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the running likelihood and return the number
    /// of entropy bits it collapsed.
    ///
    /// An outcome never seen before in this context carries no measurable
    /// information and leaves the likelihood alone.
    pub fn ingest(&mut self, predicted: Counts, bit: bool) -> u32 {
        self.ingest_with(predicted, bit, |_| {})
    }

    /// Like [`ingest`](Self::ingest), calling `on_credit` after each collapse
    /// with the lifetime counters already including that bit.
    pub fn ingest_with(
        &mut self,
        predicted: Counts,
        bit: bool,
        mut on_credit: impl FnMut(&Self),
    ) -> u32 {
        let matching = predicted.of(bit);
        if matching != 0 {
            self.current_probability *= f64::from(matching) / f64::from(predicted.total());
        }
        let mut credited = 0;
        while self.current_probability <= 0.5 {
            self.current_probability *= 2.0;
            self.entropy_bits += 1;
            credited += 1;
            on_credit(self);
        }
        self.sampled_bits += 1;
        credited
    }

    /// Halve the lifetime entropy and sample counts once the sample count
    /// reaches [`INM_MIN_DATA`]. Their ratio survives; older history fades.
    pub fn halve_if_due(&mut self) -> bool {
        if self.sampled_bits < INM_MIN_DATA {
            return false;
        }
        self.entropy_bits >>= 1;
        self.sampled_bits >>= 1;
        true
    }

    pub fn current_probability(&self) -> f64 {
        self.current_probability
    }

    pub fn entropy_bits(&self) -> u32 {
        self.entropy_bits
    }

    pub fn sampled_bits(&self) -> u32 {
        self.sampled_bits
    }

    /// Measured entropy per sampled bit; 0.0 before the first sample.
    pub fn entropy_per_bit(&self) -> f64 {
        if self.sampled_bits == 0 {
            return 0.0;
        }
        f64::from(self.entropy_bits) / f64::from(self.sampled_bits)
    }

    /// The gain that would produce the measured entropy rate.
    pub fn estimate_k(&self) -> f64 {
        2f64.powf(self.entropy_per_bit())
    }
}
