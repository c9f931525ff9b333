//! Run-length guard: a stuck or saturated source shows up as a long run of
//! identical output bits.

/// Longest tolerated run of identical bits.
pub const MAX_SEQUENCE: u32 = 20;

/// Sampled bits that must pass before the guard arms.
pub const WARMUP_BITS: u32 = 100;

/// A run that exceeded [`MAX_SEQUENCE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunFault {
    pub bit: bool,
    pub run: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RunLengthGuard {
    sequential_zeros: u32,
    sequential_ones: u32,
}

impl RunLengthGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the current run with `bit`. Errors on the bit that makes the
    /// run longer than [`MAX_SEQUENCE`].
    pub fn observe(&mut self, bit: bool) -> Result<(), RunFault> {
        let run = if bit {
            self.sequential_zeros = 0;
            self.sequential_ones += 1;
            self.sequential_ones
        } else {
            self.sequential_ones = 0;
            self.sequential_zeros += 1;
            self.sequential_zeros
        };
        if run > MAX_SEQUENCE {
            return Err(RunFault { bit, run });
        }
        Ok(())
    }

    /// Length of the run in progress and the bit it repeats.
    pub fn current(&self) -> Option<(bool, u32)> {
        if self.sequential_ones > 0 {
            Some((true, self.sequential_ones))
        } else if self.sequential_zeros > 0 {
            Some((false, self.sequential_zeros))
        } else {
            None
        }
    }
}
