//! Entropy ledger: health-checked entropy bits waiting for the consumer.
//!
//! The producer (the thread calling `add_bit`) credits the ledger; a consumer
//! thread reads and drains it. All access goes through one atomic so the
//! ledger can be shared behind an `Arc` without a lock.
//!
//! A consumer that reads [`EntropyLedger::level`] and later calls
//! [`EntropyLedger::clear`] loses whatever the producer credited in between.
//! Use [`EntropyLedger::take`] when the level that was read must be exactly the
//! level that was removed.

use std::sync::atomic::{AtomicU32, Ordering};

/// Ledger capacity in bits. Matches the absorption width of a Keccak-f[1600]
/// sponge downstream.
pub const MAX_ENTROPY: u32 = 1600;

#[derive(Debug, Default)]
pub struct EntropyLedger {
    level: AtomicU32,
}

impl EntropyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one bit of credit, saturating at [`MAX_ENTROPY`]. Returns whether
    /// the credit was taken.
    pub fn credit(&self) -> bool {
        self.level
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |level| {
                (level < MAX_ENTROPY).then_some(level + 1)
            })
            .is_ok()
    }

    /// Current credited level, `0..=MAX_ENTROPY`.
    pub fn level(&self) -> u32 {
        self.level.load(Ordering::Acquire)
    }

    /// Reset the ledger to zero, whatever its level.
    pub fn clear(&self) {
        self.level.store(0, Ordering::Release);
    }

    /// Read and zero the ledger in one step.
    pub fn take(&self) -> u32 {
        self.level.swap(0, Ordering::AcqRel)
    }
}
