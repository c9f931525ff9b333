//! Context table store: per-phase conditional bit counts.
//!
//! For each phase (even/odd) two counter arrays of `2^N` slots record how often
//! a 0 or a 1 followed every N-bit history. The most recent bit is the least
//! significant bit of the index.
//!
//! Counters never reach past [`MAX_COUNT`]: the increment that lands a slot on
//! the ceiling halves *all four* arrays (flooring), which keeps relative
//! frequencies while biasing the model toward recent behavior.

use serde::Serialize;

use crate::error::{HealthError, Result};

/// Largest supported context width.
pub const MAX_CONTEXT_BITS: u8 = 30;

/// Slot ceiling. Reaching it triggers a store-wide rescale.
pub const MAX_COUNT: u16 = 1 << 14;

/// One of the two interleaved sub-streams of the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Even,
    Odd,
}

impl Phase {
    pub fn from_even_flag(even: bool) -> Self {
        if even { Self::Even } else { Self::Odd }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Even => write!(f, "even"),
            Self::Odd => write!(f, "odd"),
        }
    }
}

/// Observed outcome counts for one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub zeros: u32,
    pub ones: u32,
}

impl Counts {
    pub fn total(&self) -> u32 {
        self.zeros + self.ones
    }

    /// Count matching `bit`.
    pub fn of(&self, bit: bool) -> u32 {
        if bit { self.ones } else { self.zeros }
    }
}

/// N-bit shift register of recently produced bits, used as the table index.
#[derive(Debug, Clone)]
pub struct RollingContext {
    bits: u32,
    mask: u32,
}

impl RollingContext {
    pub fn new(context_bits: u8) -> Self {
        Self {
            bits: 0,
            mask: slot_count(context_bits) as u32 - 1,
        }
    }

    /// Shift `bit` in as the newest (least significant) bit, dropping the oldest.
    pub fn push(&mut self, bit: bool) {
        self.bits = ((self.bits << 1) & self.mask) | u32::from(bit);
    }

    pub fn index(&self) -> usize {
        self.bits as usize
    }
}

#[derive(Debug)]
struct PhaseTable {
    zeros: Vec<u16>,
    ones: Vec<u16>,
}

impl PhaseTable {
    fn try_new(slots: usize) -> Result<Self> {
        Ok(Self {
            zeros: zeroed(slots)?,
            ones: zeroed(slots)?,
        })
    }

    fn halve(&mut self) {
        for c in self.zeros.iter_mut().chain(self.ones.iter_mut()) {
            *c >>= 1;
        }
    }
}

/// Fallibly allocate a zeroed counter array.
///
/// Only the reservation is fallible. Zero-filling touches every page, so on
/// a system that overcommits memory a large store (up to 8 GiB of counters
/// at the maximum width) can pass the reservation and still be killed by
/// the OOM killer while it is filled, instead of returning
/// [`HealthError::Allocation`].
fn zeroed(slots: usize) -> Result<Vec<u16>> {
    let mut v = Vec::new();
    v.try_reserve_exact(slots)
        .map_err(|source| HealthError::Allocation { slots, source })?;
    v.resize(slots, 0);
    Ok(v)
}

fn slot_count(context_bits: u8) -> usize {
    1usize << context_bits
}

/// Four parallel counter arrays: zeros/ones for the even and odd phase.
#[derive(Debug)]
pub struct ContextTables {
    context_bits: u8,
    even: PhaseTable,
    odd: PhaseTable,
    rescales: u64,
}

impl ContextTables {
    /// Allocate all four arrays. Fails without leaving anything allocated
    /// when the width is out of range or memory cannot be reserved.
    pub fn new(context_bits: u8) -> Result<Self> {
        if context_bits == 0 || context_bits > MAX_CONTEXT_BITS {
            return Err(HealthError::InvalidContextWidth { bits: context_bits });
        }
        let slots = slot_count(context_bits);
        Ok(Self {
            context_bits,
            even: PhaseTable::try_new(slots)?,
            odd: PhaseTable::try_new(slots)?,
            rescales: 0,
        })
    }

    /// Number of slots in each of the four arrays.
    pub fn slots_per_table(&self) -> usize {
        slot_count(self.context_bits)
    }

    /// Total store-wide rescales since allocation.
    pub fn rescales(&self) -> u64 {
        self.rescales
    }

    fn table(&self, phase: Phase) -> &PhaseTable {
        match phase {
            Phase::Even => &self.even,
            Phase::Odd => &self.odd,
        }
    }

    /// Predicted distribution of the next bit for `phase` after `context`.
    pub fn lookup(&self, phase: Phase, context: usize) -> Counts {
        let t = self.table(phase);
        Counts {
            zeros: u32::from(t.zeros[context]),
            ones: u32::from(t.ones[context]),
        }
    }

    /// Count one observation of `bit` after `context`. Returns true when the
    /// increment hit [`MAX_COUNT`] and the whole store was halved.
    pub fn record(&mut self, phase: Phase, context: usize, bit: bool) -> bool {
        let t = match phase {
            Phase::Even => &mut self.even,
            Phase::Odd => &mut self.odd,
        };
        let slot = if bit {
            &mut t.ones[context]
        } else {
            &mut t.zeros[context]
        };
        *slot += 1;
        if *slot < MAX_COUNT {
            return false;
        }
        self.rescale();
        log::debug!(
            "context store rescaled ({phase} context {context:#x} reached {MAX_COUNT})"
        );
        true
    }

    /// Halve every slot of all four arrays.
    pub fn rescale(&mut self) {
        self.even.halve();
        self.odd.halve();
        self.rescales += 1;
    }

    /// Probability of guessing the next bit by majority vote when only the
    /// most recent `bits` context bits are known. `None` before any data or
    /// when `bits` is not in `1..=N`.
    pub fn prediction_accuracy(&self, phase: Phase, bits: u8) -> Option<f64> {
        if bits == 0 || bits > self.context_bits {
            return None;
        }
        let t = self.table(phase);
        let low = slot_count(bits);
        let mut right = 0u64;
        let mut guesses = 0u64;
        for i in 0..low {
            let (mut zeros, mut ones) = (0u64, 0u64);
            for pos in (i..self.slots_per_table()).step_by(low) {
                zeros += u64::from(t.zeros[pos]);
                ones += u64::from(t.ones[pos]);
            }
            right += zeros.max(ones);
            guesses += zeros + ones;
        }
        if guesses == 0 {
            return None;
        }
        Some(right as f64 / guesses as f64)
    }

    /// Every slot of the store, in context order.
    pub fn slots(&self) -> impl Iterator<Item = SlotDump> + '_ {
        (0..self.slots_per_table()).map(move |context| SlotDump {
            context,
            even: self.lookup(Phase::Even, context),
            odd: self.lookup(Phase::Odd, context),
        })
    }
}

/// Snapshot of one context across both phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotDump {
    pub context: usize,
    pub even: Counts,
    pub odd: Counts,
}

impl std::fmt::Display for SlotDump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:x} onesEven:{} zerosEven:{} onesOdd:{} zerosOdd:{}",
            self.context, self.even.ones, self.even.zeros, self.odd.ones, self.odd.zeros
        )
    }
}
