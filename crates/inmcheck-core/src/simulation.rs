//! Software model of the infinite noise multiplier, for offline validation.
//!
//! The circuit repeatedly multiplies an analog value by the gain `K` and folds
//! it back into `[0, 1]`, emitting the comparator decision at each step. A
//! small amount of injected noise is amplified until it dominates the state,
//! which is where the `log2(K)` bits per step come from.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default noise amplitude injected per step.
pub const DEFAULT_NOISE_AMPLITUDE: f64 = 1.0 / (1 << 10) as f64;

/// Outputs discarded after seeding, before the state has mixed.
const WARMUP_STEPS: usize = 32;

/// Seeded chaotic-map simulation of the multiplier.
#[derive(Debug, Clone)]
pub struct MultiplierModel {
    gain: f64,
    noise_amplitude: f64,
    state: f64,
    rng: StdRng,
}

impl MultiplierModel {
    pub fn new(gain: f64, noise_amplitude: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let state = rng.random::<f64>();
        let mut model = Self {
            gain,
            noise_amplitude,
            state,
            rng,
        };
        for _ in 0..WARMUP_STEPS {
            model.next_bit();
        }
        model
    }

    /// Advance the map one step and return the comparator output.
    pub fn next_bit(&mut self) -> bool {
        let noise = self.noise_amplitude * (self.rng.random::<f64>() - 0.5);
        let k = self.gain;
        let mut a = self.state.clamp(0.0, 1.0) + noise;
        if a > 0.5 {
            self.state = k * a - (k - 1.0);
            return true;
        }
        a += noise;
        self.state = k * a;
        false
    }
}

impl Iterator for MultiplierModel {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        Some(self.next_bit())
    }
}

/// One call's worth of driver input: both phase values and which one is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub even: bool,
    pub odd: bool,
    pub even_phase: bool,
}

impl RawSample {
    /// The value of the live phase.
    pub fn live(&self) -> bool {
        if self.even_phase { self.even } else { self.odd }
    }
}

/// Splits a single bit stream into alternating even/odd samples, carrying the
/// opposite phase's last value forward the way the hardware driver does.
#[derive(Debug, Clone)]
pub struct PhaseInterleaver {
    next_even: bool,
    even: bool,
    odd: bool,
}

impl Default for PhaseInterleaver {
    fn default() -> Self {
        Self {
            next_even: true,
            even: false,
            odd: false,
        }
    }
}

impl PhaseInterleaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bit: bool) -> RawSample {
        let even_phase = self.next_even;
        if even_phase {
            self.even = bit;
        } else {
            self.odd = bit;
        }
        self.next_even = !even_phase;
        RawSample {
            even: self.even,
            odd: self.odd,
            even_phase,
        }
    }

    /// Interleave a whole stream.
    pub fn interleave<I>(bits: I) -> impl Iterator<Item = RawSample>
    where
        I: IntoIterator<Item = bool>,
    {
        let mut il = Self::new();
        bits.into_iter().map(move |bit| il.push(bit))
    }
}
