//! The health monitor: one owned instance per noise source.
//!
//! The driver calls [`HealthMonitor::add_bit`] once per clock edge. Each call
//! runs the whole pipeline in a fixed order:
//!
//! 1. misfire counters for both raw phase values
//! 2. output bit = the live phase's value
//! 3. run-length guard (armed after the warm-up)
//! 4. rolling context shifts in the *previous* output bit
//! 5. table lookup for the current phase/context, fed to the accountant;
//!    collapses are credited to the ledger while the verdict is ok
//! 6. the observed bit is recorded into the tables (may rescale them)
//! 7. scheduled halving of the lifetime counters
//!
//! The per-bit path does not allocate, block or log outside rare events. The
//! ledger is the only state meant for another thread; get a handle to it with
//! [`HealthMonitor::ledger`].

use std::sync::Arc;

use crate::accountant::{INM_MIN_DATA, ProbabilityAccountant};
use crate::config::HealthConfig;
use crate::context::{ContextTables, Phase, RollingContext};
use crate::diagnostics::{HealthSnapshot, LogObserver, StatusObserver, percent};
use crate::error::{HealthError, Result};
use crate::health::HealthEvaluator;
use crate::ledger::EntropyLedger;
use crate::run_length::{RunFault, RunLengthGuard, WARMUP_BITS};
use crate::simulation::RawSample;

pub struct HealthMonitor {
    config: HealthConfig,
    tables: ContextTables,
    context: RollingContext,
    guard: RunLengthGuard,
    accountant: ProbabilityAccountant,
    health: HealthEvaluator,
    ledger: Arc<EntropyLedger>,
    observer: Option<Box<dyn StatusObserver>>,
    prev_bit: bool,
    prev_even: bool,
    prev_odd: bool,
    total_bits: u64,
    total_ones: u32,
    total_zeros: u32,
    even_misfires: u32,
    odd_misfires: u32,
    fault: Option<RunFault>,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("total_bits", &self.total_bits)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    /// Validate `config` and allocate the context tables. Nothing stays
    /// allocated when this fails.
    pub fn start(config: HealthConfig) -> Result<Self> {
        config.validate()?;
        let tables = ContextTables::new(config.context_bits)?;
        let health = HealthEvaluator::new(config.gain);
        log::info!(
            "health check started: N={} K={} expected entropy/bit {:.4}, {} slots per table",
            config.context_bits,
            config.gain,
            config.expected_entropy_per_bit(),
            tables.slots_per_table()
        );
        let observer: Option<Box<dyn StatusObserver>> = if config.debug {
            Some(Box::new(LogObserver))
        } else {
            None
        };
        Ok(Self {
            context: RollingContext::new(config.context_bits),
            config,
            tables,
            guard: RunLengthGuard::new(),
            accountant: ProbabilityAccountant::new(),
            health,
            ledger: Arc::new(EntropyLedger::new()),
            observer,
            prev_bit: false,
            prev_even: false,
            prev_odd: false,
            total_bits: 0,
            total_ones: 0,
            total_zeros: 0,
            even_misfires: 0,
            odd_misfires: 0,
            fault: None,
        })
    }

    /// Replace the status observer. Reports are made every
    /// `status_interval_bits` bits whether or not `debug` is set.
    pub fn with_observer(mut self, observer: impl StatusObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Release the tables and return the final statistics.
    pub fn stop(self) -> HealthSnapshot {
        let snapshot = self.snapshot();
        log::info!(
            "health check stopped after {} bits ({})",
            snapshot.total_bits,
            if snapshot.faulted { "faulted" } else { "clean" }
        );
        snapshot
    }

    /// Ingest one sample from the driver. `even_phase` selects which of the
    /// two raw values is live; the other is the carry-over from the previous
    /// opposite-phase sample.
    ///
    /// Fails with [`HealthError::RunLengthExceeded`] on the bit that makes a
    /// run too long, and on every call after it.
    pub fn add_bit(&mut self, even_bit: bool, odd_bit: bool, even_phase: bool) -> Result<()> {
        if let Some(fault) = self.fault {
            return Err(fault.into());
        }

        if even_bit != self.prev_even {
            self.even_misfires += 1;
        }
        if odd_bit != self.prev_odd {
            self.odd_misfires += 1;
        }
        self.prev_even = even_bit;
        self.prev_odd = odd_bit;

        let phase = Phase::from_even_flag(even_phase);
        let bit = if even_phase { even_bit } else { odd_bit };
        self.total_bits += 1;

        if self.accountant.sampled_bits() > WARMUP_BITS {
            if bit {
                self.total_ones += 1;
            } else {
                self.total_zeros += 1;
            }
            if let Err(fault) = self.guard.observe(bit) {
                return Err(self.trip(fault));
            }
        }

        self.context.push(self.prev_bit);
        self.prev_bit = bit;
        let context = self.context.index();

        let predicted = self.tables.lookup(phase, context);
        let total_bits = self.total_bits;
        let health = &self.health;
        let ledger = &self.ledger;
        self.accountant.ingest_with(predicted, bit, |acc| {
            if health.verdict(total_bits, acc.entropy_per_bit()) {
                ledger.credit();
            }
        });

        self.tables.record(phase, context, bit);
        self.scale_counters();
        self.report_if_due();
        Ok(())
    }

    /// [`add_bit`](Self::add_bit) for an interleaved sample.
    pub fn add_sample(&mut self, sample: RawSample) -> Result<()> {
        self.add_bit(sample.even, sample.odd, sample.even_phase)
    }

    fn trip(&mut self, fault: RunFault) -> HealthError {
        self.fault = Some(fault);
        let withdrawn = self.ledger.take();
        log::error!(
            "maximum sequence of {} {}'s exceeded after {} bits; {withdrawn} credited bits withdrawn",
            crate::run_length::MAX_SEQUENCE,
            u8::from(fault.bit),
            self.total_bits
        );
        fault.into()
    }

    fn scale_counters(&mut self) {
        if self.accountant.halve_if_due() {
            self.even_misfires >>= 1;
            self.odd_misfires >>= 1;
            log::debug!(
                "entropy counters halved at {} bits (rate {:.4})",
                self.total_bits,
                self.accountant.entropy_per_bit()
            );
        }
        if self.total_ones.max(self.total_zeros) >= INM_MIN_DATA {
            self.total_ones >>= 1;
            self.total_zeros >>= 1;
        }
    }

    fn report_if_due(&mut self) {
        if self.observer.is_none()
            || self.total_bits & (self.config.status_interval_bits - 1) != 0
        {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(observer) = self.observer.as_mut() {
            observer.on_status(&snapshot);
        }
    }

    /// True when the measured entropy rate matches the gain closely enough to
    /// credit entropy. Always false after a run-length fault.
    pub fn ok_to_use_data(&self) -> bool {
        self.fault.is_none()
            && self
                .health
                .verdict(self.total_bits, self.accountant.entropy_per_bit())
    }

    /// Batch audit: is `claimed` bits of entropy plausible for `num_bits`
    /// output bits at the configured gain?
    pub fn entropy_on_target(&self, claimed: u32, num_bits: u32) -> bool {
        self.health.entropy_on_target(claimed, num_bits)
    }

    /// Credited, health-checked entropy bits available to the consumer.
    pub fn entropy_level(&self) -> u32 {
        self.ledger.level()
    }

    /// Zero the ledger. Takes no amount: everything credited so far is gone.
    pub fn clear_entropy_level(&self) {
        self.ledger.clear();
    }

    /// Shared handle for a consumer running on another thread.
    pub fn ledger(&self) -> Arc<EntropyLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn estimate_entropy_per_bit(&self) -> f64 {
        self.accountant.entropy_per_bit()
    }

    pub fn estimate_k(&self) -> f64 {
        self.accountant.estimate_k()
    }

    pub fn fault(&self) -> Option<RunFault> {
        self.fault
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn tables(&self) -> &ContextTables {
        &self.tables
    }

    pub fn total_bits(&self) -> u64 {
        self.total_bits
    }

    /// Prediction accuracy for every context depth `1..=N`.
    pub fn prediction_profile(&self, phase: Phase) -> Vec<(u8, f64)> {
        (1..=self.config.context_bits)
            .filter_map(|bits| {
                self.tables
                    .prediction_accuracy(phase, bits)
                    .map(|acc| (bits, acc))
            })
            .collect()
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let sampled = u64::from(self.accountant.sampled_bits());
        HealthSnapshot {
            total_bits: self.total_bits,
            sampled_bits: self.accountant.sampled_bits(),
            entropy_bits: self.accountant.entropy_bits(),
            ok_to_use_data: self.ok_to_use_data(),
            entropy_per_bit: self.accountant.entropy_per_bit(),
            estimated_k: self.accountant.estimate_k(),
            expected_entropy_per_bit: self.health.expected_entropy_per_bit(),
            ones_percent: percent(
                self.total_ones,
                u64::from(self.total_ones) + u64::from(self.total_zeros),
            ),
            even_misfire_percent: percent(self.even_misfires, sampled),
            odd_misfire_percent: percent(self.odd_misfires, sampled),
            entropy_level: self.ledger.level(),
            table_rescales: self.tables.rescales(),
            faulted: self.fault.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MAX_COUNT;
    use crate::ledger::MAX_ENTROPY;
    use crate::run_length::MAX_SEQUENCE;
    use crate::simulation::PhaseInterleaver;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Seeded source emitting 1 with probability `p_one`. Runs are capped at
    /// 16 so the guard stays quiet on long streams.
    struct CappedSource {
        rng: StdRng,
        p_one: f64,
        last: Option<bool>,
        run: u32,
    }

    impl CappedSource {
        fn new(seed: u64, p_one: f64) -> Self {
            Self {
                rng: StdRng::seed_from_u64(seed),
                p_one,
                last: None,
                run: 0,
            }
        }
    }

    impl Iterator for CappedSource {
        type Item = bool;

        fn next(&mut self) -> Option<bool> {
            let mut bit = self.rng.random_bool(self.p_one);
            if self.last == Some(bit) && self.run >= 16 {
                bit = !bit;
            }
            if self.last == Some(bit) {
                self.run += 1;
            } else {
                self.last = Some(bit);
                self.run = 1;
            }
            Some(bit)
        }
    }

    fn monitor(context_bits: u8, gain: f64) -> HealthMonitor {
        HealthMonitor::start(HealthConfig::new(context_bits, gain, false)).unwrap()
    }

    fn feed(m: &mut HealthMonitor, bits: impl IntoIterator<Item = bool>) -> Result<()> {
        PhaseInterleaver::interleave(bits).try_for_each(|s| m.add_sample(s))
    }

    fn alternating(n: usize) -> impl Iterator<Item = bool> {
        (0..n).map(|i| i % 2 == 1)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn test_start_rejects_bad_width() {
        for bits in [0, 31] {
            let err = HealthMonitor::start(HealthConfig::new(bits, 1.82, false)).unwrap_err();
            assert!(matches!(err, HealthError::InvalidContextWidth { .. }));
        }
    }

    #[test]
    fn test_fresh_monitor_credits_nothing() {
        let m = monitor(8, 1.82);
        assert_eq!(m.entropy_level(), 0);
        assert!(!m.ok_to_use_data());
        assert_eq!(m.estimate_entropy_per_bit(), 0.0);
        assert_eq!(m.estimate_k(), 1.0);
        let snap = m.stop();
        assert_eq!(snap.total_bits, 0);
        assert!(!snap.faulted);
    }

    // -----------------------------------------------------------------------
    // Run-length guard
    // -----------------------------------------------------------------------

    #[test]
    fn test_twenty_identical_bits_after_warmup_pass() {
        let mut m = monitor(8, 1.82);
        feed(&mut m, alternating(200)).unwrap();
        let mut il = PhaseInterleaver::new();
        // Keep phase alignment with the 200 samples already fed.
        for _ in 0..MAX_SEQUENCE {
            m.add_sample(il.push(false)).unwrap();
        }
        assert!(m.fault().is_none());
    }

    #[test]
    fn test_twenty_first_identical_bit_faults() {
        let mut m = monitor(8, 1.82);
        feed(&mut m, alternating(200)).unwrap();
        let mut il = PhaseInterleaver::new();
        for _ in 0..MAX_SEQUENCE {
            m.add_sample(il.push(false)).unwrap();
        }
        let err = m.add_sample(il.push(false)).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, HealthError::RunLengthExceeded { bit: 0, run: 21 }));
        assert_eq!(m.fault(), Some(RunFault { bit: false, run: 21 }));
    }

    #[test]
    fn test_fault_latches() {
        let mut m = monitor(4, 1.82);
        feed(&mut m, alternating(150)).unwrap();
        assert!(feed(&mut m, std::iter::repeat_n(true, 30)).is_err());
        let bits = m.total_bits();
        // Any later sample is refused and not counted.
        assert!(m.add_bit(true, false, true).unwrap_err().is_fatal());
        assert!(m.add_bit(false, true, false).is_err());
        assert_eq!(m.total_bits(), bits);
        assert!(!m.ok_to_use_data());
        assert!(m.snapshot().faulted);
    }

    #[test]
    fn test_guard_waits_for_warmup() {
        let mut m = monitor(8, 1.82);
        // The guard arms once more than 100 bits were sampled, so the first
        // 101 bits plus a full run of 20 are tolerated.
        let tolerated = (WARMUP_BITS + 1 + MAX_SEQUENCE) as usize;
        feed(&mut m, std::iter::repeat_n(true, tolerated)).unwrap();
        assert!(m.add_bit(true, true, tolerated % 2 == 0).is_err());
    }

    // -----------------------------------------------------------------------
    // Crediting
    // -----------------------------------------------------------------------

    #[test]
    fn test_no_credit_before_minimum_data() {
        let mut m = monitor(8, 2.0);
        feed(&mut m, CappedSource::new(11, 0.5).take(INM_MIN_DATA as usize - 1)).unwrap();
        assert_eq!(m.entropy_level(), 0);
        assert!(!m.ok_to_use_data());
    }

    #[test]
    fn test_warmup_credits_are_discarded() {
        let mut m = monitor(8, 2.0);
        let mut source = CappedSource::new(13, 0.5);
        let mut il = PhaseInterleaver::new();
        for bit in source.by_ref().take(INM_MIN_DATA as usize - 1) {
            m.add_sample(il.push(bit)).unwrap();
        }
        assert_eq!(m.entropy_level(), 0);
        // Tens of thousands of collapses happened during warm-up; none of
        // them may show up once the verdict turns ok.
        assert!(m.accountant.entropy_bits() > 10_000);

        let mut level = m.entropy_level();
        for bit in source.take(100) {
            m.add_sample(il.push(bit)).unwrap();
            let now = m.entropy_level();
            assert!(now - level <= 8, "level jumped {level} -> {now}");
            level = now;
        }
        assert!(level > 0);
        assert!(level <= 100 * 8);
    }

    #[test]
    fn test_fair_source_fills_ledger_at_gain_two() {
        let mut m = monitor(8, 2.0);
        let mut source = CappedSource::new(12, 0.5);
        feed(&mut m, source.by_ref().take(100_000)).unwrap();
        assert!(m.ok_to_use_data(), "rate {}", m.estimate_entropy_per_bit());
        assert_eq!(m.entropy_level(), MAX_ENTROPY);
        assert!((m.estimate_k() - 2.0).abs() < 0.03);

        m.clear_entropy_level();
        assert_eq!(m.entropy_level(), 0);
        // Credits resume after the drain.
        feed(&mut m, source.take(1000)).unwrap();
        assert!(m.entropy_level() > 0);
    }

    #[test]
    fn test_skewed_source_is_rejected() {
        let mut m = monitor(8, 1.82);
        feed(&mut m, CappedSource::new(21, 0.1).take(100_000)).unwrap();
        assert!(!m.ok_to_use_data());
        assert!(m.estimate_entropy_per_bit() < 0.7);
        assert_eq!(m.entropy_level(), 0);
    }

    #[test]
    fn test_fault_withdraws_ledger() {
        let mut m = monitor(8, 2.0);
        feed(&mut m, CappedSource::new(31, 0.5).take(90_000)).unwrap();
        assert!(m.entropy_level() > 0);
        let ledger = m.ledger();
        assert!(feed(&mut m, std::iter::repeat_n(false, 40)).is_err());
        assert_eq!(ledger.level(), 0);
        assert!(m.add_bit(true, true, true).is_err());
        assert_eq!(ledger.level(), 0);
    }

    // -----------------------------------------------------------------------
    // Counter management
    // -----------------------------------------------------------------------

    #[test]
    fn test_sample_counters_halve_at_threshold() {
        let mut m = monitor(6, 2.0);
        feed(&mut m, CappedSource::new(41, 0.5).take(INM_MIN_DATA as usize)).unwrap();
        let snap = m.snapshot();
        assert_eq!(snap.total_bits, u64::from(INM_MIN_DATA));
        assert_eq!(snap.sampled_bits, INM_MIN_DATA / 2);
    }

    #[test]
    fn test_misfires_halve_with_sample_count() {
        let mut m = monitor(4, 1.82);
        feed(&mut m, alternating(INM_MIN_DATA as usize - 1)).unwrap();
        assert_eq!(m.accountant.sampled_bits(), INM_MIN_DATA - 1);
        m.even_misfires = 26_667;
        m.odd_misfires = 26_666;
        // Repeat the previous raw values so this sample adds no misfire.
        let (even, odd) = (m.prev_even, m.prev_odd);
        m.add_bit(even, odd, true).unwrap();
        assert_eq!(m.accountant.sampled_bits(), INM_MIN_DATA / 2);
        assert_eq!((m.even_misfires, m.odd_misfires), (13_333, 13_333));
    }

    #[test]
    fn test_ones_zeros_halve_at_threshold() {
        let mut m = monitor(4, 1.82);
        feed(&mut m, alternating(200)).unwrap();
        m.total_ones = 39_999;
        m.total_zeros = INM_MIN_DATA - 1;
        m.add_bit(false, false, true).unwrap();
        assert_eq!((m.total_ones, m.total_zeros), (19_999, 40_000));

        // Below the threshold nothing is halved.
        m.add_bit(true, true, false).unwrap();
        assert_eq!((m.total_ones, m.total_zeros), (20_000, 40_000));
    }

    #[test]
    fn test_tables_rescale_without_overflow() {
        let mut m = monitor(1, 2.0);
        feed(&mut m, CappedSource::new(51, 0.5).take(300_000)).unwrap();
        assert!(m.tables().rescales() > 0);
        assert_eq!(m.snapshot().table_rescales, m.tables().rescales());
        for slot in m.tables().slots() {
            for c in [slot.even.zeros, slot.even.ones, slot.odd.zeros, slot.odd.ones] {
                assert!(c < u32::from(MAX_COUNT));
            }
        }
    }

    #[test]
    fn test_misfires_track_each_phase() {
        let mut m = monitor(4, 1.82);
        m.add_bit(true, false, true).unwrap();
        m.add_bit(true, true, false).unwrap();
        m.add_bit(false, true, true).unwrap();
        m.add_bit(false, true, false).unwrap();
        let snap = m.snapshot();
        assert_eq!(snap.sampled_bits, 4);
        assert_eq!(snap.even_misfire_percent, 50.0);
        assert_eq!(snap.odd_misfire_percent, 25.0);
        // Misfires are diagnostics only.
        assert!(!snap.ok_to_use_data);
    }

    #[test]
    fn test_ones_percent_counts_after_warmup() {
        let mut m = monitor(4, 1.82);
        feed(&mut m, alternating(100)).unwrap();
        assert_eq!(m.snapshot().ones_percent, 0.0);
        feed(&mut m, alternating(1000)).unwrap();
        let pct = m.snapshot().ones_percent;
        assert!((pct - 50.0).abs() < 0.2, "ones {pct}%");
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    #[test]
    fn test_observer_cadence() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut config = HealthConfig::new(4, 1.82, false);
        config.status_interval_bits = 1024;
        let mut m = HealthMonitor::start(config)
            .unwrap()
            .with_observer(move |s: &HealthSnapshot| sink.lock().unwrap().push(s.total_bits));
        feed(&mut m, alternating(4096 + 10)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1024, 2048, 3072, 4096]);
    }

    #[test]
    fn test_debug_flag_reports_through_log() {
        let mut config = HealthConfig::new(4, 1.82, true);
        config.status_interval_bits = 64;
        let mut m = HealthMonitor::start(config).unwrap();
        feed(&mut m, alternating(256)).unwrap();
        assert_eq!(m.total_bits(), 256);
    }

    #[test]
    fn test_prediction_profile_covers_every_depth() {
        let mut m = monitor(6, 2.0);
        feed(&mut m, CappedSource::new(61, 0.5).take(20_000)).unwrap();
        let profile = m.prediction_profile(Phase::Even);
        assert_eq!(profile.len(), 6);
        for (bits, acc) in profile {
            assert!((0.5..0.6).contains(&acc), "{bits} bits: {acc}");
        }
    }

    #[test]
    fn test_entropy_on_target_uses_gain() {
        let m = monitor(8, 2.0);
        assert!(m.entropy_on_target(1000, 1000));
        assert!(!m.entropy_on_target(900, 1000));
    }
}
