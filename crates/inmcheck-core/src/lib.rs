//! # inmcheck-core
//!
//! **Continuous health check for infinite noise multiplier TRNGs.**
//!
//! An infinite noise multiplier (INM) amplifies thermal noise through a
//! chaotic analog map with gain `K`, and so produces `log2(K)` bits of entropy
//! per output bit. This crate watches the raw bit stream, measures how hard
//! each bit was to predict from the bits before it, and only credits entropy
//! while the measured rate matches the theory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use inmcheck_core::{HealthConfig, HealthMonitor};
//!
//! let mut monitor = HealthMonitor::start(HealthConfig::new(14, 1.82, false))?;
//!
//! // Once per clock edge: both raw comparator values and the live phase.
//! # let samples: Vec<(bool, bool, bool)> = Vec::new();
//! for (even, odd, even_phase) in samples {
//!     monitor.add_bit(even, odd, even_phase)?;
//! }
//!
//! // Consumer side: spend what was credited.
//! let bits = monitor.entropy_level();
//! monitor.clear_entropy_level();
//! println!("{bits} bits of health-checked entropy");
//! # Ok::<(), inmcheck_core::HealthError>(())
//! ```
//!
//! ## Architecture
//!
//! Raw sample → run-length guard → context tables → probability accountant →
//! (health evaluator) → entropy ledger
//!
//! - **Context tables** ([`context`]): per-phase zero/one counts for every N-bit
//!   history, rescaled before any counter can overflow.
//! - **Run-length guard** ([`run_length`]): more than 20 identical bits is a
//!   fatal fault.
//! - **Probability accountant** ([`accountant`]): running likelihood of the
//!   stream; every halving is one bit of entropy.
//! - **Health evaluator** ([`health`]): measured vs. `log2(K)`, ±2%.
//! - **Entropy ledger** ([`ledger`]): atomic, capped credit counter drained by
//!   the consumer.

pub mod accountant;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod ledger;
pub mod monitor;
pub mod run_length;
pub mod simulation;

pub use accountant::{INM_MIN_DATA, ProbabilityAccountant};
pub use config::{DEFAULT_STATUS_INTERVAL_BITS, HealthConfig};
pub use context::{
    ContextTables, Counts, MAX_CONTEXT_BITS, MAX_COUNT, Phase, RollingContext, SlotDump,
};
pub use diagnostics::{HealthSnapshot, LogObserver, StatusObserver};
pub use error::{HealthError, Result};
pub use health::{ACCURACY, HealthEvaluator};
pub use ledger::{EntropyLedger, MAX_ENTROPY};
pub use monitor::HealthMonitor;
pub use run_length::{MAX_SEQUENCE, RunFault, RunLengthGuard, WARMUP_BITS};
pub use simulation::{DEFAULT_NOISE_AMPLITUDE, MultiplierModel, PhaseInterleaver, RawSample};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
