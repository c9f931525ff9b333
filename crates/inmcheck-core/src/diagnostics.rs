//! Status snapshots and the periodic-report observer hook.
//!
//! The monitor never prints. At the configured cadence it builds a
//! [`HealthSnapshot`] and hands it to a [`StatusObserver`]; [`LogObserver`]
//! forwards it to the `log` facade.

use serde::Serialize;

/// Point-in-time view of the monitor's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// Bits processed since start (never decays).
    pub total_bits: u64,
    /// Decaying sample count behind the entropy estimate.
    pub sampled_bits: u32,
    /// Decaying entropy-bit count behind the entropy estimate.
    pub entropy_bits: u32,
    pub ok_to_use_data: bool,
    pub entropy_per_bit: f64,
    pub estimated_k: f64,
    pub expected_entropy_per_bit: f64,
    pub ones_percent: f64,
    pub even_misfire_percent: f64,
    pub odd_misfire_percent: f64,
    /// Credited entropy waiting in the ledger.
    pub entropy_level: u32,
    pub table_rescales: u64,
    pub faulted: bool,
}

impl std::fmt::Display for HealthSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Generated {} bits.  {} to use data.  Estimated entropy per bit: {:.6}, estimated K: {:.6}",
            self.total_bits,
            if self.ok_to_use_data { "OK" } else { "NOT OK" },
            self.entropy_per_bit,
            self.estimated_k
        )?;
        write!(
            f,
            "num1s:{:.6}%, even misfires:{:.6}%, odd misfires:{:.6}%",
            self.ones_percent, self.even_misfire_percent, self.odd_misfire_percent
        )
    }
}

/// Percentage of `part` in `whole`, 0 when `whole` is 0.
pub(crate) fn percent(part: u32, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    f64::from(part) * 100.0 / whole as f64
}

/// Receives periodic status reports from the monitor.
pub trait StatusObserver: Send {
    fn on_status(&mut self, snapshot: &HealthSnapshot);
}

impl<F> StatusObserver for F
where
    F: FnMut(&HealthSnapshot) + Send,
{
    fn on_status(&mut self, snapshot: &HealthSnapshot) {
        self(snapshot)
    }
}

/// Writes each report as `info` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StatusObserver for LogObserver {
    fn on_status(&mut self, snapshot: &HealthSnapshot) {
        for line in snapshot.to_string().lines() {
            log::info!("{line}");
        }
    }
}
