//! `inmcheck simulate` — feed the software multiplier model through the monitor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use inmcheck_core::{HealthConfig, MultiplierModel, PhaseInterleaver};

use super::{exit_on_error, print_profile, print_snapshot, start_monitor};

/// Bits between ledger drains and Ctrl+C checks.
const DRAIN_INTERVAL: u64 = 1 << 12;

pub struct SimulateConfig {
    pub gain: f64,
    pub expected_gain: f64,
    pub context_bits: u8,
    pub bits: u64,
    pub noise: f64,
    pub seed: Option<u64>,
    pub debug: bool,
    pub profile: bool,
    pub dump_tables: bool,
    pub json: bool,
}

pub fn run(cfg: SimulateConfig) {
    let seed = cfg.seed.unwrap_or_else(os_seed);
    let mut monitor = start_monitor(HealthConfig::new(
        cfg.context_bits,
        cfg.expected_gain,
        cfg.debug,
    ));
    let ledger = monitor.ledger();
    let mut model = MultiplierModel::new(cfg.gain, cfg.noise, seed);
    let mut il = PhaseInterleaver::new();

    let running = Arc::new(AtomicBool::new(true));
    if cfg.bits == 0 {
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .expect("Error setting Ctrl+C handler");
    }

    if !cfg.json {
        println!(
            "Simulating K={} (checked against K={}), N={}, noise={:e}, seed={seed}",
            cfg.gain, cfg.expected_gain, cfg.context_bits, cfg.noise
        );
        if cfg.bits == 0 {
            println!("Press Ctrl+C to stop.");
        }
    }

    let start = Instant::now();
    let mut produced = 0u64;
    let mut credited = 0u64;
    while cfg.bits == 0 || produced < cfg.bits {
        let sample = il.push(model.next_bit());
        if let Err(e) = monitor.add_sample(sample) {
            print_snapshot(&monitor.snapshot(), cfg.json);
            exit_on_error(&e);
        }
        produced += 1;
        if produced % DRAIN_INTERVAL == 0 {
            credited += u64::from(ledger.take());
            if !running.load(Ordering::SeqCst) {
                break;
            }
        }
    }
    credited += u64::from(ledger.take());
    let elapsed = start.elapsed().as_secs_f64();

    if cfg.profile && !cfg.json {
        print_profile(&monitor);
    }
    if cfg.dump_tables {
        for slot in monitor.tables().slots() {
            println!("{slot}");
        }
    }

    let snapshot = monitor.stop();
    if !cfg.json {
        println!();
    }
    print_snapshot(&snapshot, cfg.json);
    if !cfg.json {
        println!(
            "Credited {credited} bits of entropy from {produced} bits ({:.4}/bit) in {elapsed:.1}s",
            if produced == 0 { 0.0 } else { credited as f64 / produced as f64 }
        );
    }
}

/// Seed from the OS CSPRNG.
fn os_seed() -> u64 {
    let mut buf = [0u8; 8];
    if let Err(e) = getrandom::fill(&mut buf) {
        eprintln!("Error reading OS entropy for the seed: {e}");
        std::process::exit(1);
    }
    u64::from_le_bytes(buf)
}
