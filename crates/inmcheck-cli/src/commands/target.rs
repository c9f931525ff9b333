//! `inmcheck target` — audit a batch's claimed entropy against the gain.

use inmcheck_core::{ACCURACY, HealthConfig, HealthEvaluator};

use super::exit_on_error;

pub fn run(claimed: u32, bits: u32, gain: f64) {
    let config = HealthConfig {
        gain,
        ..HealthConfig::default()
    };
    if let Err(e) = config.validate() {
        exit_on_error(&e);
    }
    let health = HealthEvaluator::new(gain);
    let expected = f64::from(bits) * config.expected_entropy_per_bit();
    let ok = health.entropy_on_target(claimed, bits);
    println!(
        "Batch of {bits} bits at K={gain}: expected {expected:.1} bits of entropy, claimed {claimed} (tolerance {ACCURACY})"
    );
    println!("{}", if ok { "ON TARGET" } else { "BELOW TARGET" });
    if !ok {
        std::process::exit(1);
    }
}
