pub mod check;
pub mod simulate;
pub mod target;

use inmcheck_core::{HealthConfig, HealthError, HealthMonitor, HealthSnapshot, Phase};

/// Exit code for a run-length fault: the source must be taken offline.
pub const EXIT_FAULT: i32 = 2;

/// Start a monitor or exit with the error.
pub fn start_monitor(config: HealthConfig) -> HealthMonitor {
    match HealthMonitor::start(config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Report a fault and exit with the matching code.
pub fn exit_on_error(err: &HealthError) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(if err.is_fatal() { EXIT_FAULT } else { 1 });
}

/// Print the final snapshot as text or JSON.
pub fn print_snapshot(snapshot: &HealthSnapshot, json: bool) {
    if json {
        match serde_json::to_string_pretty(snapshot) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Error encoding snapshot: {e}"),
        }
        return;
    }
    println!("{snapshot}");
    println!(
        "Expected entropy per bit: {:.6} | Entropy level: {} | Table rescales: {}",
        snapshot.expected_entropy_per_bit, snapshot.entropy_level, snapshot.table_rescales
    );
    if snapshot.faulted {
        println!("Source FAULTED: run-length limit exceeded");
    }
}

/// Print the prediction accuracy for every context depth of both phases.
pub fn print_profile(monitor: &HealthMonitor) {
    for phase in [Phase::Even, Phase::Odd] {
        println!("\n{phase} phase:");
        let profile = monitor.prediction_profile(phase);
        if profile.is_empty() {
            println!("  (no data)");
        }
        for (bits, accuracy) in profile {
            println!("  Probability of guessing correctly with {bits:>2} bits: {accuracy:.6}");
        }
    }
}
