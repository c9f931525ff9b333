//! `inmcheck check` — replay a captured raw stream through the monitor.

use std::io::Read;

use inmcheck_core::{HealthConfig, PhaseInterleaver};

use super::{exit_on_error, print_snapshot, start_monitor};

pub struct CheckConfig<'a> {
    pub input: &'a str,
    pub config_path: Option<&'a str>,
    pub gain: Option<f64>,
    pub context_bits: Option<u8>,
    pub debug: bool,
    pub json: bool,
}

pub fn run(cfg: CheckConfig<'_>) {
    let mut config = match cfg.config_path {
        Some(path) => HealthConfig::from_json_file(path).unwrap_or_else(|e| exit_on_error(&e)),
        None => HealthConfig::default(),
    };
    if let Some(gain) = cfg.gain {
        config.gain = gain;
    }
    if let Some(bits) = cfg.context_bits {
        config.context_bits = bits;
    }
    config.debug |= cfg.debug;

    let data = match read_input(cfg.input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cfg.input);
            std::process::exit(1);
        }
    };
    log::info!("replaying {} bits from {}", data.len() * 8, cfg.input);

    let mut monitor = start_monitor(config);
    let ledger = monitor.ledger();
    let mut credited = 0u64;
    for (i, sample) in PhaseInterleaver::interleave(bits_msb_first(&data)).enumerate() {
        if let Err(e) = monitor.add_sample(sample) {
            print_snapshot(&monitor.snapshot(), cfg.json);
            exit_on_error(&e);
        }
        // Drain once per input byte, like a consumer keeping up with the device.
        if i % 8 == 7 {
            credited += u64::from(ledger.take());
        }
    }
    credited += u64::from(ledger.take());

    let snapshot = monitor.stop();
    print_snapshot(&snapshot, cfg.json);
    if !cfg.json {
        println!("Credited {credited} bits of health-checked entropy");
    }
}

fn read_input(input: &str) -> std::io::Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin().lock().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(input)
    }
}

/// Unpack bytes into bits, most significant bit first.
fn bits_msb_first(data: &[u8]) -> impl Iterator<Item = bool> + '_ {
    data.iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_msb_first() {
        let bits: Vec<bool> = bits_msb_first(&[0b1000_0001, 0x40]).collect();
        assert_eq!(bits.len(), 16);
        assert!(bits[0]);
        assert!(bits[7]);
        assert!(bits[9]);
        assert_eq!(bits.iter().filter(|&&b| b).count(), 3);
    }
}
