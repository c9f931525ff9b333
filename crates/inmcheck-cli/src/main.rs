//! CLI for inmcheck — health-check infinite noise multiplier bit streams.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "inmcheck")]
#[command(about = "inmcheck: continuous health check for infinite noise multiplier TRNGs")]
#[command(version = inmcheck_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the software multiplier model through the health check
    Simulate {
        /// Multiplier gain K of the simulated device
        #[arg(long, default_value = "1.82")]
        gain: f64,

        /// Gain the monitor checks against (defaults to --gain)
        #[arg(long)]
        expected_gain: Option<f64>,

        /// Context width N: previous bits used to predict the next
        #[arg(long, default_value = "16")]
        context_bits: u8,

        /// Number of bits to simulate; 0 runs until Ctrl+C
        #[arg(long, default_value = "10000000")]
        bits: u64,

        /// Noise amplitude injected per step
        #[arg(long, default_value_t = inmcheck_core::DEFAULT_NOISE_AMPLITUDE)]
        noise: f64,

        /// RNG seed (default: OS entropy)
        #[arg(long)]
        seed: Option<u64>,

        /// Log a status report every 2^20 bits
        #[arg(long)]
        debug: bool,

        /// Print the prediction accuracy for every context depth
        #[arg(long)]
        profile: bool,

        /// Print every counter slot at the end
        #[arg(long)]
        dump_tables: bool,

        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a captured raw stream (bytes, MSB first, phases alternating even/odd)
    Check {
        /// Input file, or "-" for stdin
        #[arg(long, default_value = "-")]
        input: String,

        /// JSON config file (context_bits, gain, debug, status_interval_bits)
        #[arg(long)]
        config: Option<String>,

        /// Multiplier gain K (overrides the config file)
        #[arg(long)]
        gain: Option<f64>,

        /// Context width N (overrides the config file)
        #[arg(long)]
        context_bits: Option<u8>,

        /// Log a status report every 2^20 bits
        #[arg(long)]
        debug: bool,

        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Audit a batch: is the claimed entropy plausible for the gain?
    Target {
        /// Entropy bits claimed for the batch
        #[arg(long)]
        claimed: u32,

        /// Output bits in the batch
        #[arg(long)]
        bits: u32,

        /// Multiplier gain K
        #[arg(long, default_value = "1.82")]
        gain: f64,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            gain,
            expected_gain,
            context_bits,
            bits,
            noise,
            seed,
            debug,
            profile,
            dump_tables,
            json,
        } => commands::simulate::run(commands::simulate::SimulateConfig {
            gain,
            expected_gain: expected_gain.unwrap_or(gain),
            context_bits,
            bits,
            noise,
            seed,
            debug,
            profile,
            dump_tables,
            json,
        }),
        Commands::Check {
            input,
            config,
            gain,
            context_bits,
            debug,
            json,
        } => commands::check::run(commands::check::CheckConfig {
            input: &input,
            config_path: config.as_deref(),
            gain,
            context_bits,
            debug,
            json,
        }),
        Commands::Target {
            claimed,
            bits,
            gain,
        } => commands::target::run(claimed, bits, gain),
    }
}
