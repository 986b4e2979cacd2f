//! SoC fabric simulator CLI.
//!
//! This binary composes a fabric from a JSON configuration and drives it. It performs:
//! 1. **Describe:** Print the derived sizing, memory map, CSR map, and constants.
//! 2. **Run:** Play built-in write/read-back traffic from several masters (and optionally the
//!    debug window), then print the statistics report.

use std::path::PathBuf;
use std::{fs, process};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use socfabric_core::config::{DebugConfig, TimerConfig};
use socfabric_core::sim::{DebugOp, DebugRequester, Simulator, TrafficMaster};
use socfabric_core::{Soc, SocBuilder, SocConfig};

#[derive(Parser, Debug)]
#[command(
    name = "socfab",
    author,
    version,
    about = "Cycle-level SoC memory fabric simulator",
    long_about = "Compose an SoC fabric from a JSON configuration and inspect or exercise it.\n\nExamples:\n  socfab describe\n  socfab --config soc.json describe --json\n  socfab run --masters 3 --words 256 --debug"
)]
struct Cli {
    /// JSON configuration file; built-in defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides `RUST_LOG`), e.g. `debug` or `socfabric_core=trace`.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the composed layout.
    Describe {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Run built-in traffic and print statistics.
    Run {
        /// Number of bus masters.
        #[arg(short, long, default_value_t = 2)]
        masters: usize,

        /// Words each master writes and reads back.
        #[arg(short, long, default_value_t = 64)]
        words: u32,

        /// Cycle limit.
        #[arg(long, default_value_t = 1_000_000)]
        max_cycles: u64,

        /// Also exercise the debug window.
        #[arg(long)]
        debug: bool,

        /// Compose a timer peripheral.
        #[arg(long)]
        timer: bool,
    },
}

#[derive(Serialize)]
struct Region {
    owner: String,
    base: u64,
    size: u64,
}

#[derive(Serialize)]
struct Register {
    component: String,
    name: &'static str,
    address: u64,
    words: u32,
    bits: u32,
}

#[derive(Serialize)]
struct Description {
    port_data_width: u32,
    port_address_width: u32,
    main_ram_size: u64,
    cache_size: u64,
    regions: Vec<Region>,
    csr_data_width: u32,
    registers: Vec<Register>,
    constants: Vec<(&'static str, u64)>,
}

impl Description {
    fn of(soc: &Soc) -> Self {
        let plan = soc.plan();
        let csr = soc.csr_map();
        Self {
            port_data_width: plan.port_data_width,
            port_address_width: plan.port_address_width,
            main_ram_size: plan.main_ram_size,
            cache_size: plan.cache_size,
            regions: soc
                .memory_map()
                .regions()
                .iter()
                .map(|r| Region {
                    owner: r.owner.clone(),
                    base: r.base,
                    size: r.size,
                })
                .collect(),
            csr_data_width: csr.data_width(),
            registers: csr
                .entries()
                .iter()
                .map(|e| Register {
                    component: e.component.clone(),
                    name: e.register.name,
                    address: e.address,
                    words: e.words,
                    bits: e.register.bits,
                })
                .collect(),
            constants: csr.constants().iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    fn print(&self) {
        println!(
            "SDRAM port      {} bits, {} address bits",
            self.port_data_width, self.port_address_width
        );
        println!("Main RAM        {} MiB", self.main_ram_size >> 20);
        println!("L2 cache        {} bytes", self.cache_size);
        println!();
        println!("Memory map:");
        for r in &self.regions {
            println!("  {:<10} {:#010x} - {:#010x}", r.owner, r.base, r.base + r.size - 1);
        }
        println!();
        println!("CSR registers ({}-bit bus):", self.csr_data_width);
        for r in &self.registers {
            println!(
                "  {:#010x}  {}_{} ({} bits, {} words)",
                r.address, r.component, r.name, r.bits, r.words
            );
        }
        println!();
        println!("Constants:");
        for (name, value) in &self.constants {
            println!("  {name:<18} {value:#x}");
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.log.as_deref() {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config(cli.config.as_ref());

    match cli.command {
        Commands::Describe { json } => cmd_describe(&config, json),
        Commands::Run {
            masters,
            words,
            max_cycles,
            debug,
            timer,
        } => cmd_run(config, masters, words, max_cycles, debug, timer),
    }
}

/// Reads and parses the configuration file, or returns the defaults.
///
/// Exits the process with code 1 when the file cannot be read or parsed.
fn load_config(path: Option<&PathBuf>) -> SocConfig {
    let Some(path) = path else {
        return SocConfig::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        error!(path = %path.display(), "cannot read configuration: {e}");
        process::exit(1);
    });
    SocConfig::from_json(&text).unwrap_or_else(|e| {
        error!(path = %path.display(), "{e}");
        process::exit(1);
    })
}

/// Composes a SoC with `masters` named masters.
///
/// Exits the process with code 1 on any composition error.
fn compose(config: &SocConfig, masters: usize) -> Soc {
    let result = SocBuilder::new(config).and_then(|mut builder| {
        for i in 0..masters {
            let _ = builder.add_master(&format!("master{i}"))?;
        }
        let _ = builder.register_sdram()?;
        builder.finalize()
    });
    result.unwrap_or_else(|e| {
        error!("composition failed: {e}");
        process::exit(1);
    })
}

fn cmd_describe(config: &SocConfig, json: bool) {
    let soc = compose(config, 1);
    let description = Description::of(&soc);
    if json {
        match serde_json::to_string_pretty(&description) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                error!("cannot serialize description: {e}");
                process::exit(1);
            }
        }
    } else {
        description.print();
    }
}

/// Runs `masters` sequential write/read-back scripts over disjoint windows of main RAM.
///
/// Exits with code 1 if any read-back mismatched or the cycle limit was hit.
fn cmd_run(
    mut config: SocConfig,
    masters: usize,
    words: u32,
    max_cycles: u64,
    debug: bool,
    timer: bool,
) {
    if debug && config.debug.is_none() {
        config.debug = Some(DebugConfig::default());
    }
    if timer && config.timer.is_none() {
        config.timer = Some(TimerConfig::default());
    }
    let soc = compose(&config, masters.max(1));
    let base = config.mem_map.main_ram;
    let window = (u64::from(words) * 4).next_power_of_two();
    let ids: Vec<_> = soc.masters().iter().filter_map(|name| soc.master(name)).collect();

    let mut sim = Simulator::new(soc);
    for (i, id) in ids.into_iter().enumerate() {
        let start = base + i as u64 * window;
        sim.add_master(TrafficMaster::sequential(id, start, words, i as u32 + 1));
    }
    if debug {
        sim.set_debug_requester(DebugRequester::new(
            config.mem_map.debug,
            [
                DebugOp::Write { offset: 0x00, data: 0xC0DE_0001 },
                DebugOp::Write { offset: 0x04, data: 0x0000_00A5 },
                DebugOp::Refresh { selector: 0x00 },
                DebugOp::Refresh { selector: 0x04 },
                DebugOp::Read { offset: 0x00 },
            ],
        ));
    }
    if let Some(timer) = sim.soc_mut().timer_mut() {
        timer.set_reload(1000);
        timer.set_event_enable(true);
        timer.set_enabled(true);
    }

    info!(masters, words, "starting traffic");
    let summary = sim.run(max_cycles);
    sim.stats().print();

    if let Some(requester) = sim.debug_requester() {
        for (op, data) in requester.acks() {
            println!("debug {op:?} -> {data:#010x}");
        }
    }
    if let Some(bridge) = sim.soc().debug_bridge() {
        let capture = bridge.capture();
        println!("debug capture A={:#010x} B={:#010x}", capture.a, capture.b);
    }

    if !summary.finished {
        error!(cycles = summary.cycles, "cycle limit reached before traffic completed");
        process::exit(1);
    }
    if summary.mismatches > 0 {
        error!(mismatches = summary.mismatches, "read-back mismatches");
        process::exit(1);
    }
}
