//! avrisp - AVR in-system programmer
//!
//! Programs ATmega targets over the serial programming interface: the
//! target is held in reset while SCK/MOSI/MISO carry 4-byte instructions.
//!
//! # Architecture
//!
//! The protocol engine lives in `avrisp-core` and only needs an
//! [`IspBus`](avrisp_core::programmer::IspBus) implementation:
//! - **Bitbang programmers** (Linux GPIO) drive the lines directly
//! - **The dummy programmer** simulates a target in memory for testing
//!
//! Uploads erase the chip, program the fuses, write the image page by page
//! with read-back verification and finally program the lock bits. The
//! `encode` and `rip` commands produce Rust source embedding an image, for
//! standalone programmer builds.

mod cli;
mod commands;
mod error;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Probe { target } => commands::run_probe(&target),
        Commands::Upload {
            target,
            input,
            format,
        } => commands::run_upload(&target, &input, format),
        Commands::Verify { target, input } => commands::run_verify(&target, &input),
        Commands::Rip {
            target,
            output,
            name,
        } => commands::run_rip(&target, &output, name.as_deref()),
        Commands::Encode {
            input,
            chip,
            format,
            output,
            name,
        } => commands::run_encode(&input, &chip, format, output.as_deref(), name.as_deref()),
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListChips => {
            commands::list_chips();
            Ok(())
        }
    }
}
