//! CLI argument parsing

use crate::programmers;
use avrisp_codegen::ImageFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "avrisp")]
#[command(author, version, about = "AVR in-system programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Target connection options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Programmer to use
    #[arg(short, long, help = programmer_help())]
    pub programmer: String,

    /// Chip name (optional, identified by signature if not specified)
    #[arg(short, long)]
    pub chip: Option<String>,

    /// Feed a clock to the target's XTAL1 pin while programming
    #[arg(long)]
    pub clock_output: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the target and show its fuses
    Probe {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Erase the target, program fuses, write an image and lock
    Upload {
        #[command(flatten)]
        target: TargetArgs,

        /// Intel HEX file to write
        input: PathBuf,

        /// In-memory image layout
        #[arg(long, default_value_t = ImageFormat::HexLines)]
        format: ImageFormat,
    },

    /// Compare the target's flash with a HEX file
    Verify {
        #[command(flatten)]
        target: TargetArgs,

        /// Intel HEX file to compare against
        input: PathBuf,
    },

    /// Read the target's flash into a generated Rust source file
    Rip {
        #[command(flatten)]
        target: TargetArgs,

        /// Output source file
        #[arg(short, long)]
        output: PathBuf,

        /// Image name used for the generated identifiers
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Convert a HEX file into a generated Rust source file (offline)
    Encode {
        /// Intel HEX file
        input: PathBuf,

        /// Built-in chip name or path to a .ron chip profile
        #[arg(short, long)]
        chip: String,

        /// Output layout
        #[arg(short, long, default_value_t = ImageFormat::Paged)]
        format: ImageFormat,

        /// Output source file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Image name used for the generated identifiers (default: file stem)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List supported programmers
    ListProgrammers,

    /// List supported chips
    ListChips,
}
