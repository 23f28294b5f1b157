//! avrisp-codegen - Offline firmware image encoder
//!
//! This crate turns Intel HEX files into Rust source that embeds a firmware
//! image and the chip descriptor it targets, so a standalone programmer can
//! carry its payload in flash. It also renders a target's flash, read back
//! over ISP, in the same format.
//!
//! ```no_run
//! use avrisp_codegen::{decode_hex, encode, render, ChipProfile, ImageFormat};
//!
//! let profile = ChipProfile::resolve("m328p")?;
//! let records = decode_hex(&std::fs::read_to_string("optiboot.hex")?)?;
//! let image = encode(&records, &profile, ImageFormat::Paged)?;
//! std::fs::write("optiboot.rs", render("optiboot", &image, &profile)?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod encode;
pub mod error;
pub mod profile;
pub mod render;
pub mod rip;

pub use encode::{decode_hex, encode, EncodedImage, ImageFormat};
pub use error::{CodegenError, Result};
pub use profile::{ChipProfile, FusesDef, Size};
pub use render::{identifier_prefix, render};
pub use rip::{rip_to_image, rip_to_paged_source};

use std::fs;
use std::path::Path;

/// Encode a HEX file and write the generated source to `output_file`
pub fn generate(
    hex_file: &Path,
    profile: &ChipProfile,
    format: ImageFormat,
    name: &str,
    output_file: &Path,
) -> Result<()> {
    let text = fs::read_to_string(hex_file)?;
    let records = decode_hex(&text)?;
    let image = encode(&records, profile, format)?;
    let code = render(name, &image, profile)?;
    fs::write(output_file, code)?;
    Ok(())
}
