//! Encode command implementation (offline)

use crate::error::CliError;
use avrisp_codegen::{encode, render, ChipProfile, ImageFormat};
use std::path::Path;

/// Encode a HEX file as Rust source, writing to `output` or stdout
pub fn run_encode(
    input: &Path,
    chip: &str,
    format: ImageFormat,
    output: Option<&Path>,
    name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = ChipProfile::resolve(chip).map_err(CliError::from)?;
    log::info!(
        "Encoding for {} (0x{:04X}, {} bytes)",
        profile.name,
        profile.signature,
        profile.flash_bytes()
    );

    let records = super::read_hex(input)?;
    let image = encode(&records, &profile, format).map_err(CliError::from)?;

    let name = name.map(str::to_string).unwrap_or_else(|| super::image_name(input));
    let source = render(&name, &image, &profile).map_err(CliError::from)?;

    match output {
        Some(path) => {
            std::fs::write(path, source).map_err(|e| CliError::file(path, e))?;
            eprintln!("Wrote {} image '{}' to {:?}", format, name, path);
        }
        None => print!("{}", source),
    }
    Ok(())
}
