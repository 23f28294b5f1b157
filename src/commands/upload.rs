//! Upload command implementation

use super::progress::IndicatifProgress;
use crate::cli::TargetArgs;
use crate::error::CliError;
use avrisp_codegen::{encode, ChipProfile, ImageFormat};
use avrisp_core::flash;
use std::path::Path;

/// Run the upload command
pub fn run_upload(
    target: &TargetArgs,
    input: &Path,
    format: ImageFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = super::read_hex(input)?;
    let (mut session, chip) = super::open_target(target)?;
    println!(
        "Found: {} ({} bytes, {}-byte pages)",
        chip, chip.flash_size, chip.page_size
    );

    let profile = ChipProfile::from_descriptor(&chip);
    let image = encode(&records, &profile, format).map_err(CliError::from)?;
    log::debug!("Encoded {:?} as {} image", input, image.format());

    let name = super::image_name(input);
    let mut progress = IndicatifProgress::new();
    image
        .with_image(&name, |image| {
            flash::upload_image_with_progress(&mut session, &chip, image, &mut progress)
        })
        .map_err(CliError::from)?;

    session.end();
    println!("Upload complete!");
    Ok(())
}
