//! Verify command implementation

use super::progress::IndicatifProgress;
use crate::cli::TargetArgs;
use crate::error::CliError;
use avrisp_codegen::{encode, ChipProfile, ImageFormat};
use avrisp_core::flash;
use std::path::Path;

/// Run the verify command
pub fn run_verify(target: &TargetArgs, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let records = super::read_hex(input)?;
    let (mut session, chip) = super::open_target(target)?;
    println!("Found: {}", chip);

    let image = encode(&records, &ChipProfile::from_descriptor(&chip), ImageFormat::Paged)
        .map_err(CliError::from)?;

    let name = super::image_name(input);
    let mut progress = IndicatifProgress::new();
    let verified = image
        .with_image(&name, |image| {
            flash::verify_image_with_progress(&mut session, &chip, image, &mut progress)
        })
        .map_err(CliError::from);
    progress.finish("Verify complete");

    let verified = verified?;
    session.end();
    println!("Verified {} page(s): flash matches {:?}", verified, input);
    Ok(())
}
