//! Rip command implementation

use super::progress::IndicatifProgress;
use crate::cli::TargetArgs;
use crate::error::CliError;
use avrisp_codegen::rip_to_paged_source;
use std::path::Path;

/// Read the target's flash and write it out as a paged image source file
pub fn run_rip(
    target: &TargetArgs,
    output: &Path,
    name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, chip) = super::open_target(target)?;
    println!("Found: {}", chip);

    let name = name.map(str::to_string).unwrap_or_else(|| super::image_name(output));

    let mut progress = IndicatifProgress::new();
    progress.create_spinner(format!(
        "Reading {} pages from {}...",
        chip.page_count(),
        chip.name
    ));
    let source = rip_to_paged_source(&mut session, &chip, &name);
    progress.finish("Read complete");
    let source = source.map_err(CliError::from)?;
    session.end();

    std::fs::write(output, source).map_err(|e| CliError::file(output, e))?;
    println!("Wrote image '{}' to {:?}", name, output);
    Ok(())
}
