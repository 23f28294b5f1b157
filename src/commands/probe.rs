//! Probe command implementation

use crate::cli::TargetArgs;
use crate::error::CliError;
use avrisp_core::chip::Fuse;
use avrisp_core::fuse;

/// Identify the target and print its geometry and fuses
pub fn run_probe(target: &TargetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, chip) = super::open_target(target)?;
    let fuses = fuse::read_fuses(&mut session).map_err(CliError::from)?;
    session.end();

    println!("AVR Chip Information");
    println!("====================");
    println!();
    println!("Name:            {}", chip.name);
    println!("Signature:       1E {:02X} {:02X}", chip.signature >> 8, chip.signature & 0xFF);
    println!(
        "Flash:           {} bytes ({} KiB)",
        chip.flash_size,
        chip.flash_size / 1024
    );
    println!(
        "Page size:       {} bytes ({} pages)",
        chip.page_size,
        chip.page_count()
    );
    println!();
    println!("Fuses:           current   programmed  (mask)");
    for f in Fuse::ALL {
        let current = fuses[f.index() as usize];
        let marker = if chip.fuse_matches(f, current) { "" } else { "  *" };
        println!(
            "  {:<14} 0x{:02X}      0x{:02X}        (0x{:02X}){}",
            f.name(),
            current,
            chip.bits(f),
            chip.mask(f),
            marker
        );
    }
    Ok(())
}
