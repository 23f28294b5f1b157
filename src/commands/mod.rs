//! CLI command implementations
//!
//! Commands that talk to a target open the programmer, run the
//! programming-enable handshake and identify the chip through
//! [`open_target`]. The session is released when it is dropped, so every
//! command leaves the target running even when it fails.
//!
//! `encode` is offline and never opens a programmer.

mod encode;
mod list;
mod probe;
mod progress;
mod rip;
mod upload;
mod verify;

pub use encode::run_encode;
pub use list::{list_chips, list_programmers};
pub use probe::run_probe;
pub use rip::run_rip;
pub use upload::run_upload;
pub use verify::run_verify;

use crate::cli::TargetArgs;
use crate::error::CliError;
use crate::programmers;
use avrisp_core::chip::{self, ChipDescriptor, ChipRegistry};
use avrisp_core::hex::DecodedRecord;
use avrisp_core::programmer::IspBus;
use avrisp_core::session::IspSession;
use avrisp_core::Error;
use std::path::Path;

/// Session over whichever programmer the user selected
pub type TargetSession = IspSession<Box<dyn IspBus + Send>>;

/// Open the programmer, enter programming mode and identify the chip
///
/// With `--chip` the named descriptor must match the target's signature;
/// otherwise the signature selects the descriptor.
pub fn open_target(
    target: &TargetArgs,
) -> Result<(TargetSession, ChipDescriptor), Box<dyn std::error::Error>> {
    let bus = programmers::open_programmer(&target.programmer)?;
    let mut session = IspSession::new(bus);
    session.begin(target.clock_output).map_err(CliError::from)?;

    let chip = identify(&mut session, target.chip.as_deref())?;
    Ok((session, chip))
}

fn identify<B: IspBus>(
    session: &mut IspSession<B>,
    chip_name: Option<&str>,
) -> Result<ChipDescriptor, CliError> {
    let registry = ChipRegistry::builtin();
    let signature = chip::read_signature(session)?;

    match chip_name {
        Some(name) => {
            let chip = registry
                .find_by_name(name)
                .copied()
                .ok_or_else(|| CliError::UnknownChipName(name.to_string()))?;
            if chip.signature != signature {
                return Err(Error::SignatureMismatch {
                    expected: chip.signature,
                    found: signature,
                }
                .into());
            }
            Ok(chip)
        }
        None => {
            let chip = chip::resolve(session, &registry, signature)?;
            if chip.is_unknown() {
                return Err(CliError::UnsupportedChip { signature });
            }
            Ok(chip)
        }
    }
}

/// Read and decode an Intel HEX file
pub fn read_hex(path: &Path) -> Result<Vec<DecodedRecord>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::file(path, e))?;
    let records = avrisp_codegen::decode_hex(&text)?;
    log::info!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Image name derived from a file name
pub fn image_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string()
}
