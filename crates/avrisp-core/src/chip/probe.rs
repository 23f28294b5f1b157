//! Signature reading and chip resolution

use super::database::ChipRegistry;
use super::types::ChipDescriptor;
use crate::error::{Error, Result};
use crate::programmer::{BusSpeed, IspBus};
use crate::protocol;
use crate::session::IspSession;

/// Read the target's signature (`sig1 << 8 | sig2`)
///
/// A signature of `0x0000` or `0xFFFF` means MISO is stuck and fails with
/// [`Error::InvalidSignature`].
pub fn read_signature<B: IspBus>(session: &mut IspSession<B>) -> Result<u16> {
    let bus = session.bus()?;
    bus.set_speed(BusSpeed::Slow);
    let signature = protocol::read_signature(bus)?;
    if signature == 0x0000 || signature == 0xFFFF {
        return Err(Error::InvalidSignature { signature });
    }
    log::debug!("avrisp: signature 0x{:04X}", signature);
    Ok(signature)
}

/// Resolve the descriptor for a signature
///
/// A `signature` of 0 reads it from the target first. Returns
/// [`ChipDescriptor::UNKNOWN`] when the registry has no match.
pub fn resolve<B: IspBus>(
    session: &mut IspSession<B>,
    registry: &ChipRegistry<'_>,
    signature: u16,
) -> Result<ChipDescriptor> {
    let signature = if signature == 0 {
        read_signature(session)?
    } else {
        signature
    };

    let chip = registry.resolve(signature);
    if chip.is_unknown() {
        log::warn!("avrisp: no descriptor for signature 0x{:04X}", signature);
    } else {
        log::info!("avrisp: found {}", chip);
    }
    Ok(chip)
}
