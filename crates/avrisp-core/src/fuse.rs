//! Fuse and lock bit programming
//!
//! Fuses are written in [`Fuse::ALL`] order and each one is read back and
//! compared under the descriptor's mask before moving on. The lock bits are
//! handled separately by [`lock_chip`] because locking must come after the
//! flash has been written and verified.

use crate::chip::{ChipDescriptor, Fuse, FuseSet};
use crate::error::{Error, Result};
use crate::programmer::{BusSpeed, IspBus};
use crate::protocol;
use crate::session::IspSession;

/// Program and verify a selection of fuses
pub fn program<B: IspBus>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
    fuses: FuseSet,
) -> Result<()> {
    let max_polls = session.config().busy_poll_limit;
    let bus = session.bus()?;
    bus.set_speed(BusSpeed::Slow);

    for fuse in fuses.fuses() {
        let value = chip.bits(fuse);
        log::debug!("avrisp: writing {} fuse 0x{:02X}", fuse.name(), value);
        protocol::write_fuse(bus, fuse, value, max_polls)?;

        let read = protocol::read_fuse(bus, fuse)?;
        if !chip.fuse_matches(fuse, read) {
            return Err(Error::FuseVerifyError {
                fuse,
                expected: value,
                read: read & chip.mask(fuse),
            });
        }
    }

    Ok(())
}

/// Program the low, high and extended fuses
pub fn program_fuses<B: IspBus>(session: &mut IspSession<B>, chip: &ChipDescriptor) -> Result<()> {
    log::info!("avrisp: programming fuses");
    program(session, chip, FuseSet::PRE_LOCK)
}

/// Program the lock bits
pub fn lock_chip<B: IspBus>(session: &mut IspSession<B>, chip: &ChipDescriptor) -> Result<()> {
    log::info!("avrisp: locking");
    program(session, chip, FuseSet::LOCK)
}

/// Read all four fuse bytes, indexed by [`Fuse`]
pub fn read_fuses<B: IspBus>(session: &mut IspSession<B>) -> Result<[u8; 4]> {
    let bus = session.bus()?;
    bus.set_speed(BusSpeed::Slow);

    let mut values = [0u8; 4];
    for fuse in Fuse::ALL {
        values[fuse as usize] = protocol::read_fuse(bus, fuse)?;
    }
    Ok(values)
}
