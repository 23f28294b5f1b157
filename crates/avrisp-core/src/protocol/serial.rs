//! AVR serial programming instruction sequences

use crate::chip::Fuse;
use crate::error::{Error, Result};
use crate::isp::{opcodes, IspCommand, Response};
use crate::programmer::IspBus;

/// Send one raw instruction and return `r2 << 16 | r3 << 8 | r4`
pub fn transact<M: IspBus + ?Sized>(master: &mut M, a: u8, b: u8, c: u8, d: u8) -> Result<u32> {
    execute(master, IspCommand::new(a, b, c, d)).map(|response| response.0)
}

/// Send one encoded instruction
pub fn execute<M: IspBus + ?Sized>(master: &mut M, cmd: IspCommand) -> Result<Response> {
    let raw = master.transfer(cmd.bytes)?;
    let response = Response::from_bytes(raw);
    log::trace!(
        "isp: {:02X} {:02X} {:02X} {:02X} -> {:06X}",
        cmd.bytes[0],
        cmd.bytes[1],
        cmd.bytes[2],
        cmd.bytes[3],
        response.0
    );
    Ok(response)
}

/// Issue programming enable
///
/// Returns `true` if the target echoed `0x53`, i.e. it is in sync.
pub fn programming_enable<M: IspBus + ?Sized>(master: &mut M) -> Result<bool> {
    let response = execute(master, IspCommand::programming_enable())?;
    Ok(response.r3() == opcodes::PROGRAMMING_ENABLE)
}

/// Check if the target is still busy with a write or erase
pub fn is_busy<M: IspBus + ?Sized>(master: &mut M) -> Result<bool> {
    let response = execute(master, IspCommand::poll_ready())?;
    Ok(response.r4() & 0x01 != 0)
}

/// Wait for the target to become ready
///
/// # Arguments
/// * `max_polls` - Maximum number of RDY/BSY polls before returning
///   `Error::BusyTimeout`
pub fn wait_ready<M: IspBus + ?Sized>(master: &mut M, max_polls: u32) -> Result<()> {
    for _ in 0..max_polls {
        if !is_busy(master)? {
            return Ok(());
        }
    }

    Err(Error::BusyTimeout)
}

/// Read one byte of the device signature
pub fn read_signature_byte<M: IspBus + ?Sized>(master: &mut M, index: u8) -> Result<u8> {
    let response = execute(master, IspCommand::read_signature(index))?;
    Ok(response.r4())
}

/// Read the two significant signature bytes as `sig1 << 8 | sig2`
pub fn read_signature<M: IspBus + ?Sized>(master: &mut M) -> Result<u16> {
    let high = read_signature_byte(master, 1)?;
    let low = read_signature_byte(master, 2)?;
    Ok(((high as u16) << 8) | low as u16)
}

/// Erase flash and lock bits, then wait for completion
pub fn chip_erase<M: IspBus + ?Sized>(master: &mut M, max_polls: u32) -> Result<()> {
    execute(master, IspCommand::chip_erase())?;
    wait_ready(master, max_polls)
}

/// Write a fuse byte and wait for completion
pub fn write_fuse<M: IspBus + ?Sized>(
    master: &mut M,
    fuse: Fuse,
    value: u8,
    max_polls: u32,
) -> Result<()> {
    execute(master, IspCommand::write_fuse(fuse, value))?;
    wait_ready(master, max_polls)
}

/// Read a fuse byte
pub fn read_fuse<M: IspBus + ?Sized>(master: &mut M, fuse: Fuse) -> Result<u8> {
    let response = execute(master, IspCommand::read_fuse(fuse))?;
    Ok(response.r4())
}

/// Load one byte into the target's page buffer and wait for completion
pub fn load_page_byte<M: IspBus + ?Sized>(
    master: &mut M,
    word: u16,
    high: bool,
    value: u8,
    max_polls: u32,
) -> Result<()> {
    execute(master, IspCommand::load_page(word, high, value))?;
    wait_ready(master, max_polls)
}

/// Commit the page buffer to flash at a word address
///
/// Returns the low 16 bits of the reply, which a healthy target echoes as
/// the word address. Does not wait for completion.
pub fn write_page<M: IspBus + ?Sized>(master: &mut M, word_address: u16) -> Result<u16> {
    let response = execute(master, IspCommand::write_page(word_address))?;
    Ok(response.low_word())
}

/// Read one flash byte at a byte address
pub fn read_flash_byte<M: IspBus + ?Sized>(master: &mut M, address: u32) -> Result<u8> {
    let response = execute(master, IspCommand::read_flash(address))?;
    Ok(response.r4())
}
