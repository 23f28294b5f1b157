//! Bitbang ISP helpers
//!
//! This module provides the line-level trait and byte shifting helpers for
//! programmers that implement the ISP bus via software-controlled GPIO pins.
//! Hardware SPI based programmers implement [`IspBus`](super::IspBus)
//! directly instead.
//!
//! The AVR serial programming interface is SPI mode 0: MOSI is set up while
//! SCK is low, the target samples it on the rising edge, and MISO is valid
//! from the falling edge until the next rising edge. Bytes go MSB first and
//! every byte is full duplex.

/// Trait for low-level bitbang ISP operations
pub trait BitbangIsp {
    /// Set clock line value
    fn set_sck(&mut self, high: bool);

    /// Set MOSI line value
    fn set_mosi(&mut self, high: bool);

    /// Get MISO line value
    fn get_miso(&self) -> bool;

    /// Delay for half a clock period
    fn half_period_delay(&self);

    /// Optional: Set SCK and MOSI atomically (optimization)
    ///
    /// Default implementation calls `set_sck` then `set_mosi`.
    fn set_sck_set_mosi(&mut self, sck: bool, mosi: bool) {
        self.set_sck(sck);
        self.set_mosi(mosi);
    }

    /// Optional: Set SCK and get MISO atomically (optimization)
    ///
    /// Default implementation calls `set_sck` then `get_miso`.
    fn set_sck_get_miso(&mut self, sck: bool) -> bool {
        self.set_sck(sck);
        self.get_miso()
    }
}

/// Exchange one byte (MSB first), returning the byte clocked in on MISO
pub fn exchange_byte<M: BitbangIsp + ?Sized>(master: &mut M, byte: u8) -> u8 {
    let mut read = 0u8;
    for i in (0..8).rev() {
        let bit = (byte >> i) & 1 != 0;
        master.set_sck_set_mosi(false, bit);
        master.half_period_delay();
        read <<= 1;
        if master.set_sck_get_miso(true) {
            read |= 1;
        }
        master.half_period_delay();
    }
    master.set_sck(false);
    read
}

/// Exchange a full 4-byte ISP instruction
pub fn exchange<M: BitbangIsp + ?Sized>(master: &mut M, request: [u8; 4]) -> [u8; 4] {
    let mut response = [0u8; 4];
    for (out, &byte) in response.iter_mut().zip(request.iter()) {
        *out = exchange_byte(master, byte);
    }
    response
}
