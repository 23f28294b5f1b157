//! avrisp-dummy - Simulated AVR target for testing
//!
//! This crate provides a dummy ISP bus with an emulated ATmega-style target
//! behind it. It decodes the serial programming instructions, keeps flash,
//! page buffer, fuses and lock bits in memory, and records every
//! instruction it executes so tests can check what an operation did to the
//! chip, and in which order.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use avrisp_core::chip::{ChipDescriptor, Fuse};
use avrisp_core::error::Result;
use avrisp_core::isp::opcodes;
use avrisp_core::programmer::{BusSpeed, IspBus};

/// Manufacturer byte of every Atmel/Microchip AVR signature
pub const ATMEL_ID: u8 = 0x1E;

/// Configuration for the simulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Device signature (`sig1 << 8 | sig2`)
    pub signature: u16,
    /// Flash size in bytes
    pub flash_size: usize,
    /// Page size in bytes
    pub page_size: usize,
    /// Implemented fuse bits; the others always read back as 1
    pub fuse_mask: [u8; 4],
    /// Fuse values at power-up
    pub fuses: [u8; 4],
    /// Programming-enable attempts rejected before the target syncs;
    /// `None` never syncs
    pub sync_after: Option<u32>,
    /// Ready polls reporting busy after each erase, fuse write or commit
    pub busy_polls: u32,
}

impl DummyConfig {
    /// Configuration mirroring a chip descriptor, with factory fuses
    pub fn for_chip(chip: &ChipDescriptor) -> Self {
        Self {
            signature: chip.signature,
            flash_size: chip.flash_size as usize,
            page_size: chip.page_size as usize,
            fuse_mask: chip.fuse_mask,
            fuses: [0x62, 0xD9, 0xFF, 0xFF],
            sync_after: Some(0),
            busy_polls: 1,
        }
    }
}

impl Default for DummyConfig {
    /// An ATmega328P
    fn default() -> Self {
        Self {
            signature: 0x950F,
            flash_size: 32 * 1024,
            page_size: 128,
            fuse_mask: [0xFF, 0xFF, 0x07, 0x3F],
            fuses: [0x62, 0xD9, 0xFF, 0xFF],
            sync_after: Some(0),
            busy_polls: 1,
        }
    }
}

/// Injected misbehaviour
#[derive(Debug, Clone, Default)]
pub struct DummyFaults {
    /// Commit replies echo a wrong word address
    pub corrupt_commit_echo: bool,
    /// The target never reports ready
    pub stuck_busy: bool,
    /// A fuse that ignores writes
    pub stuck_fuse: Option<Fuse>,
    /// A flash byte address whose read-back has these bits flipped
    pub flipped_bits: Option<(u32, u8)>,
}

/// An instruction executed by the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOp {
    /// Programming enable, and whether it was accepted
    ProgrammingEnable {
        /// Target echoed 0x53
        accepted: bool,
    },
    /// Chip erase
    ChipErase,
    /// Ready poll
    PollReady,
    /// Signature byte read
    ReadSignature(u8),
    /// Fuse or lock write
    WriteFuse {
        /// Fuse written
        fuse: Fuse,
        /// Value sent
        value: u8,
    },
    /// Fuse or lock read
    ReadFuse(Fuse),
    /// Page buffer load
    LoadPage {
        /// Word offset within the page
        word: u16,
        /// High byte of the word
        high: bool,
        /// Value loaded
        value: u8,
    },
    /// Page commit
    WritePage {
        /// Word address sent
        word_address: u16,
    },
    /// Flash byte read
    ReadFlash {
        /// Byte address read
        address: u32,
    },
    /// Instruction the target does not implement
    Unknown([u8; 4]),
}

/// Simulated AVR target
///
/// Behaves like the real silicon where tests can observe it:
/// - instructions are ignored unless RESET is low and programming enable
///   has been accepted since the last reset pulse
/// - commits can only clear bits, so flash must be erased first
/// - lock bits can only be programmed, and only chip erase clears them
/// - a flash lock mode (LB1/LB2 programmed) blocks further commits
#[cfg(feature = "alloc")]
pub struct DummyTarget {
    config: DummyConfig,
    faults: DummyFaults,
    flash: Vec<u8>,
    page_buffer: Vec<u8>,
    fuses: [u8; 4],
    reset_low: bool,
    programming: bool,
    enable_attempts: u32,
    busy_remaining: u32,
    speed: BusSpeed,
    clock_output: bool,
    elapsed_ms: u64,
    trace: Vec<TargetOp>,
}

#[cfg(feature = "alloc")]
impl DummyTarget {
    /// Create a new target with erased flash
    pub fn new(config: DummyConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        let page_buffer = vec![0xFF; config.page_size];
        let mut fuses = config.fuses;
        for (fuse, mask) in fuses.iter_mut().zip(config.fuse_mask) {
            *fuse |= !mask;
        }
        Self {
            config,
            faults: DummyFaults::default(),
            flash,
            page_buffer,
            fuses,
            reset_low: false,
            programming: false,
            enable_attempts: 0,
            busy_remaining: 0,
            speed: BusSpeed::Slow,
            clock_output: false,
            elapsed_ms: 0,
            trace: Vec::new(),
        }
    }

    /// Create a target for a chip descriptor
    pub fn for_chip(chip: &ChipDescriptor) -> Self {
        Self::new(DummyConfig::for_chip(chip))
    }

    /// Create a target with pre-filled flash
    pub fn with_flash(config: DummyConfig, initial: &[u8]) -> Self {
        let mut target = Self::new(config);
        let len = core::cmp::min(initial.len(), target.flash.len());
        target.flash[..len].copy_from_slice(&initial[..len]);
        target
    }

    /// Flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Mutable flash contents
    pub fn flash_mut(&mut self) -> &mut [u8] {
        &mut self.flash
    }

    /// Current fuse values, indexed by [`Fuse`]
    pub fn fuses(&self) -> [u8; 4] {
        self.fuses
    }

    /// Overwrite a fuse value directly
    pub fn set_fuse(&mut self, fuse: Fuse, value: u8) {
        self.fuses[fuse as usize] = value | !self.config.fuse_mask[fuse as usize];
    }

    /// Configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Injected faults
    pub fn faults_mut(&mut self) -> &mut DummyFaults {
        &mut self.faults
    }

    /// Every instruction executed in programming mode, in order
    pub fn trace(&self) -> &[TargetOp] {
        &self.trace
    }

    /// Forget the recorded trace
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Number of recorded instructions matching a predicate
    pub fn count(&self, pred: impl Fn(&TargetOp) -> bool) -> usize {
        self.trace.iter().filter(|op| pred(op)).count()
    }

    /// Programming-enable attempts since creation
    pub fn enable_attempts(&self) -> u32 {
        self.enable_attempts
    }

    /// Whether the target is in programming mode
    pub fn is_programming(&self) -> bool {
        self.programming
    }

    /// Last selected bus speed
    pub fn speed(&self) -> BusSpeed {
        self.speed
    }

    /// Whether the clock output is enabled
    pub fn clock_output(&self) -> bool {
        self.clock_output
    }

    /// Total simulated delay
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Whether lock bits LB1/LB2 block flash programming
    pub fn flash_locked(&self) -> bool {
        self.fuses[Fuse::Lock as usize] & 0x03 != 0x03
    }

    fn start_busy(&mut self) {
        self.busy_remaining = self.config.busy_polls;
    }

    fn write_fuse(&mut self, fuse: Fuse, value: u8) {
        self.trace.push(TargetOp::WriteFuse { fuse, value });
        self.start_busy();
        if self.faults.stuck_fuse == Some(fuse) {
            return;
        }
        let unimplemented = !self.config.fuse_mask[fuse as usize];
        let slot = &mut self.fuses[fuse as usize];
        *slot = match fuse {
            // Lock bits can only go from 1 to 0
            Fuse::Lock => (*slot & value) | unimplemented,
            _ => value | unimplemented,
        };
    }

    fn read_flash(&self, address: u32) -> u8 {
        let value = self.flash.get(address as usize).copied().unwrap_or(0xFF);
        match self.faults.flipped_bits {
            Some((fault_address, mask)) if fault_address == address => value ^ mask,
            _ => value,
        }
    }

    fn commit(&mut self, word_address: u16) {
        self.start_busy();
        let page_size = self.config.page_size;
        let start = (word_address as usize * 2) / page_size * page_size;
        if self.flash_locked() {
            log::debug!("dummy: commit at 0x{:04X} ignored, flash locked", start);
        } else if start + page_size <= self.flash.len() {
            for (cell, &byte) in self.flash[start..start + page_size]
                .iter_mut()
                .zip(self.page_buffer.iter())
            {
                *cell &= byte;
            }
        }
        self.page_buffer.fill(0xFF);
    }

    fn execute(&mut self, request: [u8; 4]) -> [u8; 4] {
        let [a, b, c, d] = request;
        let mut response = [0x00, a, b, c];

        match (a, b) {
            (opcodes::PROGRAMMING, opcodes::CHIP_ERASE) => {
                self.trace.push(TargetOp::ChipErase);
                self.flash.fill(0xFF);
                self.fuses[Fuse::Lock as usize] = 0xFF;
                self.start_busy();
            }
            (opcodes::PROGRAMMING, opcodes::WRITE_FUSE_LOW) => self.write_fuse(Fuse::Low, d),
            (opcodes::PROGRAMMING, opcodes::WRITE_FUSE_HIGH) => self.write_fuse(Fuse::High, d),
            (opcodes::PROGRAMMING, opcodes::WRITE_FUSE_EXT) => self.write_fuse(Fuse::Ext, d),
            (opcodes::PROGRAMMING, opcodes::WRITE_LOCK) => self.write_fuse(Fuse::Lock, d),
            (opcodes::POLL_READY, _) => {
                self.trace.push(TargetOp::PollReady);
                let busy = self.faults.stuck_busy || self.busy_remaining > 0;
                self.busy_remaining = self.busy_remaining.saturating_sub(1);
                response[3] = busy as u8;
            }
            (opcodes::READ_SIGNATURE, _) => {
                self.trace.push(TargetOp::ReadSignature(c));
                response[3] = match c {
                    0 => ATMEL_ID,
                    1 => (self.config.signature >> 8) as u8,
                    2 => self.config.signature as u8,
                    _ => 0xFF,
                };
            }
            (0x50, 0x00) | (0x58, 0x08) | (0x50, 0x08) | (0x58, 0x00) => {
                let fuse = match [a, b] {
                    opcodes::READ_FUSE_LOW => Fuse::Low,
                    opcodes::READ_FUSE_HIGH => Fuse::High,
                    opcodes::READ_FUSE_EXT => Fuse::Ext,
                    _ => Fuse::Lock,
                };
                self.trace.push(TargetOp::ReadFuse(fuse));
                response[3] = self.fuses[fuse as usize];
            }
            (opcodes::LOAD_PAGE_LOW | opcodes::LOAD_PAGE_HIGH, _) => {
                let word = u16::from_be_bytes([b, c]);
                let high = a == opcodes::LOAD_PAGE_HIGH;
                self.trace.push(TargetOp::LoadPage { word, high, value: d });
                let words_per_page = self.config.page_size / 2;
                let index = (word as usize % words_per_page) * 2 + high as usize;
                self.page_buffer[index] = d;
            }
            (opcodes::WRITE_PAGE, _) => {
                let word_address = u16::from_be_bytes([b, c]);
                self.trace.push(TargetOp::WritePage { word_address });
                self.commit(word_address);
                if self.faults.corrupt_commit_echo {
                    response[3] ^= 0x01;
                }
            }
            (opcodes::READ_FLASH_LOW | opcodes::READ_FLASH_HIGH, _) => {
                let word = u16::from_be_bytes([b, c]) as u32;
                let address = word * 2 + (a == opcodes::READ_FLASH_HIGH) as u32;
                self.trace.push(TargetOp::ReadFlash { address });
                response[3] = self.read_flash(address);
            }
            _ => {
                log::debug!("dummy: unknown instruction {:02X?}", request);
                self.trace.push(TargetOp::Unknown(request));
                response = [0xFF; 4];
            }
        }

        response
    }
}

#[cfg(feature = "alloc")]
impl IspBus for DummyTarget {
    fn transfer(&mut self, request: [u8; 4]) -> Result<[u8; 4]> {
        if !self.reset_low {
            // Target is running; MISO is not driven
            return Ok([0xFF; 4]);
        }

        if request[..2] == [opcodes::PROGRAMMING, opcodes::PROGRAMMING_ENABLE] {
            self.enable_attempts += 1;
            let accepted = self
                .config
                .sync_after
                .is_some_and(|rejected| self.enable_attempts > rejected);
            self.trace.push(TargetOp::ProgrammingEnable { accepted });
            if accepted {
                self.programming = true;
                return Ok([0x00, request[0], request[1], request[2]]);
            }
            return Ok([0xFF; 4]);
        }

        if !self.programming {
            return Ok([0xFF; 4]);
        }
        Ok(self.execute(request))
    }

    fn set_speed(&mut self, speed: BusSpeed) {
        self.speed = speed;
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        if high {
            // A reset pulse drops the target out of programming mode
            self.programming = false;
        }
        self.reset_low = !high;
        Ok(())
    }

    fn idle_clock(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) {
        self.reset_low = false;
        self.programming = false;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += ms as u64;
    }

    fn set_clock_output(&mut self, enabled: bool) -> Result<()> {
        self.clock_output = enabled;
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests;
