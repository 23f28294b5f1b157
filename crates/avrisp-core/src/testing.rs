//! Scripted bus shared by unit tests

use std::collections::VecDeque;

use crate::error::Result;
use crate::programmer::{BusSpeed, IspBus};

/// Everything the code under test did to the bus, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Transfer([u8; 4]),
    Speed(BusSpeed),
    Reset(bool),
    IdleClock,
    Release,
    Delay(u32),
    ClockOutput(bool),
}

/// Bus that replays canned responses and records every request
///
/// Programming-enable requests are answered by the sync policy: the
/// `sync_on`-th attempt (1-based) echoes `0x53`, all others echo garbage.
/// Other requests pop `responses`, falling back to `idle_response`.
pub struct ScriptedBus {
    pub responses: VecDeque<[u8; 4]>,
    pub idle_response: [u8; 4],
    pub sync_on: Option<usize>,
    pub enable_attempts: usize,
    pub events: Vec<BusEvent>,
}

impl Default for ScriptedBus {
    fn default() -> Self {
        Self {
            responses: VecDeque::new(),
            idle_response: [0; 4],
            sync_on: Some(1),
            enable_attempts: 0,
            events: Vec::new(),
        }
    }
}

impl ScriptedBus {
    pub fn sent(&self) -> Vec<[u8; 4]> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BusEvent::Transfer(bytes) => Some(*bytes),
                _ => None,
            })
            .collect()
    }
}

impl IspBus for ScriptedBus {
    fn transfer(&mut self, request: [u8; 4]) -> Result<[u8; 4]> {
        self.events.push(BusEvent::Transfer(request));
        if request == [0xAC, 0x53, 0x00, 0x00] {
            self.enable_attempts += 1;
            return Ok(if self.sync_on == Some(self.enable_attempts) {
                [0xFF, 0xAC, 0x53, 0x00]
            } else {
                [0xFF, 0xFF, 0xFF, 0xFF]
            });
        }
        Ok(self.responses.pop_front().unwrap_or(self.idle_response))
    }

    fn set_speed(&mut self, speed: BusSpeed) {
        self.events.push(BusEvent::Speed(speed));
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        self.events.push(BusEvent::Reset(high));
        Ok(())
    }

    fn idle_clock(&mut self) -> Result<()> {
        self.events.push(BusEvent::IdleClock);
        Ok(())
    }

    fn release(&mut self) {
        self.events.push(BusEvent::Release);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.events.push(BusEvent::Delay(ms));
    }

    fn set_clock_output(&mut self, enabled: bool) -> Result<()> {
        self.events.push(BusEvent::ClockOutput(enabled));
        Ok(())
    }
}
