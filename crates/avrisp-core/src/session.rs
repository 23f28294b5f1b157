//! ISP session and synchronization handshake
//!
//! An [`IspSession`] owns the bus for as long as the target is held in
//! programming mode. Every programming operation in this crate takes the
//! session rather than the bare bus, and fails with [`Error::NotActive`]
//! unless [`IspSession::begin`] has succeeded.
//!
//! ```text
//!   Idle --begin--> Syncing --echo 0x53--> Active --end--> Idle
//!                      |
//!                      +--no echo after N attempts--> Idle (SyncError)
//! ```

use crate::error::{Error, Result};
use crate::programmer::{BusSpeed, IspBus};
use crate::protocol;

/// Timing and retry parameters of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IspConfig {
    /// Length of the initial reset-high pulse
    pub reset_pulse_ms: u32,
    /// Settling time with reset low before programming enable
    pub reset_settle_ms: u32,
    /// Length of the reset-high pulse between retries
    pub retry_pulse_ms: u32,
    /// Settling time with reset low between retries
    pub retry_settle_ms: u32,
    /// Programming-enable attempts before giving up
    pub sync_attempts: u32,
    /// RDY/BSY polls before an operation is declared stuck
    pub busy_poll_limit: u32,
}

impl Default for IspConfig {
    fn default() -> Self {
        Self {
            reset_pulse_ms: 50,
            reset_settle_ms: 50,
            retry_pulse_ms: 5,
            retry_settle_ms: 50,
            sync_attempts: 255,
            busy_poll_limit: 10_000,
        }
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Lines released, target running
    #[default]
    Idle,
    /// Handshake in progress
    Syncing,
    /// Target in programming mode
    Active,
}

/// Exclusive programming session over an ISP bus
///
/// Dropping an active session releases the lines.
pub struct IspSession<B: IspBus> {
    bus: B,
    config: IspConfig,
    state: SessionState,
    clock_output: bool,
}

impl<B: IspBus> IspSession<B> {
    /// Create an idle session with the default configuration
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, IspConfig::default())
    }

    /// Create an idle session with a custom configuration
    pub fn with_config(bus: B, config: IspConfig) -> Self {
        Self {
            bus,
            config,
            state: SessionState::Idle,
            clock_output: false,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether programming commands may be issued
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Session configuration
    pub fn config(&self) -> &IspConfig {
        &self.config
    }

    /// The bus, for programming commands
    ///
    /// Fails with [`Error::NotActive`] unless the session is active.
    pub fn bus(&mut self) -> Result<&mut B> {
        if self.state != SessionState::Active {
            return Err(Error::NotActive);
        }
        Ok(&mut self.bus)
    }

    /// Shared access to the bus regardless of state
    pub fn bus_ref(&self) -> &B {
        &self.bus
    }

    /// Put the target into programming mode
    ///
    /// Drives reset low with SCK low, pulses reset, then issues programming
    /// enable at the slow clock until the target echoes `0x53`, re-pulsing
    /// reset between attempts. If `clock_output` is set the bus's clock
    /// output is enabled first and stays on until [`end`](Self::end).
    ///
    /// Calling `begin` on an active session does nothing.
    pub fn begin(&mut self, clock_output: bool) -> Result<()> {
        if self.state == SessionState::Active {
            return Ok(());
        }

        self.state = SessionState::Syncing;
        match self.synchronize(clock_output) {
            Ok(attempts) => {
                log::debug!("avrisp: in sync after {} attempt(s)", attempts);
                self.state = SessionState::Active;
                Ok(())
            }
            Err(e) => {
                log::warn!("avrisp: handshake failed: {}", e);
                self.shutdown();
                Err(e)
            }
        }
    }

    fn synchronize(&mut self, clock_output: bool) -> Result<u32> {
        if clock_output {
            self.bus.set_clock_output(true)?;
            self.clock_output = true;
        }

        self.bus.set_reset(false)?;
        self.bus.idle_clock()?;
        self.bus.set_reset(true)?;
        self.bus.delay_ms(self.config.reset_pulse_ms);
        self.bus.set_reset(false)?;
        self.bus.delay_ms(self.config.reset_settle_ms);
        self.bus.set_speed(BusSpeed::Slow);

        for attempt in 1..=self.config.sync_attempts {
            if protocol::programming_enable(&mut self.bus)? {
                return Ok(attempt);
            }
            if attempt == self.config.sync_attempts {
                break;
            }
            // Out of sync: the target ignores SCK until reset is pulsed again
            self.bus.idle_clock()?;
            self.bus.set_reset(true)?;
            self.bus.delay_ms(self.config.retry_pulse_ms);
            self.bus.set_reset(false)?;
            self.bus.delay_ms(self.config.retry_settle_ms);
        }

        Err(Error::SyncError)
    }

    /// Leave programming mode and release the lines
    ///
    /// Does nothing on an idle session.
    pub fn end(&mut self) {
        if self.state != SessionState::Idle {
            log::debug!("avrisp: ending session");
            self.shutdown();
        }
    }

    fn shutdown(&mut self) {
        if self.clock_output {
            if let Err(e) = self.bus.set_clock_output(false) {
                log::warn!("avrisp: failed to disable clock output: {}", e);
            }
            self.clock_output = false;
        }
        self.bus.release();
        self.state = SessionState::Idle;
    }
}

impl<B: IspBus> Drop for IspSession<B> {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BusEvent, ScriptedBus};

    #[test]
    fn test_begin_handshake_sequence() {
        let mut session = IspSession::new(ScriptedBus::default());
        session.begin(false).unwrap();
        assert!(session.is_active());
        assert_eq!(
            session.bus_ref().events,
            vec![
                BusEvent::Reset(false),
                BusEvent::IdleClock,
                BusEvent::Reset(true),
                BusEvent::Delay(50),
                BusEvent::Reset(false),
                BusEvent::Delay(50),
                BusEvent::Speed(BusSpeed::Slow),
                BusEvent::Transfer([0xAC, 0x53, 0x00, 0x00]),
            ]
        );
    }

    #[test]
    fn test_begin_retries_with_short_pulse() {
        let bus = ScriptedBus {
            sync_on: Some(3),
            ..Default::default()
        };
        let mut session = IspSession::new(bus);
        session.begin(false).unwrap();
        assert_eq!(session.bus_ref().enable_attempts, 3);

        let retry = [
            BusEvent::Transfer([0xAC, 0x53, 0x00, 0x00]),
            BusEvent::IdleClock,
            BusEvent::Reset(true),
            BusEvent::Delay(5),
            BusEvent::Reset(false),
            BusEvent::Delay(50),
        ];
        let events = &session.bus_ref().events;
        assert_eq!(&events[7..13], &retry);
        assert_eq!(&events[13..19], &retry);
    }

    #[test]
    fn test_sync_error_after_all_attempts() {
        let bus = ScriptedBus {
            sync_on: None,
            ..Default::default()
        };
        let mut session = IspSession::new(bus);
        assert_eq!(session.begin(false), Err(Error::SyncError));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.bus_ref().enable_attempts, 255);
        assert_eq!(session.bus_ref().events.last(), Some(&BusEvent::Release));
        assert_eq!(session.bus().err(), Some(Error::NotActive));
    }

    #[test]
    fn test_commands_require_active_session() {
        let mut session = IspSession::new(ScriptedBus::default());
        assert_eq!(session.bus().err(), Some(Error::NotActive));
        session.begin(false).unwrap();
        assert!(session.bus().is_ok());
        session.end();
        assert_eq!(session.bus().err(), Some(Error::NotActive));
    }

    #[test]
    fn test_begin_when_active_is_noop() {
        let mut session = IspSession::new(ScriptedBus::default());
        session.begin(false).unwrap();
        let before = session.bus_ref().events.len();
        session.begin(false).unwrap();
        assert_eq!(session.bus_ref().events.len(), before);
    }

    #[test]
    fn test_end_is_idempotent_and_disables_clock() {
        let mut session = IspSession::new(ScriptedBus::default());
        session.begin(true).unwrap();
        assert_eq!(session.bus_ref().events[0], BusEvent::ClockOutput(true));

        session.end();
        session.end();
        let events = &session.bus_ref().events;
        let tail = &events[events.len() - 2..];
        assert_eq!(tail, &[BusEvent::ClockOutput(false), BusEvent::Release]);
        assert_eq!(
            events.iter().filter(|e| **e == BusEvent::Release).count(),
            1
        );
    }

    #[test]
    fn test_drop_releases_lines() {
        let mut bus = ScriptedBus::default();
        {
            let mut session = IspSession::new(&mut bus);
            session.begin(false).unwrap();
        }
        assert_eq!(bus.events.last(), Some(&BusEvent::Release));
    }
}
