//! Programmer trait definitions

use crate::error::Result;

/// Clock profile of the serial programming bus
///
/// The target samples SCK with its own system clock, so the high and low
/// phases must each last more than two target clock cycles. `Slow` stays
/// safe on a chip still running from its factory 1 MHz clock and is used
/// for sync, erase, signature and fuses. `Fast` is used for page traffic
/// once the fuses select the external crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BusSpeed {
    /// Conservative clock for unconfigured targets
    #[default]
    Slow,
    /// Fast clock for flash page operations
    Fast,
}

/// ISP bus trait
///
/// This trait represents a programmer that can drive the four ISP lines of
/// an AVR target: SCK, MOSI, MISO and RESET. Which physical line acts as
/// RESET is fixed when the implementation is constructed.
///
/// ## Example
///
/// ```ignore
/// impl IspBus for MyProgrammer {
///     fn transfer(&mut self, request: [u8; 4]) -> Result<[u8; 4]> {
///         let mut response = [0u8; 4];
///         self.spi.transfer(&request, &mut response)
///             .map_err(|_| Error::Transport)?;
///         Ok(response)
///     }
///     // ...
/// }
/// ```
pub trait IspBus {
    /// Exchange one 4-byte instruction, returning the 4 bytes clocked in
    fn transfer(&mut self, request: [u8; 4]) -> Result<[u8; 4]>;

    /// Select the SCK clock profile
    fn set_speed(&mut self, speed: BusSpeed);

    /// Drive the target's RESET line (`true` = high = target running)
    fn set_reset(&mut self, high: bool) -> Result<()>;

    /// Hold SCK low, as required before and during a reset pulse
    fn idle_clock(&mut self) -> Result<()>;

    /// Release every line (high impedance) so the target runs freely
    fn release(&mut self);

    /// Delay for the specified number of milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Enable or disable a clock signal fed to the target's XTAL1 pin
    ///
    /// Only needed for targets whose fuses select an external clock that is
    /// not fitted. Buses without a clock output ignore the request.
    fn set_clock_output(&mut self, _enabled: bool) -> Result<()> {
        Ok(())
    }
}

// Blanket impl for boxed buses to allow trait objects
#[cfg(feature = "alloc")]
impl IspBus for alloc::boxed::Box<dyn IspBus + Send> {
    fn transfer(&mut self, request: [u8; 4]) -> Result<[u8; 4]> {
        (**self).transfer(request)
    }

    fn set_speed(&mut self, speed: BusSpeed) {
        (**self).set_speed(speed)
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        (**self).set_reset(high)
    }

    fn idle_clock(&mut self) -> Result<()> {
        (**self).idle_clock()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn set_clock_output(&mut self, enabled: bool) -> Result<()> {
        (**self).set_clock_output(enabled)
    }
}

impl<B: IspBus + ?Sized> IspBus for &mut B {
    fn transfer(&mut self, request: [u8; 4]) -> Result<[u8; 4]> {
        (**self).transfer(request)
    }

    fn set_speed(&mut self, speed: BusSpeed) {
        (**self).set_speed(speed)
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        (**self).set_reset(high)
    }

    fn idle_clock(&mut self) -> Result<()> {
        (**self).idle_clock()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn set_clock_output(&mut self, enabled: bool) -> Result<()> {
        (**self).set_clock_output(enabled)
    }
}
