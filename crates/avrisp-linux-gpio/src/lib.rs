//! avrisp-linux-gpio - Linux GPIO bitbang ISP support
//!
//! This crate drives an AVR target's serial programming interface from four
//! GPIO pins using the Linux character device GPIO interface (gpiocdev).
//!
//! # Example
//!
//! ```no_run
//! use avrisp_core::session::IspSession;
//! use avrisp_linux_gpio::{LinuxGpioIsp, LinuxGpioIspConfig};
//!
//! let config = LinuxGpioIspConfig::new("/dev/gpiochip0", 11, 10, 9, 25);
//! //                                    device          SCK MOSI MISO RESET
//!
//! let mut session = IspSession::new(LinuxGpioIsp::open(&config)?);
//! session.begin(false)?;
//! let signature = avrisp_core::chip::read_signature(&mut session)?;
//! println!("Signature: 0x{:04X}", signature);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with avrisp CLI
//!
//! ```bash
//! avrisp probe -p linux_gpio:gpiochip=0,sck=11,mosi=10,miso=9,reset=25
//!
//! # Slower clocks for a target running from the 128 kHz oscillator
//! avrisp upload -p linux_gpio:gpiochip=0,sck=11,mosi=10,miso=9,reset=25,slow=16,fast=16 blink.hex
//! ```
//!
//! # GPIO Pin Wiring
//!
//! | Target Pin | GPIO Function  |
//! |------------|----------------|
//! | SCK        | SCK (output)   |
//! | MOSI       | MOSI (output)  |
//! | MISO       | MISO (input)   |
//! | RESET      | RESET (output) |
//! | GND        | GND            |
//!
//! The target must run at the host's I/O voltage, or go through a level
//! shifter.

pub mod device;
pub mod error;

pub use device::{parse_options, LinuxGpioIsp, LinuxGpioIspConfig};
pub use error::{LinuxGpioError, Result};

/// Open a Linux GPIO ISP bus and return it boxed
///
/// Convenience for the CLI programmer dispatch; `options` are the
/// key-value pairs from the programmer string (see [`parse_options`]).
pub fn open_linux_gpio_isp(
    options: &[(&str, &str)],
) -> std::result::Result<
    Box<dyn avrisp_core::programmer::IspBus + Send>,
    Box<dyn std::error::Error>,
> {
    let config = parse_options(options)?;
    let bus = LinuxGpioIsp::open(&config)?;
    Ok(Box::new(bus))
}
