//! Linux GPIO ISP bitbanging device implementation
//!
//! This module provides the `LinuxGpioIsp` struct that implements the `IspBus`
//! trait using Linux's GPIO character device interface (gpiocdev).
//!
//! The four ISP signals are plain GPIO lines. While the bus is released all
//! of them are inputs, so the target's own pull-up keeps RESET high and the
//! application runs. The first reset or clock request drives SCK, MOSI and
//! RESET as outputs again.

use std::time::Duration;

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use avrisp_core::error::{Error as CoreError, Result as CoreResult};
use avrisp_core::programmer::bitbang::{self, BitbangIsp};
use avrisp_core::programmer::{BusSpeed, IspBus};

/// GPIO line indices
#[derive(Debug, Clone, Copy)]
enum Line {
    Sck = 0,
    Mosi = 1,
    Miso = 2,
    Reset = 3,
}

const NUM_LINES: usize = 4;

/// Half-period for the slow clock (~125 kHz), safe on a 1 MHz target
const DEFAULT_SLOW_HALF_PERIOD_NS: u64 = 4_000;

/// Half-period for the fast clock (~2 MHz), for a 16 MHz target
const DEFAULT_FAST_HALF_PERIOD_NS: u64 = 250;

/// Configuration for opening a Linux GPIO ISP device
#[derive(Debug, Clone)]
pub struct LinuxGpioIspConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// SCK GPIO line offset
    pub sck: Offset,
    /// MOSI GPIO line offset
    pub mosi: Offset,
    /// MISO GPIO line offset
    pub miso: Offset,
    /// Line wired to the target's RESET pin
    pub reset: Offset,
    /// Half-period delay for [`BusSpeed::Slow`] in nanoseconds
    pub slow_half_period_ns: u64,
    /// Half-period delay for [`BusSpeed::Fast`] in nanoseconds
    pub fast_half_period_ns: u64,
}

impl Default for LinuxGpioIspConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            sck: 0,
            mosi: 0,
            miso: 0,
            reset: 0,
            slow_half_period_ns: DEFAULT_SLOW_HALF_PERIOD_NS,
            fast_half_period_ns: DEFAULT_FAST_HALF_PERIOD_NS,
        }
    }
}

fn half_period_for_hz(hz: u32) -> u64 {
    500_000_000 / hz as u64
}

impl LinuxGpioIspConfig {
    /// Create a new configuration with the given device path and pins
    pub fn new(
        device: impl Into<String>,
        sck: Offset,
        mosi: Offset,
        miso: Offset,
        reset: Offset,
    ) -> Self {
        Self {
            device: device.into(),
            sck,
            mosi,
            miso,
            reset,
            ..Default::default()
        }
    }

    /// Set the slow clock in Hz (approximate)
    pub fn with_slow_hz(mut self, hz: u32) -> Self {
        if hz > 0 {
            self.slow_half_period_ns = half_period_for_hz(hz);
        }
        self
    }

    /// Set the fast clock in Hz (approximate)
    pub fn with_fast_hz(mut self, hz: u32) -> Self {
        if hz > 0 {
            self.fast_half_period_ns = half_period_for_hz(hz);
        }
        self
    }

    fn offsets(&self) -> [Offset; NUM_LINES] {
        let mut offsets = [0; NUM_LINES];
        offsets[Line::Sck as usize] = self.sck;
        offsets[Line::Mosi as usize] = self.mosi;
        offsets[Line::Miso as usize] = self.miso;
        offsets[Line::Reset as usize] = self.reset;
        offsets
    }

    /// Check that every ISP signal has its own line
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        let offsets = self.offsets();
        for (i, offset) in offsets.iter().enumerate() {
            if offsets[i + 1..].contains(offset) {
                return Err(LinuxGpioError::DuplicateLine(*offset));
            }
        }
        Ok(())
    }
}

fn level(high: bool) -> Value {
    if high {
        Value::Active
    } else {
        Value::Inactive
    }
}

/// Linux GPIO ISP programmer using bitbanging
///
/// Implements [`BitbangIsp`] for the line-level access and [`IspBus`] on
/// top of it.
pub struct LinuxGpioIsp {
    /// GPIO line request handle
    request: Request,
    /// GPIO line offsets indexed by Line enum
    offsets: [Offset; NUM_LINES],
    slow_half_period_ns: u64,
    fast_half_period_ns: u64,
    /// Half-period currently in use
    half_period_ns: u64,
    /// Whether SCK, MOSI and RESET are outputs
    driven: bool,
    /// Last requested RESET level
    reset_high: bool,
}

impl LinuxGpioIsp {
    /// Open a Linux GPIO ISP device with the given configuration
    ///
    /// All lines start as inputs, leaving the target running.
    pub fn open(config: &LinuxGpioIspConfig) -> Result<Self> {
        config.validate()?;

        log::debug!("linux_gpio_isp: Opening device {}", config.device);

        let offsets = config.offsets();
        let mut req_config = Config::default();
        for offset in offsets {
            req_config.with_line(offset).as_input();
        }

        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer("avrisp")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio_isp: Opened {} (sck={}, mosi={}, miso={}, reset={})",
            config.device,
            config.sck,
            config.mosi,
            config.miso,
            config.reset
        );

        Ok(Self {
            request,
            offsets,
            slow_half_period_ns: config.slow_half_period_ns,
            fast_half_period_ns: config.fast_half_period_ns,
            half_period_ns: config.slow_half_period_ns,
            driven: false,
            reset_high: true,
        })
    }

    fn offset(&self, line: Line) -> Offset {
        self.offsets[line as usize]
    }

    fn reconfigure(&mut self, drive: bool) -> Result<()> {
        let mut cfg = Config::default();
        if drive {
            cfg.with_line(self.offset(Line::Sck))
                .as_output(Value::Inactive);
            cfg.with_line(self.offset(Line::Mosi))
                .as_output(Value::Inactive);
            cfg.with_line(self.offset(Line::Reset))
                .as_output(level(self.reset_high));
            cfg.with_line(self.offset(Line::Miso)).as_input();
        } else {
            for offset in self.offsets {
                cfg.with_line(offset).as_input();
            }
        }
        self.request
            .reconfigure(&cfg)
            .map_err(LinuxGpioError::ReconfigureFailed)?;
        self.driven = drive;
        Ok(())
    }

    /// Switch the output lines on if the bus is released
    fn ensure_driven(&mut self) -> CoreResult<()> {
        if self.driven {
            return Ok(());
        }
        self.reconfigure(true).map_err(|e| {
            log::error!("linux_gpio_isp: {}", e);
            CoreError::Transport
        })
    }

    fn set_line(&mut self, line: Line, high: bool) {
        if let Err(e) = self.request.set_value(self.offset(line), level(high)) {
            log::error!("Failed to set {:?}: {}", line, e);
        }
    }
}

impl BitbangIsp for LinuxGpioIsp {
    fn set_sck(&mut self, high: bool) {
        self.set_line(Line::Sck, high);
    }

    fn set_mosi(&mut self, high: bool) {
        self.set_line(Line::Mosi, high);
    }

    fn get_miso(&self) -> bool {
        match self.request.value(self.offset(Line::Miso)) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(e) => {
                log::error!("Failed to get MISO: {}", e);
                false
            }
        }
    }

    fn half_period_delay(&self) {
        if self.half_period_ns > 0 {
            std::thread::sleep(Duration::from_nanos(self.half_period_ns));
        }
    }
}

impl IspBus for LinuxGpioIsp {
    fn transfer(&mut self, request: [u8; 4]) -> CoreResult<[u8; 4]> {
        self.ensure_driven()?;
        Ok(bitbang::exchange(self, request))
    }

    fn set_speed(&mut self, speed: BusSpeed) {
        self.half_period_ns = match speed {
            BusSpeed::Slow => self.slow_half_period_ns,
            BusSpeed::Fast => self.fast_half_period_ns,
        };
    }

    fn set_reset(&mut self, high: bool) -> CoreResult<()> {
        self.reset_high = high;
        self.ensure_driven()?;
        self.request
            .set_value(self.offset(Line::Reset), level(high))
            .map_err(|e| {
                log::error!("Failed to set RESET: {}", e);
                CoreError::Transport
            })?;
        Ok(())
    }

    fn idle_clock(&mut self) -> CoreResult<()> {
        self.ensure_driven()?;
        self.set_sck(false);
        Ok(())
    }

    fn release(&mut self) {
        self.reset_high = true;
        if let Err(e) = self.reconfigure(false) {
            log::error!("linux_gpio_isp: {}", e);
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

impl Drop for LinuxGpioIsp {
    fn drop(&mut self) {
        if self.driven {
            self.release();
        }
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| LinuxGpioError::InvalidParameter {
        name,
        value: value.to_string(),
    })
}

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `sck=N` - SCK GPIO line offset (required)
/// - `mosi=N` - MOSI GPIO line offset (required)
/// - `miso=N` - MISO GPIO line offset (required)
/// - `reset=N` - line wired to the target's RESET pin (required)
/// - `slow=N` - slow clock in kHz (optional, default ~125 kHz)
/// - `fast=N` - fast clock in kHz (optional, default ~2 MHz)
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxGpioIspConfig> {
    let mut config = LinuxGpioIspConfig::default();
    let mut gpiochip: Option<u32> = None;
    let mut have = [false; NUM_LINES];

    for (key, value) in options {
        match *key {
            "dev" => config.device = value.to_string(),
            "gpiochip" => gpiochip = Some(parse_value("gpiochip", value)?),
            "sck" => {
                config.sck = parse_value("sck", value)?;
                have[Line::Sck as usize] = true;
            }
            "mosi" => {
                config.mosi = parse_value("mosi", value)?;
                have[Line::Mosi as usize] = true;
            }
            "miso" => {
                config.miso = parse_value("miso", value)?;
                have[Line::Miso as usize] = true;
            }
            "reset" | "rst" => {
                config.reset = parse_value("reset", value)?;
                have[Line::Reset as usize] = true;
            }
            "slow" => {
                let khz: u32 = parse_value("slow", value)?;
                config = config.with_slow_hz(khz * 1000);
            }
            "fast" => {
                let khz: u32 = parse_value("fast", value)?;
                config = config.with_fast_hz(khz * 1000);
            }
            _ => {
                log::warn!("linux_gpio_isp: Unknown option: {}={}", key, value);
            }
        }
    }

    match (config.device.is_empty(), gpiochip) {
        (true, Some(n)) => config.device = format!("/dev/gpiochip{}", n),
        (true, None) => return Err(LinuxGpioError::NoDevice),
        (false, Some(_)) => return Err(LinuxGpioError::ConflictingDevice),
        (false, None) => {}
    }

    for (present, name) in have.iter().zip(["sck", "mosi", "miso", "reset"]) {
        if !present {
            return Err(LinuxGpioError::MissingParameter(name));
        }
    }

    config.validate()?;
    Ok(config)
}
