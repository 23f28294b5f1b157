//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use avrisp_core::programmer::IspBus;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated AVR target for testing (chip=<name>,sync=<n>,busy=<polls>)",
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description: "Linux GPIO bitbang (gpiochip=<n>,sck=,mosi=,miso=,reset=,slow=<kHz>,fast=<kHz>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a programmer name or alias to its primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the programmer named by a programmer string
#[allow(unused_variables)]
pub fn open_programmer(
    programmer: &str,
) -> Result<Box<dyn IspBus + Send>, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => return Err(unknown_programmer_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&options),

        #[cfg(feature = "linux-gpio")]
        "linux_gpio" => {
            log::info!("Opening Linux GPIO programmer...");
            avrisp_linux_gpio::open_linux_gpio_isp(&options).map_err(|e| {
                format!(
                    "Failed to open Linux GPIO programmer: {}\n\
                     Make sure the gpiochip exists and you have read/write permissions.",
                    e
                )
                .into()
            })
        }

        _ => Err(unknown_programmer_error(name)),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(
    options: &[(&str, &str)],
) -> Result<Box<dyn IspBus + Send>, Box<dyn std::error::Error>> {
    use avrisp_core::chip::ChipRegistry;
    use avrisp_dummy::{DummyConfig, DummyTarget};

    let mut config = DummyConfig::default();
    for (key, value) in options {
        match *key {
            "chip" => {
                let chip = ChipRegistry::builtin()
                    .find_by_name(value)
                    .ok_or_else(|| format!("dummy: unknown chip '{}'", value))?;
                config = DummyConfig {
                    sync_after: config.sync_after,
                    busy_polls: config.busy_polls,
                    ..DummyConfig::for_chip(chip)
                };
            }
            "sync" => {
                config.sync_after = match *value {
                    "never" => None,
                    n => Some(
                        n.parse()
                            .map_err(|_| format!("dummy: invalid sync value '{}'", n))?,
                    ),
                };
            }
            "busy" => {
                config.busy_polls = value
                    .parse()
                    .map_err(|_| format!("dummy: invalid busy value '{}'", value))?;
            }
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    log::info!("Opening simulated target (signature 0x{:04X})", config.signature);
    Ok(Box::new(DummyTarget::new(config)))
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'avrisp list-programmers' for more details");
    msg.into()
}
