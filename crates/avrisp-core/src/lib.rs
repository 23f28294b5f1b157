//! avrisp-core - Core library for AVR in-system programming
//!
//! This crate drives the AVR serial programming protocol: the 4-byte
//! request / 3-byte response exchange over SCK/MOSI/MISO with the target held
//! in reset. It is designed to be `no_std` compatible so the same engine can
//! run on a standalone programmer board or on a host talking to GPIO lines.
//!
//! # Layout
//!
//! - [`programmer`] - the [`IspBus`](programmer::IspBus) transport trait and
//!   bitbang helpers
//! - [`isp`] - opcodes and command encoding
//! - [`protocol`] - single-instruction helpers (signature, fuses, polling)
//! - [`session`] - the programming-enable handshake and session state
//! - [`chip`] - chip descriptors and the signature registry
//! - [`fuse`] - fuse programming, verification and locking
//! - [`flash`] - page programming, verification and read-back
//! - [`image`] - firmware image representations
//! - [`hex`] - Intel HEX record decoding
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable boxed bus trait objects
//!
//! # Example
//!
//! ```ignore
//! use avrisp_core::chip::ChipRegistry;
//! use avrisp_core::{chip, flash, session::IspSession};
//!
//! let mut session = IspSession::new(bus);
//! session.begin(false)?;
//! let chip = chip::resolve(&mut session, &ChipRegistry::builtin(), 0)?;
//! flash::upload_image(&mut session, &chip, &IMAGE)?;
//! session.end();
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod chip;
pub mod error;
pub mod flash;
pub mod fuse;
pub mod hex;
pub mod image;
pub mod isp;
pub mod programmer;
pub mod protocol;
pub mod session;

pub use error::{Error, ErrorClass, Result};

#[cfg(test)]
mod testing;
