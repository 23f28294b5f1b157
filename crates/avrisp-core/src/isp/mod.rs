//! ISP instruction definitions
//!
//! This module provides the instruction opcodes and the [`IspCommand`]
//! encoder used to build 4-byte requests.

mod command;
pub mod opcodes;

pub use command::{IspCommand, Response};
