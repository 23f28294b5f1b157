//! Programmer traits and abstractions
//!
//! This module defines the bus trait that all programmers must implement
//! to talk to an AVR target.

pub mod bitbang;
mod traits;

pub use bitbang::BitbangIsp;
pub use traits::*;
