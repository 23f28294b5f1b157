//! Protocol implementations
//!
//! This module contains the single-instruction sequences of the AVR serial
//! programming protocol. They operate on a bare [`IspBus`](crate::programmer::IspBus)
//! and do not check session state; use the [`session`](crate::session)
//! layer for that.

mod serial;

pub use serial::*;
