//! Flash programming
//!
//! This module provides the page-oriented write, verify and read-back
//! operations. All of them hold one [`PageBuffer`] for the duration of the
//! call.

mod buffer;
mod operations;
mod rip;

pub use buffer::{is_blank, PageBuffer, MAX_PAGE_SIZE};
pub use operations::*;
pub use rip::rip_pages;
