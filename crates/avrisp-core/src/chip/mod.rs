//! Chip descriptors, the registry and signature resolution

mod database;
mod probe;
mod types;

pub use database::{ChipRegistry, CHIPS};
pub use probe::{read_signature, resolve};
pub use types::*;
