//! Intel HEX records
//!
//! Decoding lives here so a standalone programmer can accept HEX text over
//! a serial link without allocating; encoding into source artifacts lives
//! in the codegen crate.

mod reader;
mod record;

pub use reader::{parse_line, DecodedRecord, HexReader, MAX_RECORD_DATA};
pub use record::{HexRecord, RecordType};
