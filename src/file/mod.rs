//! Byte-level input handling.
//!
//! - [`crate::file::io`] - little-endian primitive reads and writes
//! - [`crate::file::parser`] - cursor-based reader used by the IL decoder

pub mod io;
pub mod parser;
