//! Sequential reader over the IL bytes of one method body.
//!
//! [`crate::file::parser::Parser`] tracks the current IL offset and hands out bounds-checked
//! little-endian values, instruction offsets as `u32` and whole switch tables. The IL decoder
//! drives it one instruction at a time.
//!
//! # Examples
//!
//! ```rust
//! use cilflow::Parser;
//!
//! // switch with two cases, then ret
//! let il = [0x45, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0xFE, 0xFF, 0xFF, 0xFF, 0x2A];
//! let mut parser = Parser::new(&il);
//!
//! assert_eq!(parser.read_le::<u8>()?, 0x45);
//! assert_eq!(parser.read_switch_table()?, vec![1, -2]);
//! assert_eq!(parser.offset()?, 13);
//! # Ok::<(), cilflow::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Error::OutOfBounds,
    Result,
};

/// Width of one switch case displacement.
const SWITCH_CASE_SIZE: usize = 4;

/// A bounds-checked cursor over IL bytes.
///
/// Every read fails with [`crate::Error::OutOfBounds`] instead of reading past the end, so
/// truncated method bodies surface as errors.
pub struct Parser<'a> {
    il: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Start reading `il` at offset 0.
    #[must_use]
    pub fn new(il: &'a [u8]) -> Self {
        Parser { il, position: 0 }
    }

    /// Size of the IL buffer in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.il.len()
    }

    /// Returns `true` for an empty IL buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.il.is_empty()
    }

    /// Returns `true` while there are bytes left to decode.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.il.len()
    }

    /// Current byte position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.il.len().saturating_sub(self.position)
    }

    /// Current position as an IL offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for bodies larger than the `u32` offset space.
    pub fn offset(&self) -> Result<u32> {
        u32::try_from(self.position)
            .map_err(|_| malformed_error!("IL offset {} exceeds u32 range", self.position))
    }

    /// Read a little-endian `T` and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the remaining bytes.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.il, &mut self.position)
    }

    /// Read a switch operand: a `u32` case count followed by that many `i32` displacements.
    ///
    /// The count is checked against the remaining bytes before anything is allocated.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the table does not fit in the buffer.
    pub fn read_switch_table(&mut self) -> Result<Vec<i32>> {
        let cases = usize::try_from(self.read_le::<u32>()?).map_err(|_| OutOfBounds)?;
        if cases
            .checked_mul(SWITCH_CASE_SIZE)
            .map_or(true, |size| size > self.remaining())
        {
            return Err(OutOfBounds);
        }

        (0..cases).map(|_| self.read_le::<i32>()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn operand_reads() {
        let il = [0x2A, 0x10, 0x00, 0xFE, 0xFF, 0xFF, 0xFF];
        let mut parser = Parser::new(&il);

        assert_eq!(parser.read_le::<u8>().unwrap(), 0x2A);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x0010);
        assert_eq!(parser.offset().unwrap(), 3);
        assert_eq!(parser.read_le::<i32>().unwrap(), -2);
        assert!(!parser.has_more_data());
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn truncated_operand() {
        let mut parser = Parser::new(&[0x01, 0x02]);
        assert!(matches!(parser.read_le::<u32>(), Err(Error::OutOfBounds)));
        assert_eq!(parser.pos(), 0);
        assert_eq!(parser.len(), 2);
        assert!(!parser.is_empty());
    }

    #[test]
    fn switch_table_larger_than_body() {
        // Claims 0x4000_0000 cases with four bytes left.
        let il = [0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00, 0x00];
        let mut parser = Parser::new(&il);
        assert!(matches!(parser.read_switch_table(), Err(Error::OutOfBounds)));
    }

    #[test]
    fn empty_switch_table() {
        let mut parser = Parser::new(&[0x00, 0x00, 0x00, 0x00]);
        assert!(parser.read_switch_table().unwrap().is_empty());
        assert!(!parser.has_more_data());
    }
}
