use std::collections::HashMap;

use crate::{
    assembly::{
        decoder::{decode_stream, CalleeResolver},
        instruction::Instruction,
    },
    file::parser::Parser,
    Error, Result,
};

/// The instruction stream of one method.
///
/// Instructions are stored in program order with strictly increasing offsets. The body is the
/// single source of truth that control flow graphs borrow from: blocks refer to instructions by
/// index into [`MethodBody::instructions`], and the `next` link of an instruction is simply the
/// following index.
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::assembly::MethodBody;
///
/// // ldc.i4.1; ret
/// let body = MethodBody::decode(&[0x17, 0x2A], false, &())?;
/// assert_eq!(body.len(), 2);
/// assert_eq!(body.index_of(1), Some(1));
/// assert!(body.next(1).is_none());
/// # Ok::<(), cilflow::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MethodBody {
    instructions: Vec<Instruction>,
    offsets: HashMap<u32, usize>,
    returns_void: bool,
}

impl MethodBody {
    /// Create a method body from already decoded instructions.
    ///
    /// # Arguments
    ///
    /// * `instructions` - Instructions in program order
    /// * `returns_void` - Whether the enclosing method returns `void`; decides how many values
    ///   `ret` pops
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Empty`] if `instructions` is empty
    /// - [`crate::Error::Malformed`] if offsets are not strictly increasing
    pub fn new(instructions: Vec<Instruction>, returns_void: bool) -> Result<Self> {
        if instructions.is_empty() {
            return Err(Error::Empty);
        }

        let mut offsets = HashMap::with_capacity(instructions.len());
        for (index, window) in instructions.windows(2).enumerate() {
            if window[1].offset <= window[0].offset {
                return Err(malformed_error!(
                    "Instruction {} at IL_{:04x} does not follow IL_{:04x}",
                    index + 1,
                    window[1].offset,
                    window[0].offset
                ));
            }
        }
        for (index, instruction) in instructions.iter().enumerate() {
            offsets.insert(instruction.offset, index);
        }

        Ok(MethodBody {
            instructions,
            offsets,
            returns_void,
        })
    }

    /// Decode a method body from raw IL bytes.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Empty`] if `il` is empty
    /// - Any decoding error from [`crate::assembly::decode_instruction`]
    pub fn decode<R>(il: &[u8], returns_void: bool, resolver: &R) -> Result<Self>
    where
        R: CalleeResolver + ?Sized,
    {
        if il.is_empty() {
            return Err(Error::Empty);
        }

        let mut parser = Parser::new(il);
        let instructions = decode_stream(&mut parser, resolver)?;
        MethodBody::new(instructions, returns_void)
    }

    /// All instructions in program order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always `false`, a body holds at least one instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Index of the instruction starting at `offset`, if any.
    #[must_use]
    pub fn index_of(&self, offset: u32) -> Option<usize> {
        self.offsets.get(&offset).copied()
    }

    /// Instruction starting at `offset`, if any.
    #[must_use]
    pub fn at_offset(&self, offset: u32) -> Option<&Instruction> {
        self.index_of(offset).map(|index| &self.instructions[index])
    }

    /// Index of the instruction following `index` in program order.
    #[must_use]
    pub fn next(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        (next < self.instructions.len()).then_some(next)
    }

    /// Index of the instruction preceding `index` in program order.
    #[must_use]
    pub fn previous(&self, index: usize) -> Option<usize> {
        index.checked_sub(1)
    }

    /// Whether the enclosing method returns `void`.
    #[must_use]
    pub fn returns_void(&self) -> bool {
        self.returns_void
    }

    /// Total size of the IL in bytes.
    #[must_use]
    pub fn code_size(&self) -> u32 {
        self.instructions
            .last()
            .map_or(0, Instruction::next_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{opcodes, Operand};

    fn nop(offset: u32) -> Instruction {
        Instruction::new(offset, 1, opcodes::by_mnemonic("nop").unwrap(), Operand::None)
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(MethodBody::new(Vec::new(), true), Err(Error::Empty)));
        assert!(matches!(MethodBody::decode(&[], true, &()), Err(Error::Empty)));
    }

    #[test]
    fn rejects_unordered_offsets() {
        let result = MethodBody::new(vec![nop(2), nop(2)], true);
        assert!(matches!(result, Err(Error::Malformed { .. })));

        let result = MethodBody::new(vec![nop(4), nop(1)], true);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn links() {
        let body = MethodBody::new(vec![nop(0), nop(1), nop(5)], false).unwrap();
        assert_eq!(body.len(), 3);
        assert_eq!(body.index_of(5), Some(2));
        assert_eq!(body.index_of(3), None);
        assert_eq!(body.next(0), Some(1));
        assert_eq!(body.next(2), None);
        assert_eq!(body.previous(0), None);
        assert_eq!(body.previous(2), Some(1));
        assert_eq!(body.at_offset(1).map(|i| i.offset), Some(1));
        assert_eq!(body.code_size(), 6);
        assert!(!body.returns_void());
    }
}
