//! CIL bytecode decoding.
//!
//! Turns the raw IL byte stream of a method body into [`crate::assembly::Instruction`]s. The
//! decoder resolves everything the control flow builder needs up front:
//!
//! - Relative branch displacements become absolute target offsets ([`Operand::Target`])
//! - Switch tables become ordered lists of absolute offsets ([`Operand::Switch`])
//! - Tokens of call-kind instructions are resolved through a [`CalleeResolver`] into a
//!   [`CalleeDescriptor`] ([`Operand::Method`]); tokens that cannot be resolved are kept as
//!   [`Operand::Token`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilflow::{assembly::{decode_stream, Operand}, Parser};
//!
//! // ldarg.0; brtrue.s +1; nop; ret
//! let il = [0x02, 0x2D, 0x01, 0x00, 0x2A];
//! let mut parser = Parser::new(&il);
//! let instructions = decode_stream(&mut parser, &())?;
//!
//! assert_eq!(instructions.len(), 4);
//! assert_eq!(instructions[1].operand, Operand::Target(4));
//! # Ok::<(), cilflow::Error>(())
//! ```

use std::collections::HashMap;

use log::trace;

use crate::{
    assembly::{
        instruction::{CalleeDescriptor, FlowControl, Immediate, Instruction, Operand, OperandType},
        opcodes::{self, FE_PREFIX},
    },
    file::parser::Parser,
    metadata::token::Token,
    Result,
};

/// Supplies the call shape for tokens referenced by call-kind instructions.
///
/// Implemented for `()` (resolves nothing), for token → descriptor maps, and for slices of
/// [`crate::metadata::MethodDefinition`].
pub trait CalleeResolver {
    /// Returns the call shape of the method named by `token`, if known.
    fn resolve_callee(&self, token: Token) -> Option<CalleeDescriptor>;
}

impl CalleeResolver for () {
    fn resolve_callee(&self, _token: Token) -> Option<CalleeDescriptor> {
        None
    }
}

impl<S: std::hash::BuildHasher> CalleeResolver for HashMap<Token, CalleeDescriptor, S> {
    fn resolve_callee(&self, token: Token) -> Option<CalleeDescriptor> {
        self.get(&token).copied()
    }
}

impl<R: CalleeResolver + ?Sized> CalleeResolver for &R {
    fn resolve_callee(&self, token: Token) -> Option<CalleeDescriptor> {
        (**self).resolve_callee(token)
    }
}

/// Decodes all instructions from the parser position to the end of its buffer.
///
/// Instruction offsets are relative to the start of the buffer, which is expected to be the
/// start of the method's IL.
///
/// # Errors
///
/// Returns [`crate::Error`] if any instruction fails to decode, see [`decode_instruction`].
pub fn decode_stream<R>(parser: &mut Parser, resolver: &R) -> Result<Vec<Instruction>>
where
    R: CalleeResolver + ?Sized,
{
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        instructions.push(decode_instruction(parser, resolver)?);
    }

    Ok(instructions)
}

/// Decodes a single CIL instruction at the current parser position.
///
/// The parser is advanced past the opcode and its operand.
///
/// # Errors
///
/// - [`crate::Error::OutOfBounds`] if the opcode or operand is truncated, including switch
///   tables that do not fit in the remaining bytes
/// - [`crate::Error::Malformed`] for reserved opcodes and branch targets outside the method
pub fn decode_instruction<R>(parser: &mut Parser, resolver: &R) -> Result<Instruction>
where
    R: CalleeResolver + ?Sized,
{
    let offset = parser.offset()?;

    let value = match parser.read_le::<u8>()? {
        FE_PREFIX => u16::from_be_bytes([FE_PREFIX, parser.read_le::<u8>()?]),
        byte => u16::from(byte),
    };
    let opcode = opcodes::by_value(value).ok_or_else(|| {
        malformed_error!("Invalid or reserved opcode {:04X} at IL_{:04x}", value, offset)
    })?;

    let operand = match opcode.operand_type {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)),
        OperandType::UInt16 => Operand::Immediate(Immediate::UInt16(parser.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)),
        OperandType::Int64 => Operand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)),
        OperandType::Float32 => Operand::Immediate(Immediate::Float32(parser.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Immediate(Immediate::Float64(parser.read_le::<f64>()?)),
        OperandType::Token => Operand::Token(Token::new(parser.read_le::<u32>()?)),
        OperandType::Switch => {
            let displacements = parser.read_switch_table()?;
            let end = parser.offset()?;
            let targets = displacements
                .into_iter()
                .map(|displacement| relative_target(end, displacement))
                .collect::<Result<Vec<u32>>>()?;

            Operand::Switch(targets)
        }
    };

    let end = parser.offset()?;
    let operand = match (opcode.flow_control, operand) {
        (FlowControl::Branch | FlowControl::ConditionalBranch, Operand::Immediate(imm)) => {
            let displacement = match imm {
                Immediate::Int8(value) => i32::from(value),
                Immediate::Int32(value) => value,
                _ => {
                    return Err(malformed_error!(
                        "Branch '{}' at IL_{:04x} has a non-displacement operand",
                        opcode.mnemonic,
                        offset
                    ))
                }
            };
            Operand::Target(relative_target(end, displacement)?)
        }
        (FlowControl::Call, Operand::Token(token)) => match resolver.resolve_callee(token) {
            Some(callee) => {
                trace!("IL_{offset:04x}: resolved callee {token} as {callee:?}");
                Operand::Method { token, callee }
            }
            None => {
                trace!("IL_{offset:04x}: callee {token} left unresolved");
                Operand::Token(token)
            }
        },
        (_, operand) => operand,
    };

    Ok(Instruction::new(offset, end - offset, opcode, operand))
}

fn relative_target(next_offset: u32, displacement: i32) -> Result<u32> {
    next_offset.checked_add_signed(displacement).ok_or_else(|| {
        malformed_error!(
            "Branch displacement {} from IL_{:04x} leaves the method",
            displacement,
            next_offset
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn decode_instruction_basic() {
        // ldloc.s 10
        let mut parser = Parser::new(&[0x11, 0x0A]);
        let result = decode_instruction(&mut parser, &()).unwrap();

        assert_eq!(result.offset, 0);
        assert_eq!(result.size, 2);
        assert_eq!(result.mnemonic(), "ldloc.s");
        assert_eq!(result.flow_control(), FlowControl::Next);
        assert_eq!(result.operand, Operand::Immediate(Immediate::UInt8(10)));
    }

    #[test]
    fn decode_instruction_two_byte() {
        // ceq
        let mut parser = Parser::new(&[0xFE, 0x01]);
        let result = decode_instruction(&mut parser, &()).unwrap();

        assert_eq!(result.mnemonic(), "ceq");
        assert_eq!(result.size, 2);
        assert_eq!(result.opcode.value, 0xFE01);
    }

    #[test]
    fn decode_branch_targets() {
        // nop; br.s -3 (back to offset 0); br +0
        let il = [0x00, 0x2B, 0xFD, 0x38, 0x00, 0x00, 0x00, 0x00];
        let mut parser = Parser::new(&il);
        let instructions = decode_stream(&mut parser, &()).unwrap();

        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[1].branch_target(), Some(0));
        assert_eq!(instructions[2].offset, 3);
        assert_eq!(instructions[2].size, 5);
        assert_eq!(instructions[2].branch_target(), Some(8));
    }

    #[test]
    fn decode_switch_targets() {
        // switch (2 cases: +0, +2); nop; nop; ret
        let il = [
            0x45, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x2A,
        ];
        let mut parser = Parser::new(&il);
        let instructions = decode_stream(&mut parser, &()).unwrap();

        assert_eq!(instructions[0].size, 13);
        assert_eq!(instructions[0].switch_targets(), Some(&[13, 15][..]));
        assert_eq!(instructions[3].offset, 15);
    }

    #[test]
    fn decode_call_resolution() {
        let token = Token::new(0x0A00_0001);
        let callee = CalleeDescriptor::new(2, true, false);
        let mut resolver = HashMap::new();
        resolver.insert(token, callee);

        // call 0x0A000001
        let il = [0x28, 0x01, 0x00, 0x00, 0x0A];
        let mut parser = Parser::new(&il);
        let resolved = decode_instruction(&mut parser, &resolver).unwrap();
        assert_eq!(resolved.operand, Operand::Method { token, callee });
        assert_eq!(resolved.callee(), Some(&callee));

        let mut parser = Parser::new(&il);
        let unresolved = decode_instruction(&mut parser, &()).unwrap();
        assert_eq!(unresolved.operand, Operand::Token(token));
    }

    #[test]
    fn decode_errors() {
        // reserved opcode
        let mut parser = Parser::new(&[0x24]);
        assert!(matches!(
            decode_instruction(&mut parser, &()),
            Err(Error::Malformed { .. })
        ));

        // truncated operand
        let mut parser = Parser::new(&[0x20, 0x01, 0x00]);
        assert!(matches!(
            decode_instruction(&mut parser, &()),
            Err(Error::OutOfBounds)
        ));

        // switch table larger than the buffer
        let mut parser = Parser::new(&[0x45, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            decode_instruction(&mut parser, &()),
            Err(Error::OutOfBounds)
        ));

        // branch before the start of the method
        let mut parser = Parser::new(&[0x2B, 0x80]);
        assert!(matches!(
            decode_instruction(&mut parser, &()),
            Err(Error::Malformed { .. })
        ));
    }
}
