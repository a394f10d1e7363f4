//! CIL instruction representation, operand types, and stack-effect classification.
//!
//! The types in this module describe a decoded instruction completely enough for control flow
//! analysis: where it sits in the method ([`Instruction::offset`]), how control leaves it
//! ([`FlowControl`]), what it does to the evaluation stack ([`StackPop`] / [`StackPush`]) and
//! the operand that carries branch targets or callee information ([`Operand`]).
//!
//! # Key Components
//!
//! - [`crate::assembly::instruction::Instruction`] - A decoded instruction at a byte offset
//! - [`crate::assembly::instruction::Operand`] - Type-safe operand representation
//! - [`crate::assembly::instruction::FlowControl`] - How control leaves an instruction
//! - [`crate::assembly::instruction::StackPop`] / [`crate::assembly::instruction::StackPush`] -
//!   Stack behaviour categories from ECMA-335 Partition III
//! - [`crate::assembly::instruction::CalleeDescriptor`] - Call shape needed for stack effects
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilflow::assembly::{FlowControl, StackPop};
//!
//! assert!(FlowControl::ConditionalBranch.is_block_delimiter());
//! assert!(!FlowControl::Call.is_block_delimiter());
//! assert_eq!(StackPop::PoprefPopiPopi.fixed_count(), Some(3));
//! assert_eq!(StackPop::Varpop.fixed_count(), None);
//! ```

use std::fmt;

use strum::{Display, EnumCount, EnumIter};

use crate::{assembly::opcodes::OpCode, metadata::token::Token};

/// Encoding of the operand that follows an opcode in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand
    None,
    /// Signed 8-bit (short branch offsets, `ldc.i4.s`)
    Int8,
    /// Unsigned 8-bit (short argument / local indices)
    UInt8,
    /// Unsigned 16-bit (long argument / local indices)
    UInt16,
    /// Signed 32-bit (long branch offsets, `ldc.i4`)
    Int32,
    /// Signed 64-bit
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Metadata token
    Token,
    /// Case count followed by that many 32-bit relative targets
    Switch,
}

impl OperandType {
    /// Returns the operand size in bytes, or `None` for the variable-size switch table.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 => Some(1),
            OperandType::UInt16 => Some(2),
            OperandType::Int32 | OperandType::Float32 | OperandType::Token => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// Immediate operand values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit value
    Int8(i8),
    /// Unsigned 8-bit value
    UInt8(u8),
    /// Unsigned 16-bit value
    UInt16(u16),
    /// Signed 32-bit value
    Int32(i32),
    /// Signed 64-bit value
    Int64(i64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value}"),
            Immediate::UInt8(value) => write!(f, "{value}"),
            Immediate::UInt16(value) => write!(f, "{value}"),
            Immediate::Int32(value) => write!(f, "{value}"),
            Immediate::Int64(value) => write!(f, "{value}"),
            Immediate::Float32(value) => write!(f, "{value}"),
            Immediate::Float64(value) => write!(f, "{value}"),
        }
    }
}

/// The call shape of a method invoked by a call-kind instruction.
///
/// This is all the stack simulator needs to know about a callee: how many arguments it pops
/// and whether it pushes a return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CalleeDescriptor {
    /// Number of declared parameters, excluding the implicit `this`
    pub parameter_count: u32,
    /// The callee takes an implicit receiver argument
    pub has_this: bool,
    /// The callee's return type is `void`
    pub returns_void: bool,
}

impl CalleeDescriptor {
    /// Create a new callee descriptor.
    #[must_use]
    pub const fn new(parameter_count: u32, has_this: bool, returns_void: bool) -> Self {
        CalleeDescriptor {
            parameter_count,
            has_this,
            returns_void,
        }
    }
}

/// Decoded instruction operand.
///
/// Branch operands are stored as absolute offsets within the method body, already resolved
/// from the relative encoding of the byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Immediate value
    Immediate(Immediate),
    /// Absolute target offset of a branch
    Target(u32),
    /// Absolute target offsets of a switch, in case order
    Switch(Vec<u32>),
    /// Metadata token that was not resolved further
    Token(Token),
    /// Call target together with its resolved call shape
    Method {
        /// Token of the called method
        token: Token,
        /// Call shape of the called method
        callee: CalleeDescriptor,
    },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Immediate(imm) => write!(f, "{imm}"),
            Operand::Target(target) => write!(f, "IL_{target:04x}"),
            Operand::Switch(targets) => {
                write!(f, "(")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "IL_{target:04x}")?;
                }
                write!(f, ")")
            }
            Operand::Token(token) | Operand::Method { token, .. } => {
                write!(f, "0x{:08X}", token.value())
            }
        }
    }
}

/// How control leaves an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, EnumIter)]
pub enum FlowControl {
    /// Falls through to the next instruction
    Next,
    /// Unconditional jump (`br`, `leave`)
    Branch,
    /// Jump when a condition holds, otherwise fall through
    ConditionalBranch,
    /// Multi-way jump with fallthrough as the default case
    Switch,
    /// Method call, control returns to the next instruction
    Call,
    /// Leaves the method or a protected region (`ret`, `endfinally`, `endfilter`)
    Return,
    /// Raises an exception (`throw`, `rethrow`)
    Throw,
    /// Debugger breakpoint
    Break,
    /// Prefix that modifies the following instruction
    Meta,
}

impl FlowControl {
    /// Returns `true` if an instruction of this kind ends a basic block.
    ///
    /// `Break` is deliberately not a delimiter: it behaves like a plain fallthrough for block
    /// formation.
    #[must_use]
    pub const fn is_block_delimiter(&self) -> bool {
        matches!(
            self,
            FlowControl::Branch
                | FlowControl::ConditionalBranch
                | FlowControl::Switch
                | FlowControl::Return
                | FlowControl::Throw
        )
    }

    /// Returns `true` if control can continue with the next instruction in program order.
    #[must_use]
    pub const fn falls_through(&self) -> bool {
        matches!(
            self,
            FlowControl::Next
                | FlowControl::ConditionalBranch
                | FlowControl::Switch
                | FlowControl::Call
                | FlowControl::Break
                | FlowControl::Meta
        )
    }
}

/// Stack pop behaviour of an opcode (ECMA-335 Partition III, "stack transition").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StackPop {
    Pop0,
    Pop1,
    Pop1Pop1,
    Popi,
    PopiPop1,
    PopiPopi,
    PopiPopi8,
    PopiPopiPopi,
    PopiPopr4,
    PopiPopr8,
    Popref,
    PoprefPop1,
    PoprefPopi,
    PoprefPopiPopi,
    PoprefPopiPopi8,
    PoprefPopiPopr4,
    PoprefPopiPopr8,
    PoprefPopiPopref,
    /// Empties the evaluation stack (`leave`)
    PopAll,
    /// Depends on the callee or on the enclosing method
    Varpop,
}

impl StackPop {
    /// Number of values popped, or `None` for [`StackPop::PopAll`] and [`StackPop::Varpop`].
    #[must_use]
    pub const fn fixed_count(&self) -> Option<u32> {
        match self {
            StackPop::Pop0 => Some(0),
            StackPop::Pop1 | StackPop::Popi | StackPop::Popref => Some(1),
            StackPop::Pop1Pop1
            | StackPop::PopiPop1
            | StackPop::PopiPopi
            | StackPop::PopiPopi8
            | StackPop::PopiPopr4
            | StackPop::PopiPopr8
            | StackPop::PoprefPop1
            | StackPop::PoprefPopi => Some(2),
            StackPop::PopiPopiPopi
            | StackPop::PoprefPopiPopi
            | StackPop::PoprefPopiPopi8
            | StackPop::PoprefPopiPopr4
            | StackPop::PoprefPopiPopr8
            | StackPop::PoprefPopiPopref => Some(3),
            StackPop::PopAll | StackPop::Varpop => None,
        }
    }
}

/// Stack push behaviour of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StackPush {
    Push0,
    Push1,
    Push1Push1,
    Pushi,
    Pushi8,
    Pushr4,
    Pushr8,
    Pushref,
    /// Depends on the callee's return type
    Varpush,
}

impl StackPush {
    /// Number of values pushed, or `None` for [`StackPush::Varpush`].
    #[must_use]
    pub const fn fixed_count(&self) -> Option<u32> {
        match self {
            StackPush::Push0 => Some(0),
            StackPush::Push1
            | StackPush::Pushi
            | StackPush::Pushi8
            | StackPush::Pushr4
            | StackPush::Pushr8
            | StackPush::Pushref => Some(1),
            StackPush::Push1Push1 => Some(2),
            StackPush::Varpush => None,
        }
    }
}

/// A decoded CIL instruction.
///
/// Instructions are identified by their byte offset within the method body; the successor in
/// program order is found through [`crate::assembly::MethodBody::next`].
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of the instruction within the method body
    pub offset: u32,
    /// Encoded size in bytes, including prefix byte and operand
    pub size: u32,
    /// Static opcode descriptor
    pub opcode: &'static OpCode,
    /// Decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// Create an instruction from its parts.
    #[must_use]
    pub fn new(offset: u32, size: u32, opcode: &'static OpCode, operand: Operand) -> Self {
        Instruction {
            offset,
            size,
            opcode,
            operand,
        }
    }

    /// The instruction mnemonic, e.g. `"brtrue.s"`.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.opcode.mnemonic
    }

    /// How control leaves this instruction.
    #[must_use]
    pub fn flow_control(&self) -> FlowControl {
        self.opcode.flow_control
    }

    /// Returns `true` if this instruction ends a basic block.
    #[must_use]
    pub fn is_block_delimiter(&self) -> bool {
        self.opcode.flow_control.is_block_delimiter()
    }

    /// Absolute target offset of a single-target branch.
    #[must_use]
    pub fn branch_target(&self) -> Option<u32> {
        match self.operand {
            Operand::Target(target) => Some(target),
            _ => None,
        }
    }

    /// Absolute case targets of a switch, in operand order.
    #[must_use]
    pub fn switch_targets(&self) -> Option<&[u32]> {
        match &self.operand {
            Operand::Switch(targets) => Some(targets),
            _ => None,
        }
    }

    /// Resolved call shape of a call-kind instruction.
    #[must_use]
    pub fn callee(&self) -> Option<&CalleeDescriptor> {
        match &self.operand {
            Operand::Method { callee, .. } => Some(callee),
            _ => None,
        }
    }

    /// Offset directly after this instruction.
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset.saturating_add(self.size)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.opcode.mnemonic)?;
        if !matches!(self.operand, Operand::None) {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::assembly::opcodes;

    #[test]
    fn delimiters() {
        let delimiters: Vec<FlowControl> = FlowControl::iter()
            .filter(FlowControl::is_block_delimiter)
            .collect();
        assert_eq!(
            delimiters,
            vec![
                FlowControl::Branch,
                FlowControl::ConditionalBranch,
                FlowControl::Switch,
                FlowControl::Return,
                FlowControl::Throw,
            ]
        );
        assert_eq!(FlowControl::COUNT, 9);
    }

    #[test]
    fn fallthrough() {
        assert!(FlowControl::ConditionalBranch.falls_through());
        assert!(FlowControl::Call.falls_through());
        assert!(!FlowControl::Branch.falls_through());
        assert!(!FlowControl::Return.falls_through());
        assert!(!FlowControl::Throw.falls_through());
    }

    #[test]
    fn stack_counts() {
        assert_eq!(StackPop::Pop0.fixed_count(), Some(0));
        assert_eq!(StackPop::Popref.fixed_count(), Some(1));
        assert_eq!(StackPop::PoprefPopi.fixed_count(), Some(2));
        assert_eq!(StackPop::PopiPopiPopi.fixed_count(), Some(3));
        assert_eq!(StackPop::PopAll.fixed_count(), None);
        assert_eq!(StackPush::Push1Push1.fixed_count(), Some(2));
        assert_eq!(StackPush::Pushref.fixed_count(), Some(1));
        assert_eq!(StackPush::Varpush.fixed_count(), None);
    }

    #[test]
    fn display() {
        let opcode = opcodes::by_mnemonic("brtrue.s").unwrap();
        let instr = Instruction::new(0x10, 2, opcode, Operand::Target(0x1C));
        assert_eq!(instr.to_string(), "IL_0010: brtrue.s IL_001c");
        assert_eq!(instr.branch_target(), Some(0x1C));
        assert_eq!(instr.next_offset(), 0x12);

        let opcode = opcodes::by_mnemonic("switch").unwrap();
        let instr = Instruction::new(0, 13, opcode, Operand::Switch(vec![13, 20]));
        assert_eq!(instr.to_string(), "IL_0000: switch (IL_000d, IL_0014)");
        assert_eq!(instr.switch_targets(), Some(&[13, 20][..]));
        assert!(instr.callee().is_none());
    }
}
