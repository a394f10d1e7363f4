//! Evaluation stack effect of single instructions.
//!
//! The simulator only tracks the stack *height*. Fixed push/pop categories come straight from
//! the opcode table; the variable ones are resolved from the call shape of the callee or, for
//! `ret`, from the return type of the method being analyzed.

use crate::{
    assembly::{FlowControl, Instruction, StackPop, StackPush},
    Error, Result,
};

/// Value of the `newobj` opcode; it allocates the receiver instead of popping it.
const NEWOBJ: u16 = 0x73;

/// Evaluation stack height around one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstructionData {
    /// Number of values on the stack before the instruction executes
    pub stack_before: u32,
    /// Number of values on the stack after the instruction executes
    pub stack_after: u32,
}

impl InstructionData {
    /// Create stack data from the two heights.
    #[must_use]
    pub const fn new(stack_before: u32, stack_after: u32) -> Self {
        InstructionData {
            stack_before,
            stack_after,
        }
    }
}

/// Number of values `instruction` pushes.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedOpcode`] for a variable push outside of a call, or for a
/// call whose callee was never resolved.
pub(crate) fn push_count(instruction: &Instruction) -> Result<u32> {
    match instruction.opcode.push {
        StackPush::Varpush => {
            if instruction.flow_control() != FlowControl::Call {
                return Err(malformed_opcode(instruction, "variable push outside of a call"));
            }
            match instruction.callee() {
                Some(callee) => Ok(u32::from(!callee.returns_void)),
                None => Err(malformed_opcode(
                    instruction,
                    "call target has no resolved signature",
                )),
            }
        }
        fixed => fixed
            .fixed_count()
            .ok_or_else(|| malformed_opcode(instruction, "push category has no fixed count")),
    }
}

/// Number of values `instruction` pops when `height` values are on the stack.
///
/// `returns_void` describes the method being analyzed and only matters for `ret`.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedOpcode`] for a variable pop that is neither a call with a
/// resolved callee nor a return.
pub(crate) fn pop_count(instruction: &Instruction, height: u32, returns_void: bool) -> Result<u32> {
    match instruction.opcode.pop {
        StackPop::PopAll => Ok(height),
        StackPop::Varpop => match instruction.flow_control() {
            FlowControl::Call => {
                let Some(callee) = instruction.callee() else {
                    return Err(malformed_opcode(
                        instruction,
                        "call target has no resolved signature",
                    ));
                };
                let receiver = callee.has_this && instruction.opcode.value != NEWOBJ;
                Ok(callee.parameter_count.saturating_add(u32::from(receiver)))
            }
            FlowControl::Return => Ok(u32::from(!returns_void)),
            _ => Err(malformed_opcode(instruction, "variable pop outside of a call or return")),
        },
        fixed => fixed
            .fixed_count()
            .ok_or_else(|| malformed_opcode(instruction, "pop category has no fixed count")),
    }
}

/// Apply the stack effect of `instruction` to a stack of height `before`.
///
/// # Errors
///
/// - [`crate::Error::MalformedOpcode`] if the stack effect cannot be determined
/// - [`crate::Error::StackUnderflow`] if the instruction pops more than `before` values
pub(crate) fn simulate(
    instruction: &Instruction,
    before: u32,
    returns_void: bool,
) -> Result<InstructionData> {
    let pops = pop_count(instruction, before, returns_void)?;
    let pushes = push_count(instruction)?;

    let remaining = before
        .checked_sub(pops)
        .ok_or_else(|| Error::StackUnderflow {
            offset: instruction.offset,
            mnemonic: instruction.mnemonic(),
            height: before,
            pops,
        })?;

    Ok(InstructionData::new(before, remaining.saturating_add(pushes)))
}

fn malformed_opcode(instruction: &Instruction, reason: &'static str) -> Error {
    Error::MalformedOpcode {
        offset: instruction.offset,
        mnemonic: instruction.mnemonic(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{
            opcodes::{by_mnemonic, OPCODES, OPCODES_FE},
            CalleeDescriptor, OpCode, Operand,
        },
        metadata::token::Token,
    };

    fn instruction(mnemonic: &str, operand: Operand) -> Instruction {
        let opcode = by_mnemonic(mnemonic).unwrap();
        Instruction::new(0, opcode.size(), opcode, operand)
    }

    fn call(mnemonic: &str, callee: CalleeDescriptor) -> Instruction {
        instruction(
            mnemonic,
            Operand::Method {
                token: Token::new(0x0A00_0001),
                callee,
            },
        )
    }

    #[test]
    fn fixed_effects() {
        let add = instruction("add", Operand::None);
        assert_eq!(simulate(&add, 2, true).unwrap(), InstructionData::new(2, 1));

        let dup = instruction("dup", Operand::None);
        assert_eq!(simulate(&dup, 1, true).unwrap(), InstructionData::new(1, 2));

        let stelem = instruction("stelem.i4", Operand::None);
        assert_eq!(simulate(&stelem, 3, true).unwrap(), InstructionData::new(3, 0));
    }

    #[test]
    fn every_fixed_category_has_a_count() {
        for opcode in OPCODES.iter().chain(OPCODES_FE.iter()) {
            if opcode.is_reserved() {
                continue;
            }
            let instruction = Instruction::new(0, opcode.size(), opcode, Operand::None);
            if opcode.pop != StackPop::Varpop {
                assert!(pop_count(&instruction, 3, true).is_ok(), "{}", opcode.mnemonic);
            }
            if opcode.push != StackPush::Varpush {
                assert!(push_count(&instruction).is_ok(), "{}", opcode.mnemonic);
            }
        }
    }

    #[test]
    fn variable_push_outside_of_a_call() {
        let mut nop = instruction("nop", Operand::None);
        let varpush = OpCode {
            push: StackPush::Varpush,
            ..*nop.opcode
        };
        nop.opcode = Box::leak(Box::new(varpush));
        assert!(matches!(
            push_count(&nop),
            Err(Error::MalformedOpcode { mnemonic: "nop", .. })
        ));
    }

    #[test]
    fn leave_empties_the_stack() {
        let leave = instruction("leave.s", Operand::Target(0x20));
        assert_eq!(simulate(&leave, 4, true).unwrap(), InstructionData::new(4, 0));
    }

    #[test]
    fn instance_call() {
        let callvirt = call("callvirt", CalleeDescriptor::new(2, true, false));
        assert_eq!(simulate(&callvirt, 3, true).unwrap(), InstructionData::new(3, 1));

        let void_static = call("call", CalleeDescriptor::new(1, false, true));
        assert_eq!(simulate(&void_static, 1, true).unwrap(), InstructionData::new(1, 0));
    }

    #[test]
    fn newobj_does_not_pop_receiver() {
        let newobj = call("newobj", CalleeDescriptor::new(2, true, true));
        assert_eq!(pop_count(&newobj, 2, true).unwrap(), 2);
        assert_eq!(push_count(&newobj).unwrap(), 1);
    }

    #[test]
    fn ret_depends_on_method() {
        let ret = instruction("ret", Operand::None);
        assert_eq!(pop_count(&ret, 1, true).unwrap(), 0);
        assert_eq!(pop_count(&ret, 1, false).unwrap(), 1);
    }

    #[test]
    fn unresolved_call_is_malformed() {
        let call = instruction("call", Operand::Token(Token::new(0x0A00_0001)));
        assert!(matches!(
            simulate(&call, 0, true),
            Err(Error::MalformedOpcode { mnemonic: "call", .. })
        ));
    }

    #[test]
    fn underflow() {
        let pop = instruction("pop", Operand::None);
        assert!(matches!(
            simulate(&pop, 0, true),
            Err(Error::StackUnderflow {
                height: 0,
                pops: 1,
                ..
            })
        ));
    }
}
