//! CIL instruction model, opcode tables, decoding and encoding.
//!
//! This module provides everything needed to turn raw method IL into the instruction stream the
//! control flow builder consumes, and back.
//!
//! # Key Components
//!
//! - [`crate::assembly::OpCode`] / [`crate::assembly::opcodes`] - Static ECMA-335 opcode tables
//! - [`crate::assembly::Instruction`] - A decoded instruction at a byte offset
//! - [`crate::assembly::MethodBody`] - Ordered instruction stream of one method
//! - [`crate::assembly::decode_instruction`] / [`crate::assembly::decode_stream`] - IL decoding
//! - [`crate::assembly::CalleeResolver`] - Call shape lookup used while decoding
//! - [`crate::assembly::InstructionEncoder`] - Label-based IL assembler
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilflow::assembly::{FlowControl, MethodBody};
//!
//! // ldarg.0; ret
//! let body = MethodBody::decode(&[0x02, 0x2A], false, &())?;
//! assert_eq!(body.instructions()[1].flow_control(), FlowControl::Return);
//! # Ok::<(), cilflow::Error>(())
//! ```

mod body;
mod decoder;
mod encoder;
mod instruction;
pub mod opcodes;

pub use body::MethodBody;
pub use decoder::{decode_instruction, decode_stream, CalleeResolver};
pub use encoder::InstructionEncoder;
pub use instruction::{
    CalleeDescriptor, FlowControl, Immediate, Instruction, Operand, OperandType, StackPop,
    StackPush,
};
pub use opcodes::OpCode;
