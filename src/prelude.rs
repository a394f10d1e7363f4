//! # cilflow Prelude
//!
//! The types needed to decode a method body and analyze its control flow, importable with a
//! single glob.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilflow operations
pub use crate::Error;

/// The result type used throughout cilflow
pub use crate::Result;

/// Low-level byte reader
pub use crate::Parser;

// ================================================================================================
// Instructions
// ================================================================================================

/// Decoded instructions and their classification
pub use crate::assembly::{
    CalleeDescriptor, FlowControl, Immediate, Instruction, Operand, StackPop, StackPush,
};

/// Instruction streams, decoding and encoding
pub use crate::assembly::{
    decode_instruction, decode_stream, CalleeResolver, InstructionEncoder, MethodBody,
};

// ================================================================================================
// Control Flow Analysis
// ================================================================================================

/// Control flow graph construction and queries
pub use crate::analysis::cfg::{
    build_graphs, BlockId, CfgOptions, ControlFlowGraph, ControlFlowGraphBuilder,
    InstructionBlock, InstructionData,
};

// ================================================================================================
// Object Model
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Methods and parameters
pub use crate::metadata::{
    CallingConvention, MethodDefinition, ParameterCollection, ParameterDefinition,
};

/// Collections
pub use crate::collections::{Collection, CollectionHooks, UniqueList};
