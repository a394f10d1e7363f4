//! Analyses over decoded method bodies.
//!
//! - [`crate::analysis::cfg`] - basic blocks, control flow edges and stack height simulation

pub mod cfg;

pub use cfg::{
    build_graphs, BlockId, CfgOptions, ControlFlowGraph, ControlFlowGraphBuilder,
    InstructionBlock, InstructionData,
};
