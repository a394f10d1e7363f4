//! Control flow graph construction over CIL method bodies.
//!
//! A [`ControlFlowGraph`] partitions the linear instruction stream of a method into basic
//! blocks and connects them with successor and predecessor edges derived from how each block's
//! last instruction transfers control.
//!
//! # Key Components
//!
//! - [`ControlFlowGraphBuilder`] - Runs delimitation, connection and the optional passes
//! - [`ControlFlowGraph`] - The immutable result, blocks in program order
//! - [`InstructionBlock`] / [`BlockId`] - A basic block and its index in the graph
//! - [`InstructionData`] - Simulated stack height around one instruction
//! - [`CfgOptions`] - Selects stack simulation and simplification
//! - [`build_graphs`] - Parallel construction for many methods
//!
//! # Edge Order
//!
//! Edge lists are sets that keep their insertion order:
//!
//! - **Switch**: each case target in operand order, then the fallthrough
//! - **Conditional branch**: the taken target, then the fallthrough
//! - **Unconditional branch**: the target only
//! - **Call / plain instruction**: the fallthrough
//! - **Return / throw**: no edges
//!
//! # Stack Simulation
//!
//! With [`CfgOptions::compute_stack_data`] the builder walks the graph depth-first from the
//! entry block with an empty stack. Every block is simulated once, with the height of the first
//! path that reaches it; heights arriving later over other edges are not compared. Blocks that
//! cannot be reached from the entry block have no stack data.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilflow::prelude::*;
//!
//! let mut encoder = InstructionEncoder::new();
//! encoder.emit_instruction("ldarg.0", None)?;
//! encoder.emit_switch(&["one", "two"])?;
//! encoder.emit_instruction("ret", None)?;
//! encoder.define_label("one")?;
//! encoder.emit_instruction("ret", None)?;
//! encoder.define_label("two")?;
//! encoder.emit_instruction("ret", None)?;
//!
//! let body = MethodBody::decode(&encoder.finalize()?, true, &())?;
//! let cfg = ControlFlowGraph::build(&body, CfgOptions::full())?;
//! assert_eq!(cfg.successors(cfg.entry()).len(), 3);
//! println!("{cfg}");
//! # Ok::<(), cilflow::Error>(())
//! ```

mod batch;
mod block;
mod builder;
mod graph;
mod options;
mod stack;

pub use batch::build_graphs;
pub use block::{BlockId, InstructionBlock};
pub use builder::ControlFlowGraphBuilder;
pub use graph::ControlFlowGraph;
pub use options::CfgOptions;
pub use stack::InstructionData;
