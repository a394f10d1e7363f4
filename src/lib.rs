// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # cilflow
//!
//! Control flow graphs for CIL (Common Intermediate Language) method bodies.
//!
//! `cilflow` decodes the IL of a .NET method, splits it into basic blocks, connects the blocks
//! along every branch, switch, call and fallthrough, and optionally simulates the evaluation
//! stack to record its height before and after every instruction.
//!
//! ## Features
//!
//! - **Complete opcode tables** - Every ECMA-335 opcode with operand, flow and stack behaviour
//! - **Bounds-checked decoding** - IL is read through a cursor that never reads past the buffer
//! - **Deterministic graphs** - Blocks in program order, edges in a fixed, documented order
//! - **Stack simulation** - Per-instruction stack heights from a depth-first walk
//! - **Simplification** - Folds fallthrough chains that only exist because of conservative delimitation
//! - **Parallel batches** - Graphs for many methods built on the rayon thread pool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cilflow::prelude::*;
//!
//! // ldarg.0; brfalse.s +2; ldc.i4.1; ret; ldc.i4.0; ret
//! let il = [0x02, 0x2C, 0x02, 0x17, 0x2A, 0x16, 0x2A];
//! let body = MethodBody::decode(&il, false, &())?;
//!
//! let cfg = ControlFlowGraph::build(&body, CfgOptions::full())?;
//! println!("{cfg}");
//!
//! for block in cfg.blocks() {
//!     println!(
//!         "IL_{:04x}..IL_{:04x} -> {} successors",
//!         block.first_offset(),
//!         block.last_offset(),
//!         block.successors().len()
//!     );
//! }
//! # Ok::<(), cilflow::Error>(())
//! ```
//!
//! ## Calls
//!
//! The stack effect of `call`, `callvirt` and `newobj` depends on the callee. The decoder
//! resolves call tokens through a [`assembly::CalleeResolver`]; a slice of
//! [`metadata::MethodDefinition`] is one, and so is a `HashMap<Token, CalleeDescriptor>`.
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use cilflow::prelude::*;
//!
//! let callees = HashMap::from([(Token::new(0x0A00_0001), CalleeDescriptor::new(2, true, false))]);
//!
//! // ldarg.0; ldarg.1; ldarg.2; callvirt 0x0A000001; ret
//! let il = [0x02, 0x03, 0x04, 0x6F, 0x01, 0x00, 0x00, 0x0A, 0x2A];
//! let body = MethodBody::decode(&il, false, &callees)?;
//! let cfg = ControlFlowGraph::build(&body, CfgOptions::default().with_stack_data(true))?;
//!
//! let call = cfg.instruction_data(3).unwrap();
//! assert_eq!((call.stack_before, call.stack_after), (3, 1));
//! # Ok::<(), cilflow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`]. Graph construction is all-or-nothing; see
//! [`Error`] for the failure modes.

#[macro_use]
pub(crate) mod error;
pub(crate) mod utils;

/// Byte readers used by the IL decoder.
///
/// [`Parser`] is re-exported at the crate root.
pub mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use cilflow::prelude::*;
///
/// let body = MethodBody::decode(&[0x00, 0x2A], true, &())?;
/// let cfg = ControlFlowGraph::build(&body, CfgOptions::full())?;
/// assert_eq!(cfg.block_count(), 1);
/// # Ok::<(), cilflow::Error>(())
/// ```
pub mod prelude;

/// CIL instructions, opcode tables, decoder and encoder based on ECMA-335
///
/// # Key Types
///
/// - [`assembly::Instruction`] - A decoded instruction with offset, opcode and operand
/// - [`assembly::MethodBody`] - The instruction stream of one method
/// - [`assembly::FlowControl`] - How an instruction passes control on
/// - [`assembly::InstructionEncoder`] - Assembles IL from mnemonics and labels
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::{assembly::decode_stream, Parser};
///
/// let mut parser = Parser::new(&[0x00, 0x2A]);
/// let instructions = decode_stream(&mut parser, &())?;
/// assert_eq!(instructions[1].mnemonic(), "ret");
/// # Ok::<(), cilflow::Error>(())
/// ```
pub mod assembly;

/// Control flow analysis over method bodies
///
/// See [`analysis::cfg`] for the builder, the graph and the stack simulation.
pub mod analysis;

/// Ordered collections with mutation hooks and set semantics
pub mod collections;

/// Methods, parameters and metadata tokens
pub mod metadata;

/// `cilflow` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilflow` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::{analysis::cfg::{CfgOptions, ControlFlowGraph}, assembly::MethodBody, Error};
///
/// // br.s +16, past the end of the method
/// let body = MethodBody::decode(&[0x2B, 0x10, 0x2A], true, &())?;
/// match ControlFlowGraph::build(&body, CfgOptions::default()) {
///     Ok(cfg) => println!("{} blocks", cfg.block_count()),
///     Err(Error::BranchTargetNotFound { offset, target }) => {
///         println!("IL_{offset:04x} jumps to IL_{target:04x}");
///     }
///     Err(e) => println!("Error: {e}"),
/// }
/// # Ok::<(), cilflow::Error>(())
/// ```
pub use error::Error;

/// Bounds-checked cursor over a byte buffer.
pub use file::parser::Parser;
