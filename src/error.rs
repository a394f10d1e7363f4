use thiserror::Error;

use crate::{assembly::FlowControl, metadata::token::Token};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Graph construction is all-or-nothing: any of the build errors below aborts the build and no
/// partial graph is returned.
///
/// # Error Categories
///
/// ## Graph Construction Errors
/// - [`Error::UndelimitedBlock`] - A block was connected before its end was assigned
/// - [`Error::UnsupportedFlow`] - A block ends in an instruction whose flow kind cannot be wired
/// - [`Error::MalformedOpcode`] - The stack effect of an instruction cannot be determined
/// - [`Error::BranchTargetNotFound`] - A branch points at an offset with no instruction or block
/// - [`Error::StackUnderflow`] - An instruction pops more values than the stack holds
///
/// ## Decoding Errors
/// - [`Error::Malformed`] - Inconsistent bytecode or instruction stream
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the IL buffer
/// - [`Error::Empty`] - Empty input provided
///
/// ## Object Model Errors
/// - [`Error::MissingBody`] - The method has no body to analyze
/// - [`Error::OutOfRange`] - A collection index was outside of its bounds
/// - [`Error::InvalidMnemonic`] / [`Error::InvalidBranch`] - Encoder misuse
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::{Error, prelude::*};
///
/// let body = MethodBody::decode(&[0x2A], true, &())?;
/// match ControlFlowGraph::build(&body, CfgOptions::full()) {
///     Ok(cfg) => println!("{} blocks", cfg.block_count()),
///     Err(Error::BranchTargetNotFound { offset, target }) => {
///         eprintln!("IL_{offset:04x} jumps to IL_{target:04x} which does not exist");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok::<(), cilflow::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Graph construction errors
    /// A block was used by the connector before its last instruction was assigned.
    ///
    /// The associated offset is the offset of the block's first instruction.
    #[error("Block at IL_{offset:04x} has no last instruction")]
    UndelimitedBlock {
        /// Offset of the block's first instruction
        offset: u32,
    },

    /// A block ends in an instruction whose flow-control kind has no connection rule.
    ///
    /// This happens for `break` and prefix (meta) instructions that happen to terminate a
    /// block, e.g. because the next instruction is a branch target.
    #[error("Unsupported flow control {flow} for '{mnemonic}' at IL_{offset:04x}")]
    UnsupportedFlow {
        /// Offset of the offending instruction
        offset: u32,
        /// Mnemonic of the offending instruction
        mnemonic: &'static str,
        /// Flow-control kind that could not be connected
        flow: FlowControl,
    },

    /// The stack effect of an instruction could not be determined.
    ///
    /// Raised for variable push/pop categories outside of call and return instructions, and
    /// for call instructions whose callee could not be resolved.
    #[error("Malformed opcode '{mnemonic}' at IL_{offset:04x}: {reason}")]
    MalformedOpcode {
        /// Offset of the offending instruction
        offset: u32,
        /// Mnemonic of the offending instruction
        mnemonic: &'static str,
        /// Which part of the stack effect failed
        reason: &'static str,
    },

    /// A branch target does not correspond to any instruction or block.
    #[error("Branch at IL_{offset:04x} targets IL_{target:04x}, which does not start an instruction")]
    BranchTargetNotFound {
        /// Offset of the branching instruction
        offset: u32,
        /// The unresolved target offset
        target: u32,
    },

    /// An instruction pops more values than the simulated stack holds.
    #[error("Stack underflow at IL_{offset:04x} ('{mnemonic}'): height {height}, pops {pops}")]
    StackUnderflow {
        /// Offset of the offending instruction
        offset: u32,
        /// Mnemonic of the offending instruction
        mnemonic: &'static str,
        /// Stack height before the instruction
        height: u32,
        /// Number of values the instruction pops
        pops: u32,
    },

    // Decoding errors
    /// The bytecode or instruction stream is damaged and could not be processed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading IL bytes.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    ///
    /// Returned for empty IL buffers and empty instruction streams; a method body needs at
    /// least one instruction to have an entry block.
    #[error("Provided input was empty")]
    Empty,

    // Object model errors
    /// The method identified by the token has no body.
    #[error("Method {0} has no body")]
    MissingBody(Token),

    /// An index was outside the bounds of a collection.
    #[error("Index {index} is out of range for a collection of length {len}")]
    OutOfRange {
        /// The requested index
        index: usize,
        /// The collection length at the time of the request
        len: usize,
    },

    /// The encoder was asked for a mnemonic that does not exist.
    #[error("Invalid instruction mnemonic - {0}")]
    InvalidMnemonic(String),

    /// The encoder was asked to emit a branch with a non-branching instruction, or a label
    /// could not be resolved.
    #[error("Invalid branch - {0}")]
    InvalidBranch(String),
}
