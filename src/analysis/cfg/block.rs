//! Basic blocks of a control flow graph.

use std::{cmp::Ordering, fmt};

use crate::{
    assembly::{Instruction, MethodBody},
    collections::UniqueList,
};

/// Index of a block within a [`crate::analysis::cfg::ControlFlowGraph`].
///
/// Block ids are dense and follow program order: `BlockId(0)` is always the entry block, and
/// a block with a smaller id starts at a smaller offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Creates a new `BlockId` from a raw index value.
    ///
    /// # Arguments
    ///
    /// * `index` - The raw block index (0-based)
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        BlockId(index)
    }

    /// Returns the raw index value of this block identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl From<usize> for BlockId {
    fn from(index: usize) -> Self {
        BlockId(index)
    }
}

impl From<BlockId> for usize {
    fn from(id: BlockId) -> Self {
        id.0
    }
}

/// A maximal run of instructions with a single entry and a single exit.
///
/// The block covers the contiguous instruction range `[first, last]` of the method body it
/// was built from. Successor and predecessor edges are stored as [`UniqueList`]s of
/// [`BlockId`], so every edge appears once and keeps the order in which it was discovered:
/// switch cases in operand order followed by the fallthrough, a conditional branch's target
/// before its fallthrough.
///
/// Blocks of one graph are identified by the offset of their first instruction; equality and
/// ordering compare that offset only.
#[derive(Debug, Clone)]
pub struct InstructionBlock {
    pub(crate) first: usize,
    pub(crate) last: usize,
    pub(crate) first_offset: u32,
    pub(crate) last_offset: u32,
    pub(crate) successors: UniqueList<BlockId>,
    pub(crate) predecessors: UniqueList<BlockId>,
}

impl InstructionBlock {
    /// Index of the first instruction within the method body.
    #[must_use]
    pub fn first_index(&self) -> usize {
        self.first
    }

    /// Index of the last instruction within the method body.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.last
    }

    /// Offset of the first instruction.
    #[must_use]
    pub fn first_offset(&self) -> u32 {
        self.first_offset
    }

    /// Offset of the last instruction.
    #[must_use]
    pub fn last_offset(&self) -> u32 {
        self.last_offset
    }

    /// Number of instructions in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Always `false`; a block holds at least one instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Blocks control can continue to, in discovery order.
    #[must_use]
    pub fn successors(&self) -> &UniqueList<BlockId> {
        &self.successors
    }

    /// Blocks control can arrive from.
    #[must_use]
    pub fn predecessors(&self) -> &UniqueList<BlockId> {
        &self.predecessors
    }

    /// Returns `true` if control never leaves this block for another one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.successors.is_empty()
    }

    /// Returns `true` if the instruction at `offset` lies within this block's range.
    #[must_use]
    pub fn contains_offset(&self, offset: u32) -> bool {
        (self.first_offset..=self.last_offset).contains(&offset)
    }

    /// The instructions of this block, in program order.
    ///
    /// `body` must be the body the graph was built from.
    #[must_use]
    pub fn instructions<'b>(&self, body: &'b MethodBody) -> &'b [Instruction] {
        body.instructions()
            .get(self.first..=self.last)
            .unwrap_or_default()
    }

    /// The instruction that decides where control goes next.
    #[must_use]
    pub fn terminator<'b>(&self, body: &'b MethodBody) -> Option<&'b Instruction> {
        body.get(self.last)
    }
}

impl PartialEq for InstructionBlock {
    fn eq(&self, other: &Self) -> bool {
        self.first_offset == other.first_offset
    }
}

impl Eq for InstructionBlock {}

impl PartialOrd for InstructionBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstructionBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.first_offset.cmp(&other.first_offset)
    }
}
