//! Construction of control flow graphs from a method body.
//!
//! The builder works on a registry of pending blocks keyed by the offset of their first
//! instruction and runs up to four strictly sequential passes:
//!
//! 1. **Delimitation** - marks every instruction that starts a block, then assigns each block
//!    its last instruction from the sorted list of starts.
//! 2. **Connection** - adds successor and predecessor edges based on how control leaves each
//!    block's last instruction.
//! 3. **Stack simulation** (optional) - walks the graph depth-first from the entry block and
//!    records the stack height before and after every reached instruction.
//! 4. **Simplification** (optional) - folds a block into its only predecessor when the two are
//!    adjacent and nothing else reaches the second one.
//!
//! The registry is local to one invocation; nothing is shared between builds, which is what
//! makes [`crate::analysis::cfg::build_graphs`] trivially parallel.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace, warn};

use crate::{
    analysis::cfg::{
        stack, BlockId, CfgOptions, ControlFlowGraph, InstructionBlock, InstructionData,
    },
    assembly::{FlowControl, Instruction, MethodBody},
    collections::UniqueList,
    Error, Result,
};

/// A block while the graph is under construction.
///
/// Edges refer to other pending blocks by the offset of their first instruction.
#[derive(Debug)]
struct PendingBlock {
    first: usize,
    last: Option<usize>,
    successors: UniqueList<u32>,
    predecessors: UniqueList<u32>,
}

impl PendingBlock {
    fn new(first: usize) -> Self {
        PendingBlock {
            first,
            last: None,
            successors: UniqueList::new(),
            predecessors: UniqueList::new(),
        }
    }
}

/// Builds a [`ControlFlowGraph`] for one method body.
///
/// Most callers go through [`ControlFlowGraph::build`]; the builder is exposed for callers
/// that want to hold on to it before deciding which passes to run.
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::prelude::*;
///
/// // ldc.i4.0; brtrue.s +1; nop; ret
/// let body = MethodBody::decode(&[0x16, 0x2D, 0x01, 0x00, 0x2A], true, &())?;
/// let cfg = ControlFlowGraphBuilder::new(&body).build(CfgOptions::full())?;
/// assert_eq!(cfg.entry().index(), 0);
/// # Ok::<(), cilflow::Error>(())
/// ```
pub struct ControlFlowGraphBuilder<'a> {
    body: &'a MethodBody,
    blocks: BTreeMap<u32, PendingBlock>,
    instruction_data: Option<HashMap<u32, InstructionData>>,
}

impl<'a> ControlFlowGraphBuilder<'a> {
    /// Create a builder for `body`.
    #[must_use]
    pub fn new(body: &'a MethodBody) -> Self {
        ControlFlowGraphBuilder {
            body,
            blocks: BTreeMap::new(),
            instruction_data: None,
        }
    }

    /// Run the passes selected by `options` and produce the graph.
    ///
    /// Construction is all-or-nothing; on error no partial graph is returned.
    ///
    /// # Arguments
    ///
    /// * `options` - Which optional passes to run
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Empty`] if the body has no instructions
    /// - [`crate::Error::BranchTargetNotFound`] if a branch target does not start a block
    /// - [`crate::Error::UndelimitedBlock`] if a block has no last instruction
    /// - [`crate::Error::UnsupportedFlow`] if a block ends in a `break` or prefix instruction
    /// - [`crate::Error::MalformedOpcode`] / [`crate::Error::StackUnderflow`] from the stack
    ///   simulation
    ///
    /// An instruction that pops more values than the simulated stack holds aborts the build
    /// with [`crate::Error::StackUnderflow`]; the irregular height is not recorded.
    pub fn build(mut self, options: CfgOptions) -> Result<ControlFlowGraph<'a>> {
        self.delimit_blocks()?;
        self.connect_blocks()?;
        if options.compute_stack_data {
            self.compute_instruction_data()?;
        }
        if options.simplify {
            self.simplify_blocks();
        }
        self.finish()
    }

    fn delimit_blocks(&mut self) -> Result<()> {
        if self.body.is_empty() {
            return Err(Error::Empty);
        }
        self.mark_block_starts()?;
        self.mark_block_ends();

        debug!(
            "delimited {} blocks over {} instructions",
            self.blocks.len(),
            self.body.len()
        );
        Ok(())
    }

    fn mark_block_starts(&mut self) -> Result<()> {
        let body = self.body;
        self.mark_block_start(0);

        for (index, instruction) in body.instructions().iter().enumerate() {
            if !instruction.is_block_delimiter() {
                continue;
            }

            match instruction.flow_control() {
                FlowControl::Switch => {
                    for &target in instruction.switch_targets().unwrap_or_default() {
                        match body.index_of(target) {
                            Some(case) => self.mark_block_start(case),
                            None => warn!(
                                "switch at IL_{:04x}: case target IL_{target:04x} is not an instruction, case skipped",
                                instruction.offset
                            ),
                        }
                    }
                }
                FlowControl::Branch | FlowControl::ConditionalBranch => {
                    if let Some(target) = instruction.branch_target() {
                        let target = body.index_of(target).ok_or(Error::BranchTargetNotFound {
                            offset: instruction.offset,
                            target,
                        })?;
                        self.mark_block_start(target);
                    }
                }
                _ => {}
            }

            if let Some(next) = body.next(index) {
                self.mark_block_start(next);
            }
        }
        Ok(())
    }

    fn mark_block_start(&mut self, index: usize) {
        if let Some(instruction) = self.body.get(index) {
            self.blocks
                .entry(instruction.offset)
                .or_insert_with(|| PendingBlock::new(index));
        }
    }

    fn mark_block_ends(&mut self) {
        let firsts: Vec<usize> = self.blocks.values().map(|block| block.first).collect();
        let ends = firsts
            .iter()
            .skip(1)
            .map(|first| first - 1)
            .chain(std::iter::once(self.body.len() - 1));

        for (block, last) in self.blocks.values_mut().zip(ends) {
            block.last = Some(last);
        }
    }

    fn connect_blocks(&mut self) -> Result<()> {
        let keys: Vec<u32> = self.blocks.keys().copied().collect();
        let mut edges = 0usize;

        for key in keys {
            for target in self.block_targets(key)? {
                self.add_edge(key, target)?;
                edges += 1;
            }
        }

        debug!("connected {} blocks with {edges} edges", self.blocks.len());
        Ok(())
    }

    /// Offsets of the blocks control can continue to after block `key`, in edge order.
    fn block_targets(&self, key: u32) -> Result<Vec<u32>> {
        let body = self.body;
        let last = self
            .blocks
            .get(&key)
            .and_then(|block| block.last)
            .ok_or(Error::UndelimitedBlock { offset: key })?;
        let instruction = body
            .get(last)
            .ok_or_else(|| malformed_error!("Block IL_{:04x} ends past the method body", key))?;
        let fallthrough = body
            .next(last)
            .and_then(|next| body.get(next))
            .map(|next| next.offset);

        let mut targets = Vec::new();
        match instruction.flow_control() {
            FlowControl::Switch => {
                targets.extend(
                    instruction
                        .switch_targets()
                        .unwrap_or_default()
                        .iter()
                        .copied()
                        .filter(|&target| body.index_of(target).is_some()),
                );
                targets.extend(fallthrough);
            }
            FlowControl::Branch => {
                targets.push(single_target(instruction)?);
            }
            FlowControl::ConditionalBranch => {
                targets.push(single_target(instruction)?);
                targets.extend(fallthrough);
            }
            FlowControl::Call | FlowControl::Next => {
                targets.extend(fallthrough);
            }
            FlowControl::Return | FlowControl::Throw => {}
            flow @ (FlowControl::Break | FlowControl::Meta) => {
                return Err(Error::UnsupportedFlow {
                    offset: instruction.offset,
                    mnemonic: instruction.mnemonic(),
                    flow,
                });
            }
        }
        Ok(targets)
    }

    fn add_edge(&mut self, source: u32, target: u32) -> Result<()> {
        if !self.blocks.contains_key(&target) {
            let offset = self
                .blocks
                .get(&source)
                .and_then(|block| block.last)
                .and_then(|last| self.body.get(last))
                .map_or(source, |instruction| instruction.offset);
            return Err(Error::BranchTargetNotFound { offset, target });
        }

        if let Some(source_block) = self.blocks.get_mut(&source) {
            source_block.successors.add(target);
        }
        if let Some(target_block) = self.blocks.get_mut(&target) {
            target_block.predecessors.add(source);
        }
        Ok(())
    }

    /// Depth-first walk from the entry block.
    ///
    /// Each block is simulated once, starting from the height of the first path that reaches
    /// it. Successors are visited in edge order, exactly like a recursive pre-order walk.
    fn compute_instruction_data(&mut self) -> Result<()> {
        let body = self.body;
        let returns_void = body.returns_void();
        let mut data = HashMap::with_capacity(body.len());
        let mut visited = HashSet::with_capacity(self.blocks.len());

        let Some(&entry) = self.blocks.keys().next() else {
            return Err(Error::Empty);
        };
        let mut pending = vec![(entry, 0u32)];

        while let Some((key, mut height)) = pending.pop() {
            if !visited.insert(key) {
                continue;
            }
            let Some(block) = self.blocks.get(&key) else {
                continue;
            };
            let last = block.last.ok_or(Error::UndelimitedBlock { offset: key })?;

            for instruction in body.instructions().get(block.first..=last).unwrap_or_default() {
                let effect = stack::simulate(instruction, height, returns_void)?;
                data.insert(instruction.offset, effect);
                height = effect.stack_after;
            }

            pending.extend(
                block
                    .successors
                    .iter()
                    .rev()
                    .filter(|successor| !visited.contains(*successor))
                    .map(|&successor| (successor, height)),
            );
        }

        debug!(
            "simulated stack over {} of {} instructions in {} blocks",
            data.len(),
            body.len(),
            visited.len()
        );
        self.instruction_data = Some(data);
        Ok(())
    }

    /// Fold chains of adjacent single-entry blocks into their head.
    ///
    /// A block `b2` is folded into `b1` when `b1` has `b2` as its only successor, `b1` is the
    /// only predecessor of `b2`, and `b2` starts right after `b1` ends. The head keeps its id;
    /// successors of the folded block are rewired to point back at the head.
    fn simplify_blocks(&mut self) {
        if self.blocks.len() < 2 {
            return;
        }

        let keys: Vec<u32> = self.blocks.keys().copied().collect();
        let mut folded = 0usize;

        for head in keys {
            while let Some(next) = self.foldable_successor(head) {
                let Some(absorbed) = self.blocks.remove(&next) else {
                    break;
                };
                for successor in absorbed.successors.iter() {
                    if let Some(block) = self.blocks.get_mut(successor) {
                        block.predecessors.replace(&next, head);
                    }
                }
                if let Some(block) = self.blocks.get_mut(&head) {
                    block.last = absorbed.last;
                    block.successors = absorbed.successors;
                }

                trace!("folded block IL_{next:04x} into IL_{head:04x}");
                folded += 1;
            }
        }

        debug!("simplification folded {folded} blocks, {} remain", self.blocks.len());
    }

    fn foldable_successor(&self, head: u32) -> Option<u32> {
        let block = self.blocks.get(&head)?;
        if block.successors.len() != 1 {
            return None;
        }
        let next = *block.successors.first()?;
        if next == head {
            return None;
        }

        let candidate = self.blocks.get(&next)?;
        let adjacent = self.body.next(block.last?) == Some(candidate.first);
        (candidate.predecessors.len() == 1 && adjacent).then_some(next)
    }

    fn finish(self) -> Result<ControlFlowGraph<'a>> {
        let ids: HashMap<u32, BlockId> = self
            .blocks
            .keys()
            .enumerate()
            .map(|(index, &offset)| (offset, BlockId::new(index)))
            .collect();
        let to_ids = |edges: &UniqueList<u32>| -> UniqueList<BlockId> {
            edges
                .iter()
                .filter_map(|offset| ids.get(offset).copied())
                .collect()
        };

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (&offset, pending) in &self.blocks {
            let last = pending.last.ok_or(Error::UndelimitedBlock { offset })?;
            let last_offset = self
                .body
                .get(last)
                .map(|instruction| instruction.offset)
                .ok_or_else(|| malformed_error!("Block IL_{:04x} ends past the method body", offset))?;

            blocks.push(InstructionBlock {
                first: pending.first,
                last,
                first_offset: offset,
                last_offset,
                successors: to_ids(&pending.successors),
                predecessors: to_ids(&pending.predecessors),
            });
        }

        Ok(ControlFlowGraph::from_parts(
            self.body,
            blocks,
            self.instruction_data,
        ))
    }
}

fn single_target(instruction: &Instruction) -> Result<u32> {
    instruction
        .branch_target()
        .ok_or(Error::MalformedOpcode {
            offset: instruction.offset,
            mnemonic: instruction.mnemonic(),
            reason: "branch without a target operand",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::InstructionEncoder;

    fn body(build: impl FnOnce(&mut InstructionEncoder)) -> MethodBody {
        let mut encoder = InstructionEncoder::new();
        build(&mut encoder);
        MethodBody::decode(&encoder.finalize().unwrap(), true, &()).unwrap()
    }

    fn starts(cfg: &ControlFlowGraph<'_>) -> Vec<u32> {
        cfg.blocks().iter().map(InstructionBlock::first_offset).collect()
    }

    #[test]
    fn marking_is_idempotent() {
        // Two branches to the same label produce a single block there.
        let body = body(|e| {
            e.emit_instruction("ldc.i4.0", None).unwrap();
            e.emit_branch("brtrue.s", "end").unwrap();
            e.emit_instruction("ldc.i4.1", None).unwrap();
            e.emit_branch("brfalse.s", "end").unwrap();
            e.emit_instruction("nop", None).unwrap();
            e.define_label("end").unwrap();
            e.emit_instruction("ret", None).unwrap();
        });
        let cfg = ControlFlowGraphBuilder::new(&body)
            .build(CfgOptions::default())
            .unwrap();

        assert_eq!(starts(&cfg), vec![0, 3, 6, 7]);
        let end = cfg.block_of(7).unwrap();
        assert_eq!(cfg.predecessors(end).len(), 3);
    }

    #[test]
    fn break_does_not_delimit() {
        let body = body(|e| {
            e.emit_instruction("nop", None).unwrap();
            e.emit_instruction("break", None).unwrap();
            e.emit_instruction("ret", None).unwrap();
        });
        let cfg = ControlFlowGraphBuilder::new(&body)
            .build(CfgOptions::default())
            .unwrap();
        assert_eq!(cfg.block_count(), 1);
    }

    #[test]
    fn break_ending_a_block_is_unsupported() {
        let body = body(|e| {
            e.emit_branch("br.s", "target").unwrap();
            e.emit_instruction("break", None).unwrap();
            e.define_label("target").unwrap();
            e.emit_instruction("ret", None).unwrap();
        });
        let result = ControlFlowGraphBuilder::new(&body).build(CfgOptions::default());
        assert!(matches!(
            result,
            Err(Error::UnsupportedFlow {
                offset: 2,
                mnemonic: "break",
                flow: FlowControl::Break,
            })
        ));
    }

    #[test]
    fn unreachable_blocks_have_no_stack_data() {
        let body = body(|e| {
            e.emit_branch("br.s", "end").unwrap();
            e.emit_instruction("ldc.i4.1", None).unwrap();
            e.emit_instruction("pop", None).unwrap();
            e.define_label("end").unwrap();
            e.emit_instruction("ret", None).unwrap();
        });
        let cfg = ControlFlowGraphBuilder::new(&body)
            .build(CfgOptions::default().with_stack_data(true))
            .unwrap();

        assert!(cfg.instruction_data(0).is_some());
        assert!(cfg.instruction_data(2).is_none());
        assert!(cfg.instruction_data(4).is_some());
    }

    #[test]
    fn first_visit_height_wins() {
        // The join block is reached with height 1 from the taken path first and
        // with height 2 from the fallthrough path; only the first is recorded.
        let body = body(|e| {
            e.emit_instruction("ldc.i4.0", None).unwrap();
            e.emit_instruction("ldc.i4.0", None).unwrap();
            e.emit_branch("brtrue.s", "join").unwrap();
            e.emit_instruction("ldc.i4.1", None).unwrap();
            e.define_label("join").unwrap();
            e.emit_instruction("nop", None).unwrap();
            e.emit_instruction("ret", None).unwrap();
        });
        let cfg = ControlFlowGraphBuilder::new(&body)
            .build(CfgOptions::default().with_stack_data(true))
            .unwrap();

        let join = cfg.instruction_data(5).unwrap();
        assert_eq!(join.stack_before, 1);
        assert_eq!(cfg.instruction_data(4).unwrap().stack_after, 2);
    }

    #[test]
    fn simplify_folds_back_edge_target() {
        // head falls into body, body loops back to head: predecessor lists must follow the fold.
        let body = body(|e| {
            e.define_label("head").unwrap();
            e.emit_instruction("nop", None).unwrap();
            e.emit_branch("br.s", "body").unwrap();
            e.define_label("body").unwrap();
            e.emit_instruction("ldc.i4.0", None).unwrap();
            e.emit_branch("brtrue.s", "head").unwrap();
            e.emit_instruction("ret", None).unwrap();
        });
        let cfg = ControlFlowGraphBuilder::new(&body)
            .build(CfgOptions::default().with_simplification(true))
            .unwrap();

        for block in cfg.blocks() {
            for successor in block.successors() {
                let target = cfg.block(*successor).unwrap();
                assert!(target.predecessors().iter().any(|p| cfg.block(*p) == Some(block)));
            }
        }
    }
}
