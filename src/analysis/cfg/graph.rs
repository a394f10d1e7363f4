//! The control flow graph produced by [`crate::analysis::cfg::ControlFlowGraphBuilder`].

use std::{
    collections::HashMap,
    fmt::{self, Write},
};

use crate::{
    analysis::cfg::{BlockId, CfgOptions, ControlFlowGraphBuilder, InstructionBlock, InstructionData},
    assembly::{Instruction, MethodBody},
    utils::escape_dot,
    Result,
};

/// Basic blocks of one method body, connected by control flow edges.
///
/// Blocks are stored in program order and addressed by [`BlockId`]; the entry block is always
/// `BlockId(0)`. If stack simulation ran, the graph also carries the evaluation stack height
/// around every reachable instruction.
///
/// The graph borrows the method body it was built from and never changes after construction.
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::prelude::*;
///
/// // ldarg.0; brfalse.s +2; ldc.i4.1; ret; ldc.i4.0; ret
/// let il = [0x02, 0x2C, 0x02, 0x17, 0x2A, 0x16, 0x2A];
/// let body = MethodBody::decode(&il, false, &())?;
/// let cfg = ControlFlowGraph::build(&body, CfgOptions::full())?;
///
/// assert_eq!(cfg.block_count(), 3);
/// assert_eq!(cfg.exits().len(), 2);
/// assert_eq!(cfg.max_stack(), Some(1));
/// for id in cfg.successors(cfg.entry()) {
///     println!("entry -> {id}");
/// }
/// # Ok::<(), cilflow::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ControlFlowGraph<'a> {
    body: &'a MethodBody,
    blocks: Vec<InstructionBlock>,
    instruction_data: Option<HashMap<u32, InstructionData>>,
}

impl<'a> ControlFlowGraph<'a> {
    /// Build the graph of `body`.
    ///
    /// Shorthand for `ControlFlowGraphBuilder::new(body).build(options)`.
    ///
    /// # Errors
    ///
    /// See [`ControlFlowGraphBuilder::build`].
    pub fn build(body: &'a MethodBody, options: CfgOptions) -> Result<Self> {
        ControlFlowGraphBuilder::new(body).build(options)
    }

    pub(crate) fn from_parts(
        body: &'a MethodBody,
        blocks: Vec<InstructionBlock>,
        instruction_data: Option<HashMap<u32, InstructionData>>,
    ) -> Self {
        ControlFlowGraph {
            body,
            blocks,
            instruction_data,
        }
    }

    /// The method body the graph was built from.
    #[must_use]
    pub fn body(&self) -> &'a MethodBody {
        self.body
    }

    /// All blocks in program order.
    #[must_use]
    pub fn blocks(&self) -> &[InstructionBlock] {
        &self.blocks
    }

    /// The block with the given id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&InstructionBlock> {
        self.blocks.get(id.index())
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The block holding the first instruction of the method.
    #[must_use]
    pub fn entry(&self) -> BlockId {
        BlockId::new(0)
    }

    /// Blocks without successors, i.e. blocks ending in a return or a throw.
    #[must_use]
    pub fn exits(&self) -> Vec<BlockId> {
        self.block_ids()
            .filter(|&id| self.blocks[id.index()].is_terminal())
            .collect()
    }

    /// Iterate over all block ids in program order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId::new)
    }

    /// Successors of `id` in edge order; empty for unknown ids.
    #[must_use]
    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        match self.block(id) {
            Some(block) => block.successors.as_slice(),
            None => &[],
        }
    }

    /// Predecessors of `id`; empty for unknown ids.
    #[must_use]
    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        match self.block(id) {
            Some(block) => block.predecessors.as_slice(),
            None => &[],
        }
    }

    /// Instructions of block `id`, in program order.
    #[must_use]
    pub fn instructions(&self, id: BlockId) -> &'a [Instruction] {
        match self.block(id) {
            Some(block) => block.instructions(self.body),
            None => &[],
        }
    }

    /// The block containing the instruction at `offset`.
    #[must_use]
    pub fn block_of(&self, offset: u32) -> Option<BlockId> {
        let following = self
            .blocks
            .partition_point(|block| block.first_offset <= offset);
        let index = following.checked_sub(1)?;
        self.blocks[index]
            .contains_offset(offset)
            .then_some(BlockId::new(index))
    }

    /// Returns `true` if stack simulation ran for this graph.
    #[must_use]
    pub fn has_stack_data(&self) -> bool {
        self.instruction_data.is_some()
    }

    /// Stack heights around the instruction at `offset`.
    ///
    /// `None` if stack simulation did not run or the instruction is unreachable from the entry
    /// block.
    #[must_use]
    pub fn instruction_data(&self, offset: u32) -> Option<InstructionData> {
        self.instruction_data.as_ref()?.get(&offset).copied()
    }

    /// The full offset to stack height map, if stack simulation ran.
    #[must_use]
    pub fn stack_data(&self) -> Option<&HashMap<u32, InstructionData>> {
        self.instruction_data.as_ref()
    }

    /// Highest stack height observed during simulation.
    #[must_use]
    pub fn max_stack(&self) -> Option<u32> {
        let data = self.instruction_data.as_ref()?;
        Some(
            data.values()
                .map(|entry| entry.stack_before.max(entry.stack_after))
                .max()
                .unwrap_or(0),
        )
    }

    /// Render the graph in Graphviz DOT format.
    ///
    /// Each block becomes a box listing its instructions; the entry block is filled green and
    /// exit blocks red. Edges are labelled with their position in the successor list, so switch
    /// cases read `0`, `1`, ... followed by the fallthrough.
    ///
    /// # Arguments
    ///
    /// * `title` - Optional graph title, usually the method name
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        dot.push_str("    edge [fontname=\"Courier\", fontsize=9];\n\n");

        let exits = self.exits();
        for id in self.block_ids() {
            let block = &self.blocks[id.index()];
            let is_entry = id == self.entry();
            let is_exit = exits.contains(&id);

            let mut label = format!("{id} IL_{:04x}", block.first_offset);
            if is_entry {
                label.push_str(" (entry)");
            }
            if is_exit {
                label.push_str(" (exit)");
            }
            label.push_str("\\l");

            for instruction in block.instructions(self.body) {
                label.push_str(&escape_dot(&instruction.to_string()));
                if let Some(data) = self.instruction_data(instruction.offset) {
                    let _ = write!(label, "  [{}->{}]", data.stack_before, data.stack_after);
                }
                label.push_str("\\l");
            }

            let style = if is_entry {
                ", style=filled, fillcolor=lightgreen"
            } else if is_exit {
                ", style=filled, fillcolor=lightcoral"
            } else {
                ""
            };
            let _ = writeln!(dot, "    {id} [label=\"{label}\"{style}];");
        }

        dot.push('\n');
        for id in self.block_ids() {
            let successors = self.successors(id);
            for (position, successor) in successors.iter().enumerate() {
                if successors.len() > 1 {
                    let _ = writeln!(dot, "    {id} -> {successor} [label=\"{position}\"];");
                } else {
                    let _ = writeln!(dot, "    {id} -> {successor};");
                }
            }
        }

        dot.push_str("}\n");
        dot
    }
}

/// Block listing with 1-based block numbers:
///
/// ```text
/// block 1:
///     body:
///         IL_0000: ldarg.0
///         IL_0001: brfalse.s IL_0005
///     successors:
///         block 3
///         block 2
/// ```
///
/// Indentation is done with tabs.
impl fmt::Display for ControlFlowGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, block) in self.blocks.iter().enumerate() {
            writeln!(f, "block {}:", index + 1)?;
            writeln!(f, "\tbody:")?;
            for instruction in block.instructions(self.body) {
                writeln!(f, "\t\t{instruction}")?;
            }
            if !block.successors.is_empty() {
                writeln!(f, "\tsuccessors:")?;
                for successor in &block.successors {
                    writeln!(f, "\t\tblock {}", successor.index() + 1)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::InstructionEncoder;

    fn conditional() -> MethodBody {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_instruction("ldarg.0", None).unwrap();
        encoder.emit_branch("brfalse.s", "zero").unwrap();
        encoder.emit_instruction("ldc.i4.1", None).unwrap();
        encoder.emit_instruction("ret", None).unwrap();
        encoder.define_label("zero").unwrap();
        encoder.emit_instruction("ldc.i4.0", None).unwrap();
        encoder.emit_instruction("ret", None).unwrap();
        MethodBody::decode(&encoder.finalize().unwrap(), false, &()).unwrap()
    }

    #[test]
    fn queries() {
        let body = conditional();
        let cfg = ControlFlowGraph::build(&body, CfgOptions::default()).unwrap();

        assert_eq!(cfg.block_count(), 3);
        assert_eq!(cfg.entry(), BlockId::new(0));
        assert_eq!(cfg.successors(cfg.entry()), &[BlockId::new(2), BlockId::new(1)]);
        assert_eq!(cfg.exits(), vec![BlockId::new(1), BlockId::new(2)]);
        assert_eq!(cfg.block_of(0x01), Some(BlockId::new(0)));
        assert_eq!(cfg.block_of(0x04), Some(BlockId::new(1)));
        assert_eq!(cfg.block_of(0x06), Some(BlockId::new(2)));
        assert_eq!(cfg.block_of(0x07), None);
        assert_eq!(cfg.instructions(BlockId::new(1)).len(), 2);
        assert!(cfg.successors(BlockId::new(9)).is_empty());
        assert!(!cfg.has_stack_data());
        assert_eq!(cfg.max_stack(), None);
    }

    #[test]
    fn stack_queries() {
        let body = conditional();
        let cfg = ControlFlowGraph::build(&body, CfgOptions::full()).unwrap();

        assert_eq!(cfg.max_stack(), Some(1));
        assert_eq!(cfg.instruction_data(0x01), Some(InstructionData::new(1, 0)));
        assert_eq!(cfg.instruction_data(0x04), Some(InstructionData::new(1, 0)));
        assert_eq!(cfg.stack_data().map(HashMap::len), Some(6));
    }

    #[test]
    fn display_listing() {
        let body = conditional();
        let cfg = ControlFlowGraph::build(&body, CfgOptions::default()).unwrap();

        let expected = "block 1:\n\tbody:\n\t\tIL_0000: ldarg.0\n\t\tIL_0001: brfalse.s IL_0005\n\tsuccessors:\n\t\tblock 3\n\t\tblock 2\n\
                        block 2:\n\tbody:\n\t\tIL_0003: ldc.i4.1\n\t\tIL_0004: ret\n\
                        block 3:\n\tbody:\n\t\tIL_0005: ldc.i4.0\n\t\tIL_0006: ret\n";
        assert_eq!(cfg.to_string(), expected);
    }

    #[test]
    fn dot_output() {
        let body = conditional();
        let cfg = ControlFlowGraph::build(&body, CfgOptions::full()).unwrap();
        let dot = cfg.to_dot(Some("Test::Choose"));

        assert!(dot.starts_with("digraph CFG {"));
        assert!(dot.contains("label=\"CFG: Test::Choose\""));
        assert!(dot.contains("b0 [label=\"b0 IL_0000 (entry)"));
        assert!(dot.contains("fillcolor=lightcoral"));
        assert!(dot.contains("b0 -> b2 [label=\"0\"];"));
        assert!(dot.contains("b0 -> b1 [label=\"1\"];"));
        assert!(dot.contains("[1->0]"));
        assert!(dot.ends_with("}\n"));
    }
}
