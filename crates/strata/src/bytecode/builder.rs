//! Builder for assembling code objects.
//!
//! `CodeBuilder` is the compiler-side half of the code object contract: it tags every emitted
//! instruction with its innermost open block, records block extents as blocks are closed, and
//! freezes the local-name table when the code is built.
//!
//! A loop's `end` is where `break` resumes, so it must be an instruction of the loop's parent
//! block. When a loop is closed and the next thing the builder sees is another block entry, the
//! parent's own exit, or the end of the code, it inserts a virtual [`NOP`] at that offset first.

use super::code::{BlockId, BlockType, Code, CodeBlock, Instruction, NOP};
use crate::{intern::NameHandle, name_dict::NameDict};

/// Builder for a single [`Code`] object.
///
/// # Usage
///
/// ```
/// use strata::{BlockType, CodeBuilder, NameHandle};
///
/// let mut builder: CodeBuilder<Option<i64>> = CodeBuilder::new(NameHandle::from_raw(100));
/// let slot = builder.add_local(NameHandle::from_raw(101));
/// builder.emit(1, slot, 1);
/// let loop_block = builder.enter_block(BlockType::WhileLoop);
/// builder.emit(2, 0, 2);
/// builder.exit_block();
/// builder.emit(3, 0, 3);
/// let code = builder.build();
/// assert_eq!(code.block_of(1), Some(loop_block));
/// assert_eq!(code.block(loop_block).end, 2);
/// ```
#[derive(Debug)]
pub struct CodeBuilder<V> {
    name: NameHandle,
    instructions: Vec<Instruction>,
    consts: Vec<V>,
    varnames: Vec<NameHandle>,
    local_slots: NameDict<u16>,
    blocks: Vec<CodeBlock>,
    /// Blocks entered but not yet exited, innermost last.
    open_blocks: Vec<BlockId>,
    /// A loop was just closed and no instruction has been emitted at its end yet.
    loop_end_pending: bool,
}

impl<V> CodeBuilder<V> {
    /// Creates an empty builder for code called `name`.
    #[must_use]
    pub fn new(name: NameHandle) -> Self {
        Self {
            name,
            instructions: Vec::new(),
            consts: Vec::new(),
            varnames: Vec::new(),
            local_slots: NameDict::new(),
            blocks: Vec::new(),
            open_blocks: Vec::new(),
            loop_end_pending: false,
        }
    }

    /// Returns the offset the next instruction will be emitted at.
    #[must_use]
    pub fn current_offset(&self) -> usize {
        self.instructions.len()
    }

    /// Innermost open block.
    #[must_use]
    pub fn current_block(&self) -> Option<BlockId> {
        self.open_blocks.last().copied()
    }

    /// Opens a block nested in the current one, starting at the current offset.
    pub fn enter_block(&mut self, kind: BlockType) -> BlockId {
        self.anchor_loop_end();
        let id = BlockId::new(self.blocks.len());
        let start = self.current_offset();
        self.blocks.push(CodeBlock {
            kind,
            parent: self.current_block(),
            start,
            end: start,
        });
        self.open_blocks.push(id);
        id
    }

    /// Closes the innermost open block at the current offset.
    ///
    /// If the block is a loop, the next instruction emitted at that offset belongs to the
    /// parent block; a virtual [`NOP`] is inserted there if a block boundary comes first.
    ///
    /// # Panics
    ///
    /// Panics if no block is open.
    pub fn exit_block(&mut self) -> BlockId {
        self.anchor_loop_end();
        let id = self.open_blocks.pop().expect("exit_block called with no open block");
        let block = &mut self.blocks[id.index()];
        block.end = self.instructions.len();
        self.loop_end_pending = block.kind.is_loop();
        id
    }

    /// Gives a just-closed loop an instruction at its end in the current block.
    fn anchor_loop_end(&mut self) {
        if self.loop_end_pending {
            let line = self.instructions.last().map_or(0, |instruction| instruction.line);
            self.push_instruction(NOP, 0, line, true);
        }
    }

    fn push_instruction(&mut self, op: u8, arg: u16, line: u32, is_virtual: bool) -> usize {
        self.loop_end_pending = false;
        let offset = self.current_offset();
        self.instructions.push(Instruction {
            op,
            arg,
            line,
            block: self.current_block(),
            is_virtual,
        });
        offset
    }

    /// Emits an instruction in the current block, returning its offset.
    pub fn emit(&mut self, op: u8, arg: u16, line: u32) -> usize {
        self.push_instruction(op, arg, line, false)
    }

    /// Emits a compiler-inserted instruction, returning its offset.
    pub fn emit_virtual(&mut self, op: u8, arg: u16, line: u32) -> usize {
        self.push_instruction(op, arg, line, true)
    }

    /// Overwrites the operand of an already emitted instruction, for forward jumps.
    ///
    /// # Panics
    ///
    /// Panics if `offset` has not been emitted.
    pub fn patch_arg(&mut self, offset: usize, arg: u16) {
        self.instructions[offset].arg = arg;
    }

    /// Returns the slot for local `name`, allocating the next slot on first use.
    ///
    /// # Panics
    ///
    /// Panics if more than 65535 locals are declared.
    pub fn add_local(&mut self, name: NameHandle) -> u16 {
        if let Some(slot) = self.local_slots.get(name) {
            return slot;
        }
        let slot = u16::try_from(self.varnames.len()).expect("local slots exceed u16 range (65535)");
        self.varnames.push(name);
        self.local_slots.set(name, slot);
        slot
    }

    /// Adds a constant to the pool, returning its index.
    ///
    /// # Panics
    ///
    /// Panics if the constant pool exceeds 65535 entries.
    pub fn add_const(&mut self, value: V) -> u16 {
        let index = u16::try_from(self.consts.len()).expect("constant pool exceeds u16 range (65535)");
        self.consts.push(value);
        index
    }

    /// Builds the final code object.
    ///
    /// The local-name table is frozen at this point, so its hash seed is tuned once here.
    ///
    /// # Panics
    ///
    /// Panics if any block is still open.
    #[must_use]
    pub fn build(mut self) -> Code<V> {
        if let Some(open) = self.open_blocks.last() {
            panic!("block {open} was never exited");
        }
        self.anchor_loop_end();

        // parents are always entered before their children, so one forward pass suffices
        let mut depths: Vec<usize> = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let depth = block.parent.map_or(1, |parent| depths[parent.index()] + 1);
            depths.push(depth);
        }
        let max_block_depth = depths.into_iter().max().unwrap_or(0);

        self.local_slots.tune_seed();
        Code::new(
            self.name,
            self.instructions,
            self.consts,
            self.varnames,
            self.local_slots,
            self.blocks,
            max_block_depth,
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn h(raw: u16) -> NameHandle {
        NameHandle::from_raw(raw)
    }

    #[test]
    fn instructions_are_tagged_with_innermost_block() {
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        builder.emit(0, 0, 1);
        let outer = builder.enter_block(BlockType::ForLoop);
        builder.emit(0, 0, 2);
        let inner = builder.enter_block(BlockType::TryExcept);
        builder.emit(0, 0, 3);
        assert_eq!(builder.exit_block(), inner);
        builder.emit_virtual(0, 0, 3);
        assert_eq!(builder.exit_block(), outer);
        let code = builder.build();

        assert_eq!(code.block_of(0), None);
        assert_eq!(code.block_of(1), Some(outer));
        assert_eq!(code.block_of(2), Some(inner));
        assert_eq!(code.block_of(3), Some(outer));
        assert_eq!(code.block_of(4), None);
        assert!(code.instructions()[3].is_virtual);
        assert_eq!(
            *code.block(inner),
            CodeBlock {
                kind: BlockType::TryExcept,
                parent: Some(outer),
                start: 2,
                end: 3,
            }
        );
        assert_eq!(code.block(outer).end, 4);
        assert_eq!(code.max_block_depth(), 2);
    }

    #[test]
    fn enclosing_blocks_walks_outwards() {
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        let a = builder.enter_block(BlockType::WhileLoop);
        let b = builder.enter_block(BlockType::ContextManager);
        let c = builder.enter_block(BlockType::ForLoop);
        builder.emit(0, 0, 1);
        builder.exit_block();
        builder.exit_block();
        builder.exit_block();
        let code = builder.build();
        let chain: Vec<BlockId> = code.enclosing_blocks(code.block_of(0)).map(|(id, _)| id).collect();
        assert_eq!(chain, vec![c, b, a]);
        assert_eq!(code.enclosing_blocks(None).count(), 0);
    }

    #[test]
    fn loop_followed_by_sibling_block_ends_at_top_level() {
        // for: ... / while: ... / <next>
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        let for_loop = builder.enter_block(BlockType::ForLoop);
        builder.emit(5, 0, 1);
        builder.exit_block();
        let while_loop = builder.enter_block(BlockType::WhileLoop);
        builder.emit(6, 0, 2);
        builder.exit_block();
        let next = builder.emit(7, 0, 3);
        let code = builder.build();

        let end = code.block(for_loop).end;
        assert_eq!(end, 1);
        assert_eq!(code.block_of(end), None);
        assert_eq!(code.instructions()[end].op, NOP);
        assert!(code.instructions()[end].is_virtual);
        assert_eq!(code.block(while_loop).start, 2);
        // an instruction already sits at the while loop's end, so nothing is inserted
        assert_eq!(code.block(while_loop).end, next);
        assert_eq!(code.len(), 4);
    }

    #[test]
    fn inner_loop_closing_its_parent_ends_inside_parent() {
        // while: ... for: ... / <next>
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        let outer = builder.enter_block(BlockType::WhileLoop);
        builder.emit(5, 0, 1);
        let inner = builder.enter_block(BlockType::ForLoop);
        builder.emit(6, 0, 2);
        builder.exit_block();
        builder.exit_block();
        builder.emit(7, 0, 3);
        let code = builder.build();

        let inner_end = code.block(inner).end;
        assert_eq!(code.block_of(inner_end), Some(outer));
        assert!(code.instructions()[inner_end].is_virtual);
        assert_eq!(code.block(outer).end, inner_end + 1);
        assert_eq!(code.block_of(code.block(outer).end), None);
    }

    #[test]
    fn loop_at_end_of_code_gets_trailing_instruction() {
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        let block = builder.enter_block(BlockType::ForLoop);
        builder.emit(5, 0, 4);
        builder.exit_block();
        let code = builder.build();
        assert_eq!(code.len(), 2);
        assert_eq!(code.block_of(code.block(block).end), None);
        assert_eq!(code.instructions()[1].line, 4);
    }

    #[test]
    fn non_loop_blocks_get_no_trailing_instruction() {
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        builder.enter_block(BlockType::TryExcept);
        builder.emit(5, 0, 1);
        builder.exit_block();
        builder.enter_block(BlockType::ContextManager);
        builder.emit(6, 0, 2);
        builder.exit_block();
        assert_eq!(builder.build().len(), 2);
    }

    #[test]
    fn locals_are_deduplicated() {
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        assert_eq!(builder.add_local(h(10)), 0);
        assert_eq!(builder.add_local(h(11)), 1);
        assert_eq!(builder.add_local(h(10)), 0);
        let code = builder.build();
        assert_eq!(code.varnames(), &[h(10), h(11)]);
        assert_eq!(code.local_slot(h(11)), Some(1));
        assert_eq!(code.local_slot(h(12)), None);
    }

    #[test]
    fn consts_are_indexed_in_order() {
        let mut builder = CodeBuilder::new(h(1));
        assert_eq!(builder.add_const(7i64), 0);
        assert_eq!(builder.add_const(7), 1);
        assert_eq!(builder.build().consts(), &[7, 7]);
    }

    #[test]
    fn patch_arg_rewrites_operand() {
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        let jump = builder.emit(9, 0, 1);
        builder.emit(0, 0, 2);
        builder.patch_arg(jump, 2);
        assert_eq!(builder.build().instructions()[0].arg, 2);
    }

    #[test]
    #[should_panic(expected = "never exited")]
    fn build_with_open_block_panics() {
        let mut builder: CodeBuilder<()> = CodeBuilder::new(h(1));
        builder.enter_block(BlockType::ForLoop);
        let _ = builder.build();
    }
}
