//! Compiled code objects and their static block table.

use std::fmt;

use crate::{intern::NameHandle, name_dict::NameDict};

/// Opcode of the virtual instructions [`CodeBuilder`](crate::CodeBuilder) inserts at loop ends.
/// Dispatchers must treat it as a no-op.
pub const NOP: u8 = 0;

/// Index of a lexical block in a [`Code`]'s block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct BlockId(u16);

impl BlockId {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index.try_into().expect("block table exceeds u16 range"))
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Kind of a lexical block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlockType {
    /// `for` loop body. Holds the iterator on the stack for its whole extent.
    ForLoop,
    /// `while` loop body. Holds nothing.
    WhileLoop,
    /// `with` body. Holds the context manager on the stack.
    ContextManager,
    /// `try` body whose handler starts at the block's end.
    TryExcept,
}

impl BlockType {
    /// Number of values the block keeps on the stack while it is active, which must be popped
    /// when control leaves it abnormally.
    #[inline]
    #[must_use]
    pub fn held_values(self) -> usize {
        match self {
            Self::ForLoop | Self::ContextManager => 1,
            Self::WhileLoop | Self::TryExcept => 0,
        }
    }

    /// Returns true for blocks a `break` can target.
    #[inline]
    #[must_use]
    pub fn is_loop(self) -> bool {
        matches!(self, Self::ForLoop | Self::WhileLoop)
    }
}

/// A lexical block: `[start, end)` in instruction offsets, nested in `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodeBlock {
    pub kind: BlockType,
    pub parent: Option<BlockId>,
    /// Offset of the block's first instruction.
    pub start: usize,
    /// Offset of the first instruction after the block. For a loop this is where `break`
    /// lands; for a try block it is the start of the handler.
    pub end: usize,
}

/// One decoded instruction.
///
/// Opcode and operand values are opaque to the execution core; only `block` is read by the
/// unwinding algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: u8,
    pub arg: u16,
    /// Source line, for diagnostics.
    pub line: u32,
    /// Innermost block enclosing this instruction, `None` at top level.
    pub block: Option<BlockId>,
    /// Compiler-inserted instruction with no source counterpart.
    pub is_virtual: bool,
}

/// Compiled body of a function or module.
///
/// Code objects are immutable once built and are borrowed, never owned, by the frames that
/// execute them.
#[derive(Debug, Clone)]
pub struct Code<V> {
    name: NameHandle,
    instructions: Vec<Instruction>,
    consts: Vec<V>,
    /// Local names by slot.
    varnames: Vec<NameHandle>,
    /// Local name to slot, seed-tuned once at build time.
    local_slots: NameDict<u16>,
    blocks: Vec<CodeBlock>,
    max_block_depth: usize,
}

impl<V> Code<V> {
    pub(super) fn new(
        name: NameHandle,
        instructions: Vec<Instruction>,
        consts: Vec<V>,
        varnames: Vec<NameHandle>,
        local_slots: NameDict<u16>,
        blocks: Vec<CodeBlock>,
        max_block_depth: usize,
    ) -> Self {
        Self {
            name,
            instructions,
            consts,
            varnames,
            local_slots,
            blocks,
            max_block_depth,
        }
    }

    /// Name of the function or module this code was compiled from.
    #[must_use]
    pub fn name(&self) -> NameHandle {
        self.name
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[must_use]
    pub fn consts(&self) -> &[V] {
        &self.consts
    }

    /// Local names, indexed by slot.
    #[must_use]
    pub fn varnames(&self) -> &[NameHandle] {
        &self.varnames
    }

    /// Number of local slots.
    #[must_use]
    pub fn nlocals(&self) -> usize {
        self.varnames.len()
    }

    /// Slot of the local called `name`.
    #[inline]
    #[must_use]
    pub fn local_slot(&self, name: NameHandle) -> Option<u16> {
        self.local_slots.get(name)
    }

    /// The local name to slot table.
    #[must_use]
    pub fn local_table(&self) -> &NameDict<u16> {
        &self.local_slots
    }

    #[must_use]
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Looks up a block by id.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this code object.
    #[inline]
    #[must_use]
    pub fn block(&self, id: BlockId) -> &CodeBlock {
        &self.blocks[id.index()]
    }

    /// Innermost block enclosing instruction `ip`; `None` at top level or past the end.
    #[inline]
    #[must_use]
    pub fn block_of(&self, ip: usize) -> Option<BlockId> {
        self.instructions.get(ip).and_then(|instruction| instruction.block)
    }

    /// Deepest static block nesting in this code, which bounds the number of live checkpoints
    /// a frame running it can hold.
    #[must_use]
    pub fn max_block_depth(&self) -> usize {
        self.max_block_depth
    }

    /// Walks from `from` outwards through parent links, innermost first.
    pub fn enclosing_blocks(&self, from: Option<BlockId>) -> impl Iterator<Item = (BlockId, &CodeBlock)> + '_ {
        std::iter::successors(from.map(|id| (id, self.block(id))), |(_, block)| {
            block.parent.map(|parent| (parent, self.block(parent)))
        })
    }
}
