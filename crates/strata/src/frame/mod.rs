//! Execution frames.
//!
//! A [`Frame`] is the runtime state of one active call: its instruction pointer, the code it
//! runs, where its locals live, its caller link and the unwind checkpoints of the blocks it
//! has entered. Frames live in a [`FramePool`] and borrow their window of the shared
//! [`ValueStack`] instead of owning storage.
//!
//! The shared stack around a function frame looks like this:
//!
//! ```text
//!   p0            locals base = p0 + 1
//!   |             |
//! [ callable ][ local 0 .. local n-1 ][ temporaries ... ] sp
//! ```
//!
//! Module frames have no callable slot, so their locals base is `p0` itself. Detached frames
//! keep their locals in a buffer of their own and use `p0` as the base for checkpoints.

pub use pool::{FrameId, FramePool};
pub use unwind::ExceptionDispatch;

use smallvec::SmallVec;

use crate::{
    bytecode::{BlockId, Code},
    intern::NameHandle,
    name_dict::NameDict,
    stack::ValueStack,
    value::{ObjectId, StackValue},
};

mod pool;
mod unwind;

/// Stack depth to restore when control unwinds into a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwindTarget {
    pub block: BlockId,
    /// Stack pointer at block entry, relative to the frame's checkpoint base.
    pub offset: usize,
}

/// Where a frame's local slots live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locals<V> {
    /// A window of the shared stack starting at `base`.
    Stack { base: usize },
    /// A buffer owned by the frame, used for namespace-scoped evaluation.
    Detached(Vec<V>),
}

/// Runtime state of one call.
#[derive(Debug)]
pub struct Frame<'code, V> {
    /// Index of the current instruction.
    ip: usize,
    code: &'code Code<V>,
    module: ObjectId,
    /// Executing function, `None` for module-level and detached code.
    function: Option<ObjectId>,
    /// Lowest stack slot owned by this frame. The stack is truncated here when the frame dies.
    p0: usize,
    locals: Locals<V>,
    /// Code whose local-name table describes `locals`.
    locals_co: &'code Code<V>,
    /// Caller, maintained by the pool.
    back: Option<FrameId>,
    /// Checkpoints of entered blocks, newest last. At most one per block, and sized up front
    /// for the deepest nesting of `code`.
    unwind_targets: SmallVec<[UnwindTarget; 4]>,
}

impl<'code, V: StackValue> Frame<'code, V> {
    /// Creates a frame for module-level code whose locals start at `p0`.
    #[must_use]
    pub fn new_module(code: &'code Code<V>, module: ObjectId, p0: usize) -> Self {
        Self::new(code, module, None, p0, Locals::Stack { base: p0 }, code)
    }

    /// Creates a frame for a function whose callable sits at `p0`, with locals right above it.
    #[must_use]
    pub fn new_function(code: &'code Code<V>, module: ObjectId, function: ObjectId, p0: usize) -> Self {
        Self::new(code, module, Some(function), p0, Locals::Stack { base: p0 + 1 }, code)
    }

    /// Creates a frame running `code` against a detached locals buffer described by `locals_co`.
    ///
    /// # Panics
    ///
    /// Panics if `locals` does not have one slot per local of `locals_co`.
    #[must_use]
    pub fn new_detached(
        code: &'code Code<V>,
        module: ObjectId,
        p0: usize,
        locals: Vec<V>,
        locals_co: &'code Code<V>,
    ) -> Self {
        assert_eq!(
            locals.len(),
            locals_co.nlocals(),
            "detached locals buffer does not match its code object"
        );
        Self::new(code, module, None, p0, Locals::Detached(locals), locals_co)
    }

    fn new(
        code: &'code Code<V>,
        module: ObjectId,
        function: Option<ObjectId>,
        p0: usize,
        locals: Locals<V>,
        locals_co: &'code Code<V>,
    ) -> Self {
        Self {
            ip: 0,
            code,
            module,
            function,
            p0,
            locals,
            locals_co,
            back: None,
            unwind_targets: SmallVec::with_capacity(code.max_block_depth()),
        }
    }

    #[inline]
    #[must_use]
    pub fn ip(&self) -> usize {
        self.ip
    }

    #[inline]
    pub fn set_ip(&mut self, ip: usize) {
        self.ip = ip;
    }

    #[must_use]
    pub fn code(&self) -> &'code Code<V> {
        self.code
    }

    #[must_use]
    pub fn module(&self) -> ObjectId {
        self.module
    }

    #[must_use]
    pub fn function(&self) -> Option<ObjectId> {
        self.function
    }

    #[must_use]
    pub fn p0(&self) -> usize {
        self.p0
    }

    #[must_use]
    pub fn locals_co(&self) -> &'code Code<V> {
        self.locals_co
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        matches!(self.locals, Locals::Detached(_))
    }

    /// Caller frame.
    #[must_use]
    pub fn back(&self) -> Option<FrameId> {
        self.back
    }

    /// Base that checkpoint offsets are measured from.
    #[inline]
    #[must_use]
    pub fn checkpoint_base(&self) -> usize {
        match self.locals {
            Locals::Stack { base } => base,
            Locals::Detached(_) => self.p0,
        }
    }

    /// Innermost block enclosing the current instruction.
    #[inline]
    #[must_use]
    pub fn current_block(&self) -> Option<BlockId> {
        self.code.block_of(self.ip)
    }

    /// Live checkpoints, oldest first.
    #[must_use]
    pub fn unwind_targets(&self) -> &[UnwindTarget] {
        &self.unwind_targets
    }

    /// Drops every checkpoint, returning how many there were.
    pub(crate) fn release_unwind_targets(&mut self) -> usize {
        let released = self.unwind_targets.len();
        self.unwind_targets.clear();
        released
    }

    /// The frame's local slots, indexed by slot number.
    #[must_use]
    pub fn locals<'a>(&'a self, stack: &'a ValueStack<V>) -> &'a [V] {
        match &self.locals {
            Locals::Stack { base } => stack.slice(*base..*base + self.locals_co.nlocals()),
            Locals::Detached(values) => values,
        }
    }

    pub fn locals_mut<'a>(&'a mut self, stack: &'a mut ValueStack<V>) -> &'a mut [V] {
        match &mut self.locals {
            Locals::Stack { base } => stack.slice_mut(*base..*base + self.locals_co.nlocals()),
            Locals::Detached(values) => values,
        }
    }

    /// Looks up a local by name.
    ///
    /// Returns `None` if `name` is not a local of this frame. A local that exists but has not
    /// been assigned is returned as the null value, so callers can tell an unbound local from
    /// an unknown name.
    #[inline]
    #[must_use]
    pub fn try_get_local(&self, stack: &ValueStack<V>, name: NameHandle) -> Option<V> {
        let slot = self.locals_co.local_slot(name)?;
        Some(self.locals(stack)[usize::from(slot)])
    }

    /// Assigns a local by name. Returns false if `name` is not a local of this frame.
    pub fn store_local(&mut self, stack: &mut ValueStack<V>, name: NameHandle, value: V) -> bool {
        let Some(slot) = self.locals_co.local_slot(name) else {
            return false;
        };
        self.locals_mut(stack)[usize::from(slot)] = value;
        true
    }

    /// Snapshots every bound local into a name table.
    ///
    /// Unbound (null) slots are skipped; iteration order of the result is table order.
    #[must_use]
    pub fn materialize_locals(&self, stack: &ValueStack<V>) -> NameDict<V> {
        let locals = self.locals(stack);
        self.locals_co
            .local_table()
            .iter()
            .map(|(name, slot)| (name, locals[usize::from(slot)]))
            .filter(|(_, value)| !value.is_null())
            .collect()
    }
}
