//! Slab storage for frames and the intrusive call chain threaded through it.

use super::Frame;
use crate::{
    resource::{ResourceError, ResourceLimits},
    value::StackValue,
};

/// Slot index of a frame in a [`FramePool`].
///
/// Ids are reused once the frame that held them is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u32);

impl FrameId {
    fn new(index: usize) -> Self {
        Self(index.try_into().expect("frame pool exceeds u32 range"))
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed-layout frame slots plus the LIFO call chain.
///
/// Frames are addressed by [`FrameId`]; each frame's `back` link names its caller, so the
/// chain from [`top`](Self::top) down to the first frame is the call stack. Destroyed slots
/// go on a free list and are handed out again last-in first-out, so a steady call/return
/// pattern keeps reusing the same few slots.
#[derive(Debug)]
pub struct FramePool<'code, V> {
    slots: Vec<Option<Frame<'code, V>>>,
    /// Freed slot ids, most recently freed last.
    free: Vec<FrameId>,
    top: Option<FrameId>,
    depth: usize,
    limits: ResourceLimits,
}

impl<'code, V: StackValue> FramePool<'code, V> {
    #[must_use]
    pub fn new(limits: &ResourceLimits) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            top: None,
            depth: 0,
            limits: limits.clone(),
        }
    }

    /// Makes `frame` the new top of the call chain, linking it to the current top.
    ///
    /// Fails with [`ResourceError::Recursion`] if the chain is already at the configured
    /// maximum depth; the frame is dropped in that case.
    pub fn push(&mut self, mut frame: Frame<'code, V>) -> Result<FrameId, ResourceError> {
        self.limits.check_recursion_depth(self.depth)?;
        frame.back = self.top;
        let id = if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(frame);
            id
        } else {
            let id = FrameId::new(self.slots.len());
            self.slots.push(Some(frame));
            id
        };
        self.top = Some(id);
        self.depth += 1;
        Ok(id)
    }

    /// Destroys the top frame, releasing its unwind checkpoints and its slot.
    ///
    /// Returns the frame and the number of checkpoints it released, or `None` if the chain
    /// is empty.
    pub fn pop(&mut self) -> Option<(Frame<'code, V>, usize)> {
        let id = self.top?;
        let mut frame = self.slots[id.index()].take().expect("call chain points at a free slot");
        let released = frame.release_unwind_targets();
        self.top = frame.back.take();
        self.free.push(id);
        self.depth -= 1;
        Some((frame, released))
    }

    /// The frame currently executing.
    #[must_use]
    pub fn top(&self) -> Option<&Frame<'code, V>> {
        self.top.and_then(|id| self.get(id))
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame<'code, V>> {
        let id = self.top?;
        self.slots[id.index()].as_mut()
    }

    #[must_use]
    pub fn top_id(&self) -> Option<FrameId> {
        self.top
    }

    /// Looks up a live frame.
    #[must_use]
    pub fn get(&self, id: FrameId) -> Option<&Frame<'code, V>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of live frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Number of slots ever allocated, live or free.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Walks the call chain from the executing frame down to the outermost one.
    pub fn call_stack(&self) -> impl Iterator<Item = (FrameId, &Frame<'code, V>)> + '_ {
        std::iter::successors(self.top.map(|id| (id, self.frame(id))), |(_, frame)| {
            frame.back.map(|id| (id, self.frame(id)))
        })
    }

    fn frame(&self, id: FrameId) -> &Frame<'code, V> {
        self.get(id).expect("call chain points at a free slot")
    }
}
