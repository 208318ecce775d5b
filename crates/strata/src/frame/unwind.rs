//! Block-structured control-flow unwinding.
//!
//! Loops, `try` bodies and `with` bodies are compiled into a static block forest (see
//! [`CodeBlock`](crate::CodeBlock)). Some blocks keep values on the stack for their whole
//! extent: a `for` loop its iterator, a `with` body its context manager. When control leaves
//! blocks abnormally those values must be popped, and when an exception lands in a handler the
//! stack must be cut back to where it was when the `try` block was entered.
//!
//! Each frame records a checkpoint ([`UnwindTarget`]) when a block is entered. Only blocks that
//! are currently active have checkpoints that matter, so the list is bounded by the nesting
//! depth of the code rather than its size.
//!
//! Every operation here leaves the frame's instruction pointer at the instruction control
//! resumes at, so [`Frame::current_block`] and the stack always agree.

use super::{Frame, UnwindTarget};
use crate::{
    bytecode::{BlockId, BlockType},
    stack::ValueStack,
    tracer::VmTracer,
    value::StackValue,
};

/// Outcome of looking for an exception handler in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionDispatch {
    /// The exception was moved to the handler's stack depth; resume at `resume_at`.
    Handler { block: BlockId, resume_at: usize },
    /// No enclosing try block in this frame. The exception is still on top of the stack.
    Unhandled,
}

impl<V: StackValue> Frame<'_, V> {
    /// Returns the checkpoint recorded for `block`, if any.
    #[must_use]
    pub fn find_unwind_target(&self, block: BlockId) -> Option<&UnwindTarget> {
        self.unwind_targets.iter().rev().find(|target| target.block == block)
    }

    /// Records `sp` as the restore point of the block enclosing the current instruction.
    ///
    /// Re-entering a block (the next iteration of a loop) recalibrates its existing
    /// checkpoint instead of adding one. Outside any block this does nothing.
    ///
    /// # Panics
    ///
    /// Panics if `sp` is below the frame's checkpoint base.
    pub fn set_unwind_target(&mut self, sp: usize, tracer: &mut impl VmTracer) {
        let Some(block) = self.current_block() else {
            return;
        };
        let offset = sp
            .checked_sub(self.checkpoint_base())
            .expect("stack pointer below frame locals base");
        if let Some(existing) = self.unwind_targets.iter_mut().rev().find(|target| target.block == block) {
            existing.offset = offset;
        } else {
            self.unwind_targets.push(UnwindTarget { block, offset });
        }
        tracer.on_unwind_target(block, offset);
    }

    /// Leaves `block`, popping the values it holds, and returns its parent.
    pub fn exit_block(&mut self, stack: &mut ValueStack<V>, block: BlockId, tracer: &mut impl VmTracer) -> Option<BlockId> {
        let code_block = self.code.block(block);
        let popped = code_block.kind.held_values();
        for _ in 0..popped {
            stack.pop();
        }
        tracer.on_block_exit(block, code_block.kind, popped);
        code_block.parent
    }

    /// Unwinds out of every block between the current instruction and `target`, then moves
    /// the instruction pointer to `target`.
    ///
    /// A target at or past the end of the code unwinds every open block.
    ///
    /// # Panics
    ///
    /// Panics if the block owning `target` does not enclose the current instruction.
    pub fn prepare_jump_break(&mut self, stack: &mut ValueStack<V>, target: usize, tracer: &mut impl VmTracer) {
        let code = self.code;
        let mut current = self.current_block();
        if target >= code.len() {
            while let Some(block) = current {
                current = self.exit_block(stack, block, tracer);
            }
        } else {
            let destination = code.block_of(target);
            while let Some(block) = current
                && current != destination
            {
                current = self.exit_block(stack, block, tracer);
            }
            assert_eq!(
                current, destination,
                "jump target {target} is not inside a block enclosing instruction {}",
                self.ip
            );
        }
        self.ip = target;
        tracer.on_jump_break(target);
    }

    /// Breaks out of the innermost enclosing loop, exiting every block up to and including it.
    ///
    /// Returns the instruction control resumes at (the loop's end), or `None` if the current
    /// instruction is not inside a loop.
    pub fn prepare_loop_break(&mut self, stack: &mut ValueStack<V>, tracer: &mut impl VmTracer) -> Option<usize> {
        let code = self.code;
        let (loop_id, loop_block) = code
            .enclosing_blocks(self.current_block())
            .find(|(_, block)| block.kind.is_loop())?;
        let mut current = self.current_block();
        while let Some(block) = current {
            current = self.exit_block(stack, block, tracer);
            if block == loop_id {
                break;
            }
        }
        let target = loop_block.end;
        debug_assert_eq!(
            code.block_of(target),
            loop_block.parent,
            "loop {loop_id} ends outside its parent block"
        );
        self.ip = target;
        tracer.on_jump_break(target);
        Some(target)
    }

    /// Routes the exception on top of the stack to the nearest enclosing try block.
    ///
    /// On success the stack is cut back to the try block's checkpoint with the exception pushed
    /// on top, and the instruction pointer is moved to the handler. If no try block encloses
    /// the current instruction, nothing is changed and [`ExceptionDispatch::Unhandled`] is
    /// returned.
    ///
    /// # Panics
    ///
    /// Panics if the try block never recorded a checkpoint, or the checkpoint lies above the
    /// exception on the stack.
    pub fn prepare_jump_exception_handler(
        &mut self,
        stack: &mut ValueStack<V>,
        tracer: &mut impl VmTracer,
    ) -> ExceptionDispatch {
        let code = self.code;
        let Some((block, try_block)) = code
            .enclosing_blocks(self.current_block())
            .find(|(_, block)| block.kind == BlockType::TryExcept)
        else {
            return ExceptionDispatch::Unhandled;
        };

        let exception = stack.pop();
        let offset = self
            .find_unwind_target(block)
            .unwrap_or_else(|| panic!("try block {block} has no recorded checkpoint"))
            .offset;
        stack.truncate(self.checkpoint_base() + offset);
        stack
            .push(exception)
            .expect("restored stack pointer is below the one the exception was raised at");

        let resume_at = try_block.end;
        self.ip = resume_at;
        tracer.on_exception_handler(block, resume_at);
        ExceptionDispatch::Handler { block, resume_at }
    }
}
