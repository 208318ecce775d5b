//! The surface a bytecode dispatcher drives.
//!
//! An [`Interpreter`] owns one value stack, one frame pool and one tracer. The dispatch loop
//! itself lives outside this crate: it reads instructions from the current frame's code,
//! manipulates the stack, and calls into the interpreter for everything that touches frame
//! lifecycle, locals or control-flow unwinding.
//!
//! ```
//! use strata::{BlockType, CodeBuilder, Interpreter, NameHandle, ObjectId, RaiseOutcome, ResourceLimits};
//!
//! // try:
//! //     <raise>
//! // except: ...
//! let mut builder: CodeBuilder<Option<i64>> = CodeBuilder::new(NameHandle::from_raw(100));
//! builder.enter_block(BlockType::TryExcept);
//! builder.emit(0, 0, 2);
//! builder.exit_block();
//! let handler = builder.emit(1, 0, 3);
//! let code = builder.build();
//!
//! let mut vm = Interpreter::new(ResourceLimits::default());
//! vm.push_module(&code, ObjectId::new(0)).unwrap();
//! vm.set_unwind_target();
//! vm.push(Some(1)).unwrap();
//! let outcome = vm.raise(Some(-1)).unwrap();
//! assert_eq!(outcome, RaiseOutcome::Handled { depth: 1, resume_at: handler });
//! assert_eq!(vm.stack().as_slice(), &[Some(-1)]);
//! ```

use crate::{
    bytecode::{BlockId, Code},
    frame::{ExceptionDispatch, Frame, FrameId, FramePool, UnwindTarget},
    intern::NameHandle,
    name_dict::NameDict,
    resource::{ResourceError, ResourceLimits},
    stack::ValueStack,
    tracer::{NoopTracer, VmTracer},
    value::{ObjectId, StackValue},
};

/// Result of [`Interpreter::raise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaiseOutcome<V> {
    /// A frame at `depth` handles the exception; its handler starts at `resume_at` and the
    /// exception is on top of the stack.
    Handled { depth: usize, resume_at: usize },
    /// No frame handled the exception. Every frame has been destroyed.
    Uncaught(V),
}

/// One interpreter instance: a value stack and the chain of frames executing on it.
///
/// Instances are single-threaded; run one per thread or serialize access externally.
#[derive(Debug)]
pub struct Interpreter<'code, V, Tr = NoopTracer> {
    stack: ValueStack<V>,
    frames: FramePool<'code, V>,
    limits: ResourceLimits,
    tracer: Tr,
}

impl<'code, V: StackValue> Interpreter<'code, V> {
    /// Creates an interpreter without tracing.
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self::with_tracer(limits, NoopTracer)
    }
}

impl<'code, V: StackValue, Tr: VmTracer> Interpreter<'code, V, Tr> {
    #[must_use]
    pub fn with_tracer(limits: ResourceLimits, tracer: Tr) -> Self {
        Self {
            stack: ValueStack::with_limits(&limits),
            frames: FramePool::new(&limits),
            limits,
            tracer,
        }
    }

    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    #[must_use]
    pub fn tracer(&self) -> &Tr {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tr {
        &mut self.tracer
    }

    #[must_use]
    pub fn into_tracer(self) -> Tr {
        self.tracer
    }

    // ========================================================================
    // Frame lifecycle
    // ========================================================================

    /// Number of live frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.depth()
    }

    /// The frame currently executing.
    #[must_use]
    pub fn frame(&self) -> Option<&Frame<'code, V>> {
        self.frames.top()
    }

    pub fn frame_mut(&mut self) -> Option<&mut Frame<'code, V>> {
        self.frames.top_mut()
    }

    #[must_use]
    pub fn frames(&self) -> &FramePool<'code, V> {
        &self.frames
    }

    #[inline]
    fn current_frame(&self) -> &Frame<'code, V> {
        self.frames.top().expect("no active frame")
    }

    /// Splits out the current frame, the stack and the tracer for an unwinding operation.
    #[inline]
    fn parts(&mut self) -> (&mut Frame<'code, V>, &mut ValueStack<V>, &mut Tr) {
        let frame = self.frames.top_mut().expect("no active frame");
        (frame, &mut self.stack, &mut self.tracer)
    }

    /// Links `frame` into the call chain, restoring the stack pointer to `restore_sp` if the
    /// depth limit refuses it.
    fn enter(&mut self, frame: Frame<'code, V>, restore_sp: usize) -> Result<FrameId, ResourceError> {
        match self.frames.push(frame) {
            Ok(id) => {
                self.tracer.on_call(self.frames.depth());
                Ok(id)
            }
            Err(err) => {
                self.stack.truncate(restore_sp);
                Err(err)
            }
        }
    }

    /// Pushes a frame for module-level `code`, reserving its local slots at the stack top.
    pub fn push_module(&mut self, code: &'code Code<V>, module: ObjectId) -> Result<FrameId, ResourceError> {
        let p0 = self.stack.sp();
        self.stack.push_n(code.nlocals(), V::null())?;
        self.enter(Frame::new_module(code, module, p0), p0)
    }

    /// Pushes a frame for a call of `function`.
    ///
    /// The stack must hold the callable followed by `argc` arguments. The arguments become the
    /// first locals and the remaining locals start unbound.
    ///
    /// # Panics
    ///
    /// Panics if the stack does not hold the callable and arguments, or if `argc` exceeds the
    /// number of locals of `code`.
    pub fn push_call(
        &mut self,
        code: &'code Code<V>,
        module: ObjectId,
        function: ObjectId,
        argc: usize,
    ) -> Result<FrameId, ResourceError> {
        let nlocals = code.nlocals();
        assert!(
            argc <= nlocals,
            "call passes {argc} arguments to code with {nlocals} locals"
        );
        let sp = self.stack.sp();
        let p0 = sp
            .checked_sub(argc + 1)
            .expect("call without callable and arguments on the stack");
        self.stack.push_n(nlocals - argc, V::null())?;
        self.enter(Frame::new_function(code, module, function, p0), sp)
    }

    /// Pushes a frame that runs `code` against a detached locals buffer described by
    /// `locals_co`, for namespace-scoped evaluation.
    pub fn push_detached(
        &mut self,
        code: &'code Code<V>,
        module: ObjectId,
        locals: Vec<V>,
        locals_co: &'code Code<V>,
    ) -> Result<FrameId, ResourceError> {
        let p0 = self.stack.sp();
        self.enter(Frame::new_detached(code, module, p0, locals, locals_co), p0)
    }

    /// Destroys the current frame: releases its checkpoints and drops its stack window,
    /// including the callable slot of a function frame.
    ///
    /// Returns the number of checkpoints released.
    ///
    /// # Panics
    ///
    /// Panics if no frame is active.
    pub fn pop_frame(&mut self) -> usize {
        let (frame, released) = self.frames.pop().expect("no frame to pop");
        self.stack.truncate(frame.p0());
        self.tracer.on_return(self.frames.depth(), released);
        released
    }

    /// Destroys the current frame and pushes `value` for the caller.
    pub fn return_value(&mut self, value: V) -> Result<(), ResourceError> {
        self.pop_frame();
        self.stack.push(value)
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    /// Current instruction of the executing frame.
    #[must_use]
    pub fn ip(&self) -> usize {
        self.current_frame().ip()
    }

    pub fn set_ip(&mut self, ip: usize) {
        self.parts().0.set_ip(ip);
    }

    /// Checkpoint of `block` in the current frame.
    #[must_use]
    pub fn find_unwind_target(&self, block: BlockId) -> Option<UnwindTarget> {
        self.current_frame().find_unwind_target(block).copied()
    }

    /// Records the current stack pointer as the restore point of the current block.
    pub fn set_unwind_target(&mut self) {
        let (frame, stack, tracer) = self.parts();
        frame.set_unwind_target(stack.sp(), tracer);
    }

    /// Leaves `block` in the current frame, returning its parent.
    pub fn exit_block(&mut self, block: BlockId) -> Option<BlockId> {
        let (frame, stack, tracer) = self.parts();
        frame.exit_block(stack, block, tracer)
    }

    /// Unwinds the current frame to `target` and moves its instruction pointer there.
    pub fn prepare_jump_break(&mut self, target: usize) {
        let (frame, stack, tracer) = self.parts();
        frame.prepare_jump_break(stack, target, tracer);
    }

    /// Breaks out of the innermost loop of the current frame.
    pub fn prepare_loop_break(&mut self) -> Option<usize> {
        let (frame, stack, tracer) = self.parts();
        frame.prepare_loop_break(stack, tracer)
    }

    /// Routes the exception on top of the stack to a handler in the current frame.
    pub fn prepare_jump_exception_handler(&mut self) -> ExceptionDispatch {
        let depth = self.frames.depth();
        let (frame, stack, tracer) = self.parts();
        let dispatch = frame.prepare_jump_exception_handler(stack, tracer);
        if dispatch == ExceptionDispatch::Unhandled {
            tracer.on_exception_unhandled(depth);
        }
        dispatch
    }

    /// Raises `exception` at the current instruction and propagates it up the call chain.
    ///
    /// Frames without a handler are destroyed and the still-live exception is handed to their
    /// caller, which looks for a handler at its own current instruction (the call site).
    /// Propagation stops at the first frame that handles it.
    ///
    /// Fails only if the exception cannot be pushed onto a full stack.
    pub fn raise(&mut self, exception: V) -> Result<RaiseOutcome<V>, ResourceError> {
        if self.frames.is_empty() {
            return Ok(RaiseOutcome::Uncaught(exception));
        }
        self.stack.push(exception)?;
        loop {
            if let ExceptionDispatch::Handler { resume_at, .. } = self.prepare_jump_exception_handler() {
                return Ok(RaiseOutcome::Handled {
                    depth: self.frames.depth(),
                    resume_at,
                });
            }
            let exception = self.stack.pop();
            self.pop_frame();
            if self.frames.is_empty() {
                return Ok(RaiseOutcome::Uncaught(exception));
            }
            self.stack
                .push(exception)
                .expect("frame teardown freed the exception's stack slot");
        }
    }

    // ========================================================================
    // Locals
    // ========================================================================

    /// Looks up a local of the current frame by name; see [`Frame::try_get_local`].
    #[must_use]
    pub fn load_local(&self, name: NameHandle) -> Option<V> {
        self.current_frame().try_get_local(&self.stack, name)
    }

    /// Assigns a local of the current frame. Returns false if `name` is not a local.
    pub fn store_local(&mut self, name: NameHandle, value: V) -> bool {
        let (frame, stack, _) = self.parts();
        frame.store_local(stack, name, value)
    }

    /// Snapshots the bound locals of the current frame.
    #[must_use]
    pub fn materialize_locals(&self) -> NameDict<V> {
        self.current_frame().materialize_locals(&self.stack)
    }

    // ========================================================================
    // Stack access
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn sp(&self) -> usize {
        self.stack.sp()
    }

    #[must_use]
    pub fn stack(&self) -> &ValueStack<V> {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ValueStack<V> {
        &mut self.stack
    }

    #[inline]
    pub fn push(&mut self, value: V) -> Result<(), ResourceError> {
        self.stack.push(value)
    }

    #[inline]
    pub fn pop(&mut self) -> V {
        self.stack.pop()
    }
}
