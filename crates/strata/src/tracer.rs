//! Execution tracing for the frame and unwinding machinery.
//!
//! [`Interpreter`](crate::Interpreter) carries its tracer as a type parameter `Tr: VmTracer`.
//! Every hook has a default no-op body, so with [`NoopTracer`] the calls monomorphize away
//! and tracing costs nothing.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (default) |
//! | [`StderrTracer`] | Human-readable log of frame and unwind events on stderr |
//! | [`RecordingTracer`] | Captures [`TraceEvent`]s for post-mortem assertions |
//!
//! ```
//! use strata::{CodeBuilder, Interpreter, NameHandle, RecordingTracer, ResourceLimits, TraceEvent};
//!
//! let code: strata::Code<Option<i64>> = CodeBuilder::new(NameHandle::from_raw(100)).build();
//! let mut vm = Interpreter::with_tracer(ResourceLimits::default(), RecordingTracer::new());
//! vm.push_module(&code, strata::ObjectId::new(0)).unwrap();
//! vm.pop_frame();
//! assert_eq!(
//!     vm.tracer().events(),
//!     &[TraceEvent::Call { depth: 1 }, TraceEvent::Return { depth: 0, released_targets: 0 }]
//! );
//! ```

use crate::bytecode::{BlockId, BlockType};

/// Event captured by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A frame was pushed.
    Call {
        /// Call stack depth after the push.
        depth: usize,
    },
    /// A frame was destroyed.
    Return {
        /// Call stack depth after the pop.
        depth: usize,
        /// Number of unwind checkpoints the frame released.
        released_targets: usize,
    },
    /// A checkpoint was created or recalibrated.
    UnwindTarget { block: BlockId, offset: usize },
    /// A block was left during unwinding.
    BlockExit {
        block: BlockId,
        kind: BlockType,
        /// Values popped on the way out.
        popped: usize,
    },
    /// A break or jump finished unwinding and will resume at `target`.
    JumpBreak { target: usize },
    /// An exception was routed to the handler of `block`.
    ExceptionHandler { block: BlockId, resume_at: usize },
    /// The current frame has no handler for the pending exception.
    ExceptionUnhandled {
        /// Call stack depth of the frame that could not handle it.
        depth: usize,
    },
}

/// Hooks into frame lifecycle and control-flow unwinding.
///
/// All methods default to no-ops; implementations override the ones they care about.
pub trait VmTracer: std::fmt::Debug {
    /// Called after a frame is pushed, with the call stack depth after the push.
    #[inline(always)]
    fn on_call(&mut self, _depth: usize) {}

    /// Called after a frame is destroyed.
    ///
    /// # Arguments
    /// * `depth` - Call stack depth after the pop
    /// * `released_targets` - Number of unwind checkpoints the frame still held
    #[inline(always)]
    fn on_return(&mut self, _depth: usize, _released_targets: usize) {}

    /// Called when a checkpoint for `block` is recorded at `offset` from the locals base.
    #[inline(always)]
    fn on_unwind_target(&mut self, _block: BlockId, _offset: usize) {}

    /// Called for every block left during a break, jump or exception unwind.
    #[inline(always)]
    fn on_block_exit(&mut self, _block: BlockId, _kind: BlockType, _popped: usize) {}

    /// Called when a break or jump has finished unwinding.
    #[inline(always)]
    fn on_jump_break(&mut self, _target: usize) {}

    /// Called when an exception is routed to a handler in the current frame.
    #[inline(always)]
    fn on_exception_handler(&mut self, _block: BlockId, _resume_at: usize) {}

    /// Called when the current frame has no enclosing try block for an exception.
    #[inline(always)]
    fn on_exception_unhandled(&mut self, _depth: usize) {}
}

/// Tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

// ============================================================================
// StderrTracer
// ============================================================================

/// Tracer that prints frame and unwind events to stderr.
///
/// Output format:
/// ```text
///   >>> CALL      depth=1
///   ... TARGET    b0 offset=2
///   --- EXIT      b1 ForLoop popped=1
///   !!! HANDLER   b0 resume=14
///   <<< RETURN    depth=0 released=1
/// ```
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Stop printing after this many events. `None` means unlimited.
    limit: Option<usize>,
    count: usize,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracer that goes quiet after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
        }
    }

    /// Returns false once the limit is reached, printing a notice the first time.
    fn admit(&mut self) -> bool {
        match self.limit {
            Some(limit) if self.count > limit => false,
            Some(limit) if self.count == limit => {
                eprintln!("--- trace limit reached ({limit} events) ---");
                self.count += 1;
                false
            }
            _ => {
                self.count += 1;
                true
            }
        }
    }
}

impl VmTracer for StderrTracer {
    fn on_call(&mut self, depth: usize) {
        if self.admit() {
            eprintln!("  >>> CALL      depth={depth}");
        }
    }

    fn on_return(&mut self, depth: usize, released_targets: usize) {
        if self.admit() {
            eprintln!("  <<< RETURN    depth={depth} released={released_targets}");
        }
    }

    fn on_unwind_target(&mut self, block: BlockId, offset: usize) {
        if self.admit() {
            eprintln!("  ... TARGET    {block} offset={offset}");
        }
    }

    fn on_block_exit(&mut self, block: BlockId, kind: BlockType, popped: usize) {
        if self.admit() {
            eprintln!("  --- EXIT      {block} {kind:?} popped={popped}");
        }
    }

    fn on_jump_break(&mut self, target: usize) {
        if self.admit() {
            eprintln!("  --> BREAK     target={target}");
        }
    }

    fn on_exception_handler(&mut self, block: BlockId, resume_at: usize) {
        if self.admit() {
            eprintln!("  !!! HANDLER   {block} resume={resume_at}");
        }
    }

    fn on_exception_unhandled(&mut self, depth: usize) {
        if self.admit() {
            eprintln!("  !!! UNHANDLED depth={depth}");
        }
    }
}

// ============================================================================
// RecordingTracer
// ============================================================================

/// Tracer that records every event, in order.
///
/// Allocates per event; meant for tests and short debugging sessions.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Discards recorded events, keeping the limit.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_none_or(|limit| self.events.len() < limit) {
            self.events.push(event);
        }
    }
}

impl VmTracer for RecordingTracer {
    fn on_call(&mut self, depth: usize) {
        self.record(TraceEvent::Call { depth });
    }

    fn on_return(&mut self, depth: usize, released_targets: usize) {
        self.record(TraceEvent::Return {
            depth,
            released_targets,
        });
    }

    fn on_unwind_target(&mut self, block: BlockId, offset: usize) {
        self.record(TraceEvent::UnwindTarget { block, offset });
    }

    fn on_block_exit(&mut self, block: BlockId, kind: BlockType, popped: usize) {
        self.record(TraceEvent::BlockExit { block, kind, popped });
    }

    fn on_jump_break(&mut self, target: usize) {
        self.record(TraceEvent::JumpBreak { target });
    }

    fn on_exception_handler(&mut self, block: BlockId, resume_at: usize) {
        self.record(TraceEvent::ExceptionHandler { block, resume_at });
    }

    fn on_exception_unhandled(&mut self, depth: usize) {
        self.record(TraceEvent::ExceptionUnhandled { depth });
    }
}
