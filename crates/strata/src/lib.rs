#![doc = include_str!("../../../README.md")]

mod bytecode;
mod frame;
mod intern;
mod interpreter;
pub mod name_dict;
mod resource;
mod stack;
pub mod tracer;
mod value;

pub use crate::{
    bytecode::{BlockId, BlockType, Code, CodeBlock, CodeBuilder, Instruction, NOP},
    frame::{ExceptionDispatch, Frame, FrameId, FramePool, Locals, UnwindTarget},
    intern::{NameHandle, SharedInterner, SnapshotError, StaticNames, StringInterner, global_interner},
    interpreter::{Interpreter, RaiseOutcome},
    name_dict::{
        DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR, HASH_SEEDS, InvalidNameDict, KeyNotFound, NameDict, find_perfect_hash_seed,
        seed_score,
    },
    resource::{DEFAULT_MAX_RECURSION_DEPTH, DEFAULT_STACK_CAPACITY, MAX_NAME_HANDLES, ResourceError, ResourceLimits},
    stack::ValueStack,
    tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, VmTracer},
    value::{ObjectId, StackValue},
};
