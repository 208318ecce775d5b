//! Code objects as seen by the execution core.
//!
//! The compiler produces a [`Code`] through [`CodeBuilder`]; the frame and unwinding
//! machinery only reads it. The read contract is:
//!
//! - the instruction stream, each instruction tagged with its line, innermost block and
//!   whether it was compiler-inserted
//! - the constant pool and local names
//! - the block table, a forest of lexical loop/try/with blocks linked by parent ids

pub use builder::CodeBuilder;
pub use code::{BlockId, BlockType, Code, CodeBlock, Instruction, NOP};

mod builder;
mod code;
