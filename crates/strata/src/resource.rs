//! Capacity limits for the execution core and the errors raised when they are hit.
//!
//! Every error in this module belongs to the capacity-exhaustion class: the value stack
//! is full, the call chain is too deep, or the name table ran out of handles. None of
//! them are retried by the core. The dispatcher is expected to abort the current
//! execution context when it sees one.

use std::fmt;

/// Default number of value slots in a [`ValueStack`](crate::ValueStack).
pub const DEFAULT_STACK_CAPACITY: usize = 16_384;

/// Recommended maximum call depth if not otherwise specified.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Number of distinct handles available to a [`StringInterner`](crate::StringInterner).
///
/// Handles are 16-bit and `0` is reserved as the empty sentinel, leaving 65535 usable values.
pub const MAX_NAME_HANDLES: usize = u16::MAX as usize;

/// Error returned when a capacity limit of the execution core is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The value stack is full.
    StackOverflow { capacity: usize },
    /// Pushing another frame would exceed the maximum call depth.
    Recursion { limit: usize, depth: usize },
    /// The interner has no handles left for a new name.
    InternTable { limit: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow { capacity } => {
                write!(f, "value stack overflow: capacity of {capacity} values exhausted")
            }
            Self::Recursion { limit, depth } => {
                write!(f, "maximum recursion depth exceeded: {depth} > {limit}")
            }
            Self::InternTable { limit } => {
                write!(f, "name table full: cannot intern more than {limit} names")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Configuration for the capacities of one interpreter instance.
///
/// Use `ResourceLimits::default()` for the standard limits, or adjust them with the
/// builder methods:
///
/// ```
/// use strata::ResourceLimits;
///
/// let limits = ResourceLimits::new().stack_capacity(1024).max_recursion_depth(64);
/// assert_eq!(limits.stack_capacity, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Number of value slots in the shared operand stack.
    pub stack_capacity: usize,
    /// Maximum number of live frames. `None` disables the check.
    pub max_recursion_depth: Option<usize>,
    /// Maximum number of names an interner may hold, static names included.
    ///
    /// Values above [`MAX_NAME_HANDLES`] are clamped to it.
    pub max_interned_names: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            max_recursion_depth: Some(DEFAULT_MAX_RECURSION_DEPTH),
            max_interned_names: MAX_NAME_HANDLES,
        }
    }
}

impl ResourceLimits {
    /// Creates limits with the default capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of value slots in the operand stack.
    #[must_use]
    pub fn stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    /// Sets the maximum call depth.
    #[must_use]
    pub fn max_recursion_depth(mut self, limit: usize) -> Self {
        self.max_recursion_depth = Some(limit);
        self
    }

    /// Removes the call depth limit.
    #[must_use]
    pub fn unbounded_recursion(mut self) -> Self {
        self.max_recursion_depth = None;
        self
    }

    /// Sets the maximum number of interned names.
    #[must_use]
    pub fn max_interned_names(mut self, limit: usize) -> Self {
        self.max_interned_names = limit.min(MAX_NAME_HANDLES);
        self
    }

    /// Checks whether one more frame may be pushed on top of `current_depth` frames.
    pub(crate) fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        match self.max_recursion_depth {
            Some(limit) if current_depth >= limit => Err(ResourceError::Recursion {
                limit,
                depth: current_depth + 1,
            }),
            _ => Ok(()),
        }
    }
}
