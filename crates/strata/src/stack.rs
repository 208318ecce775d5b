//! The fixed-capacity operand stack shared by every frame of one interpreter.

use std::ops::Range;

use crate::{
    resource::{ResourceError, ResourceLimits},
    value::StackValue,
};

/// Bump-pointer operand stack.
///
/// The stack pointer (`sp`) is the number of live values. Every frame owns a window
/// `[base, sp)` of the shared stack for its locals and temporaries; unwinding restores `sp`
/// to a recorded checkpoint by truncation.
///
/// Capacity is fixed at construction and never grows: a push onto a full stack fails with
/// [`ResourceError::StackOverflow`] instead of reallocating.
#[derive(Debug, Clone)]
pub struct ValueStack<V> {
    values: Vec<V>,
    capacity: usize,
}

impl<V: StackValue> ValueStack<V> {
    /// Creates an empty stack holding at most `capacity` values.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Creates an empty stack sized by `limits.stack_capacity`.
    #[must_use]
    pub fn with_limits(limits: &ResourceLimits) -> Self {
        Self::new(limits.stack_capacity)
    }

    /// Current stack pointer: the number of live values.
    #[inline]
    #[must_use]
    pub fn sp(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values that can still be pushed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.values.len()
    }

    #[inline]
    fn overflow(&self) -> ResourceError {
        ResourceError::StackOverflow {
            capacity: self.capacity,
        }
    }

    /// Pushes a value.
    #[inline]
    pub fn push(&mut self, value: V) -> Result<(), ResourceError> {
        if self.values.len() >= self.capacity {
            return Err(self.overflow());
        }
        self.values.push(value);
        Ok(())
    }

    /// Pushes `count` copies of `value`, or nothing if they do not all fit.
    pub fn push_n(&mut self, count: usize, value: V) -> Result<(), ResourceError> {
        if count > self.remaining() {
            return Err(self.overflow());
        }
        self.values.resize(self.values.len() + count, value);
        Ok(())
    }

    /// Pushes every value of `values`, or nothing if they do not all fit.
    pub fn extend_from_slice(&mut self, values: &[V]) -> Result<(), ResourceError> {
        if values.len() > self.remaining() {
            return Err(self.overflow());
        }
        self.values.extend_from_slice(values);
        Ok(())
    }

    /// Pops the top value.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty; the bytecode is expected to be balanced.
    #[inline]
    pub fn pop(&mut self) -> V {
        self.values.pop().expect("value stack underflow")
    }

    /// Pops the top value if there is one.
    #[inline]
    pub fn try_pop(&mut self) -> Option<V> {
        self.values.pop()
    }

    /// Returns the top value without removing it.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> V {
        *self.values.last().expect("value stack underflow")
    }

    /// Returns the value `depth` slots below the top; depth 0 is the top.
    #[inline]
    #[must_use]
    pub fn peek_at_depth(&self, depth: usize) -> V {
        let index = self
            .values
            .len()
            .checked_sub(depth + 1)
            .expect("value stack underflow");
        self.values[index]
    }

    /// Lowers the stack pointer to `sp`, discarding everything above it.
    ///
    /// # Panics
    ///
    /// Panics if `sp` is above the current stack pointer.
    #[inline]
    pub fn truncate(&mut self, sp: usize) {
        assert!(
            sp <= self.values.len(),
            "cannot restore stack pointer {sp} above current {}",
            self.values.len()
        );
        self.values.truncate(sp);
    }

    /// Returns the value at absolute index `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<V> {
        self.values.get(index).copied()
    }

    /// Overwrites the value at absolute index `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is at or above the stack pointer.
    #[inline]
    pub fn set(&mut self, index: usize, value: V) {
        self.values[index] = value;
    }

    /// Live values in `range`, by absolute index.
    #[inline]
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> &[V] {
        &self.values[range]
    }

    #[inline]
    pub fn slice_mut(&mut self, range: Range<usize>) -> &mut [V] {
        &mut self.values[range]
    }

    /// All live values, bottom first.
    #[must_use]
    pub fn as_slice(&self) -> &[V] {
        &self.values
    }

    /// Discards every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn push_pop_peek() {
        let mut stack = ValueStack::new(4);
        stack.push(Some(1)).unwrap();
        stack.push(Some(2)).unwrap();
        assert_eq!(stack.sp(), 2);
        assert_eq!(stack.peek(), Some(2));
        assert_eq!(stack.peek_at_depth(1), Some(1));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.try_pop(), Some(Some(1)));
        assert_eq!(stack.try_pop(), None);
    }

    #[test]
    fn overflow_is_an_error_and_leaves_stack_intact() {
        let mut stack = ValueStack::new(2);
        stack.push(Some(1u8)).unwrap();
        stack.push(Some(2)).unwrap();
        assert_eq!(stack.push(Some(3)), Err(ResourceError::StackOverflow { capacity: 2 }));
        assert_eq!(stack.as_slice(), &[Some(1), Some(2)]);
    }

    #[test]
    fn bulk_pushes_are_all_or_nothing() {
        let mut stack: ValueStack<Option<u8>> = ValueStack::new(3);
        stack.push(Some(9)).unwrap();
        assert!(stack.push_n(3, None).is_err());
        assert!(stack.extend_from_slice(&[Some(1), Some(2), Some(3)]).is_err());
        assert_eq!(stack.sp(), 1);
        stack.push_n(2, None).unwrap();
        assert_eq!(stack.as_slice(), &[Some(9), None, None]);
        assert_eq!(stack.remaining(), 0);
    }

    #[test]
    fn truncate_restores_pointer() {
        let mut stack = ValueStack::new(8);
        stack.extend_from_slice(&[Some(1), Some(2), Some(3)]).unwrap();
        stack.truncate(1);
        assert_eq!(stack.as_slice(), &[Some(1)]);
    }

    #[test]
    #[should_panic(expected = "cannot restore stack pointer")]
    fn truncate_above_sp_panics() {
        let mut stack: ValueStack<Option<u8>> = ValueStack::new(8);
        stack.truncate(1);
    }

    #[test]
    #[should_panic(expected = "value stack underflow")]
    fn pop_of_empty_stack_panics() {
        let mut stack: ValueStack<Option<u8>> = ValueStack::new(1);
        stack.pop();
    }
}
