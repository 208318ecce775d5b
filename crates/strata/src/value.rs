//! The contract between the execution core and the host's value representation.

/// A value that can live on the operand stack and in local slots.
///
/// The core never inspects values beyond [`is_null`](Self::is_null): they are copied between
/// the stack, local slots and name tables, and popped when blocks are unwound. Values are
/// expected to be plain handles (tagged immediates or references into a host-managed heap),
/// so the stack never owns heap memory and truncating it never runs destructors.
pub trait StackValue: Copy {
    /// The "unbound" marker stored in local slots that have not been assigned.
    fn null() -> Self;

    /// Returns true for the unbound marker.
    fn is_null(&self) -> bool;
}

impl<T: Copy> StackValue for Option<T> {
    #[inline]
    fn null() -> Self {
        None
    }

    #[inline]
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

/// Opaque id of a host-owned object, used for a frame's module and function references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_null_is_none() {
        let unbound: Option<u8> = StackValue::null();
        assert!(unbound.is_null());
        assert!(!Some(3u8).is_null());
    }
}
