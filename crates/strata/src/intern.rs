//! Name interning: a table mapping string content to small stable integer handles and back.
//!
//! Handles are 16-bit. `0` is the empty sentinel and is never returned by [`StringInterner::intern`].
//! Handles are laid out as follows:
//! * 0 - empty sentinel
//! * 1 to `StaticNames::COUNT` - well-known names, pre-interned in every interner
//! * above that - names interned at runtime, in order of first appearance
//!
//! Because the static names are pre-interned in a fixed order, their handles are comparable across
//! independent interners. Every other handle is only meaningful for the interner that minted it.

use std::{
    fmt,
    sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use ahash::AHashMap;
use strum::{EnumCount, EnumIter, EnumString, FromRepr, IntoEnumIterator, IntoStaticStr};

use crate::resource::{MAX_NAME_HANDLES, ResourceError, ResourceLimits};

/// Handle of an interned name.
///
/// Ordering is by handle value, not by content, and is only stable within one interner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
pub struct NameHandle(u16);

impl NameHandle {
    /// The empty sentinel. Never minted by an interner, used to mark unused table slots.
    pub const EMPTY: Self = Self(0);

    /// Creates a handle from its raw value.
    ///
    /// Used when handles are decoded from instruction operands. The caller is responsible
    /// for the value having come from the same interner.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns true for the empty sentinel.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Position of this handle in the interner's reverse table.
    #[inline]
    fn slot(self) -> Option<usize> {
        usize::from(self.0).checked_sub(1)
    }
}

impl fmt::Display for NameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Well-known names which are pre-interned, in this order, by every [`StringInterner`].
#[repr(u16)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    FromRepr,
    EnumString,
    IntoStaticStr,
    EnumIter,
    EnumCount,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum StaticNames {
    // ==========================
    // unary operators
    #[strum(serialize = "__repr__")]
    Repr,
    #[strum(serialize = "__str__")]
    Str,
    #[strum(serialize = "__hash__")]
    Hash,
    #[strum(serialize = "__len__")]
    Len,
    #[strum(serialize = "__iter__")]
    Iter,
    #[strum(serialize = "__next__")]
    Next,
    #[strum(serialize = "__json__")]
    Json,
    #[strum(serialize = "__neg__")]
    Neg,
    #[strum(serialize = "__bool__")]
    Bool,

    // ==========================
    // comparison
    #[strum(serialize = "__eq__")]
    Eq,
    #[strum(serialize = "__lt__")]
    Lt,
    #[strum(serialize = "__le__")]
    Le,
    #[strum(serialize = "__gt__")]
    Gt,
    #[strum(serialize = "__ge__")]
    Ge,
    #[strum(serialize = "__contains__")]
    Contains,

    // ==========================
    // binary operators
    #[strum(serialize = "__add__")]
    Add,
    #[strum(serialize = "__radd__")]
    RAdd,
    #[strum(serialize = "__sub__")]
    Sub,
    #[strum(serialize = "__rsub__")]
    RSub,
    #[strum(serialize = "__mul__")]
    Mul,
    #[strum(serialize = "__rmul__")]
    RMul,
    #[strum(serialize = "__truediv__")]
    TrueDiv,
    #[strum(serialize = "__floordiv__")]
    FloorDiv,
    #[strum(serialize = "__mod__")]
    Mod,
    #[strum(serialize = "__pow__")]
    Pow,
    #[strum(serialize = "__matmul__")]
    MatMul,
    #[strum(serialize = "__lshift__")]
    LShift,
    #[strum(serialize = "__rshift__")]
    RShift,
    #[strum(serialize = "__and__")]
    And,
    #[strum(serialize = "__or__")]
    Or,
    #[strum(serialize = "__xor__")]
    Xor,
    #[strum(serialize = "__invert__")]
    Invert,

    // ==========================
    // indexer
    #[strum(serialize = "__getitem__")]
    GetItem,
    #[strum(serialize = "__setitem__")]
    SetItem,
    #[strum(serialize = "__delitem__")]
    DelItem,

    // ==========================
    // object protocol
    #[strum(serialize = "__new__")]
    New,
    #[strum(serialize = "__init__")]
    Init,
    #[strum(serialize = "__call__")]
    Call,
    #[strum(serialize = "__enter__")]
    Enter,
    #[strum(serialize = "__exit__")]
    Exit,
    #[strum(serialize = "__name__")]
    Name,
    #[strum(serialize = "__module__")]
    Module,
    #[strum(serialize = "__class__")]
    Class,
    #[strum(serialize = "__dict__")]
    Dict,
}

impl StaticNames {
    /// Returns the static name a handle refers to, if it is in the pre-interned range.
    #[must_use]
    pub fn from_handle(handle: NameHandle) -> Option<Self> {
        handle.raw().checked_sub(1).and_then(Self::from_repr)
    }

    /// Returns the name's content.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl From<StaticNames> for NameHandle {
    fn from(value: StaticNames) -> Self {
        Self(value as u16 + 1)
    }
}

impl PartialEq<StaticNames> for NameHandle {
    fn eq(&self, other: &StaticNames) -> bool {
        *self == Self::from(*other)
    }
}

/// Append-only table of interned names.
///
/// Interning the same content twice returns the same handle. Entries are never removed,
/// and content is stored behind `Arc<str>` so references returned by [`resolve`](Self::resolve)
/// never move while the interner is alive.
///
/// # Thread Safety
///
/// `StringInterner` itself is single-owner: interning requires `&mut self`. Wrap it in a
/// [`SharedInterner`] to share one table between threads or components.
#[derive(Debug, Clone)]
pub struct StringInterner {
    /// Content to handle, for deduplication.
    map: AHashMap<Arc<str>, NameHandle>,
    /// Reverse table. `names[h - 1]` is the content of handle `h`.
    names: Vec<Arc<str>>,
    /// Maximum number of names, static names included.
    limit: usize,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    /// Creates an interner with the full 16-bit handle budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_NAME_HANDLES)
    }

    /// Creates an interner bounded by `limits.max_interned_names`.
    #[must_use]
    pub fn with_limits(limits: &ResourceLimits) -> Self {
        Self::with_limit(limits.max_interned_names)
    }

    /// Creates an interner that holds at most `limit` names, static names included.
    ///
    /// The limit is clamped so the static names always fit and handles never exceed 16 bits.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.clamp(StaticNames::COUNT, MAX_NAME_HANDLES);
        let mut map = AHashMap::with_capacity(StaticNames::COUNT * 2);
        let mut names = Vec::with_capacity(StaticNames::COUNT * 2);
        for name in StaticNames::iter() {
            let content: Arc<str> = Arc::from(name.as_str());
            map.insert(Arc::clone(&content), NameHandle::from(name));
            names.push(content);
        }
        Self { map, names, limit }
    }

    /// Interns `content`, returning its handle.
    ///
    /// * If the content was interned before, returns the existing handle
    /// * Otherwise mints the next unused handle
    ///
    /// Fails with [`ResourceError::InternTable`] once the interner is full.
    pub fn intern(&mut self, content: &str) -> Result<NameHandle, ResourceError> {
        if let Some(&handle) = self.map.get(content) {
            return Ok(handle);
        }
        if self.names.len() >= self.limit {
            return Err(ResourceError::InternTable { limit: self.limit });
        }
        let raw = u16::try_from(self.names.len() + 1).expect("interner limit keeps handles within u16");
        let handle = NameHandle(raw);
        let content: Arc<str> = Arc::from(content);
        self.map.insert(Arc::clone(&content), handle);
        self.names.push(content);
        Ok(handle)
    }

    /// Returns the handle of previously interned content without minting a new one.
    #[must_use]
    pub fn lookup(&self, content: &str) -> Option<NameHandle> {
        self.map.get(content).copied()
    }

    /// Looks up the content of a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not minted by this interner (including [`NameHandle::EMPTY`]).
    #[inline]
    #[must_use]
    pub fn resolve(&self, handle: NameHandle) -> &str {
        self.try_resolve(handle).expect("invalid name handle")
    }

    /// Looks up the content of a handle, returning `None` for handles this interner never minted.
    #[inline]
    #[must_use]
    pub fn try_resolve(&self, handle: NameHandle) -> Option<&str> {
        self.names.get(handle.slot()?).map(AsRef::as_ref)
    }

    fn resolve_arc(&self, handle: NameHandle) -> Arc<str> {
        handle
            .slot()
            .and_then(|slot| self.names.get(slot))
            .map(Arc::clone)
            .expect("invalid name handle")
    }

    /// Total number of interned names, static names included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: static names are present from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of names interned beyond the static set.
    #[must_use]
    pub fn interned_name_count(&self) -> usize {
        self.names.len() - StaticNames::COUNT
    }

    /// Maximum number of names this interner accepts.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Iterates over every `(handle, content)` pair in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (NameHandle, &str)> + '_ {
        self.names.iter().zip(1u16..).map(|(content, raw)| (NameHandle(raw), &**content))
    }

    /// Serializes the interner so it can be restored with every handle intact.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let names: Vec<&str> = self.names.iter().map(AsRef::as_ref).collect();
        postcard::to_allocvec(&(self.limit, names)).expect("interner serialization should not fail")
    }

    /// Restores an interner produced by [`to_bytes`](Self::to_bytes).
    ///
    /// The restored interner hands out the same handle for every name as the original.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (limit, names): (usize, Vec<String>) = postcard::from_bytes(bytes).map_err(SnapshotError::Decode)?;
        if names.len() > MAX_NAME_HANDLES {
            return Err(SnapshotError::TooManyNames(names.len()));
        }
        let static_prefix_matches = names.len() >= StaticNames::COUNT
            && StaticNames::iter().zip(&names).all(|(expected, found)| expected.as_str() == found);
        if !static_prefix_matches {
            return Err(SnapshotError::StaticNamesMismatch);
        }

        let mut map = AHashMap::with_capacity(names.len());
        let mut table = Vec::with_capacity(names.len());
        for (name, raw) in names.into_iter().zip(1u16..) {
            let content: Arc<str> = Arc::from(name);
            if map.insert(Arc::clone(&content), NameHandle(raw)).is_some() {
                return Err(SnapshotError::Duplicate(content.to_string()));
            }
            table.push(content);
        }
        Ok(Self {
            map,
            limit: limit.clamp(table.len(), MAX_NAME_HANDLES),
            names: table,
        })
    }
}

/// Error returned when an interner snapshot cannot be restored.
#[derive(Debug)]
pub enum SnapshotError {
    /// The bytes are not a valid snapshot encoding.
    Decode(postcard::Error),
    /// The snapshot's leading names are not this build's static names.
    StaticNamesMismatch,
    /// The snapshot holds more names than handles exist.
    TooManyNames(usize),
    /// The same name appears twice.
    Duplicate(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "invalid interner snapshot: {err}"),
            Self::StaticNamesMismatch => write!(f, "interner snapshot does not start with the static names"),
            Self::TooManyNames(count) => write!(f, "interner snapshot holds {count} names, more than handles exist"),
            Self::Duplicate(name) => write!(f, "interner snapshot contains {name:?} twice"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// A cloneable, lock-guarded handle to a [`StringInterner`].
///
/// Lookups of already-interned content take a shared read lock; only minting a new handle
/// takes the write lock. A poisoned lock is recovered, since the table is append-only and
/// cannot be left half-updated by a panicking reader.
#[derive(Debug, Clone, Default)]
pub struct SharedInterner(Arc<RwLock<StringInterner>>);

impl SharedInterner {
    /// Wraps an existing interner.
    #[must_use]
    pub fn new(interner: StringInterner) -> Self {
        Self(Arc::new(RwLock::new(interner)))
    }

    /// Interns `content`, returning its handle.
    pub fn intern(&self, content: &str) -> Result<NameHandle, ResourceError> {
        if let Some(handle) = self.read().lookup(content) {
            return Ok(handle);
        }
        self.write().intern(content)
    }

    /// Returns the handle of previously interned content without minting a new one.
    #[must_use]
    pub fn lookup(&self, content: &str) -> Option<NameHandle> {
        self.read().lookup(content)
    }

    /// Looks up the content of a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not minted by this interner.
    #[must_use]
    pub fn resolve(&self, handle: NameHandle) -> Arc<str> {
        self.read().resolve_arc(handle)
    }

    /// Runs `f` with shared access to the underlying interner.
    pub fn with<R>(&self, f: impl FnOnce(&StringInterner) -> R) -> R {
        f(&self.read())
    }

    fn read(&self) -> RwLockReadGuard<'_, StringInterner> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StringInterner> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide interner, created on first use and alive for the rest of the process.
///
/// Prefer passing an explicit [`StringInterner`] or [`SharedInterner`] to components; this
/// exists for hosts that want a single ambient name table.
pub fn global_interner() -> &'static SharedInterner {
    static GLOBAL: LazyLock<SharedInterner> = LazyLock::new(SharedInterner::default);
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn static_names_have_fixed_handles() {
        let interner = StringInterner::new();
        for name in StaticNames::iter() {
            let handle = NameHandle::from(name);
            assert_eq!(interner.resolve(handle), name.as_str());
            assert_eq!(interner.lookup(name.as_str()), Some(handle));
            assert_eq!(StaticNames::from_handle(handle), Some(name));
        }
        assert_eq!(NameHandle::from(StaticNames::Repr).raw(), 1);
        assert_eq!(StaticNames::from_str("__exit__"), Ok(StaticNames::Exit));
    }

    #[test]
    fn intern_deduplicates() {
        let mut interner = StringInterner::new();
        let a = interner.intern("alpha").unwrap();
        let b = interner.intern("beta").unwrap();
        assert_ne!(a, b);
        assert_eq!(interner.intern("alpha").unwrap(), a);
        assert_eq!(interner.interned_name_count(), 2);
        assert_eq!(interner.intern("__iter__").unwrap(), StaticNames::Iter);
    }

    #[test]
    fn empty_handle_never_resolves() {
        let interner = StringInterner::new();
        assert!(interner.try_resolve(NameHandle::EMPTY).is_none());
        assert!(interner.try_resolve(NameHandle::from_raw(60_000)).is_none());
    }

    #[test]
    #[should_panic(expected = "invalid name handle")]
    fn resolve_of_foreign_handle_panics() {
        let interner = StringInterner::new();
        let _ = interner.resolve(NameHandle::from_raw(u16::MAX));
    }

    #[test]
    fn limit_is_enforced() {
        let mut interner = StringInterner::with_limit(StaticNames::COUNT + 2);
        interner.intern("x1").unwrap();
        interner.intern("x2").unwrap();
        assert_eq!(
            interner.intern("x3"),
            Err(ResourceError::InternTable {
                limit: StaticNames::COUNT + 2
            })
        );
        // existing names are still served once full
        assert!(interner.intern("x1").is_ok());
    }

    #[test]
    fn iter_is_in_handle_order() {
        let mut interner = StringInterner::new();
        let h = interner.intern("gamma").unwrap();
        let (last_handle, last_name) = interner.iter().last().unwrap();
        assert_eq!(last_handle, h);
        assert_eq!(last_name, "gamma");
    }

    #[test]
    fn snapshot_rejects_garbage() {
        assert!(matches!(
            StringInterner::from_bytes(&[0xff, 0xff, 0xff]),
            Err(SnapshotError::Decode(_))
        ));
        let bytes = postcard::to_allocvec(&(10usize, vec!["not", "static"])).unwrap();
        assert!(matches!(
            StringInterner::from_bytes(&bytes),
            Err(SnapshotError::StaticNamesMismatch)
        ));
    }
}
