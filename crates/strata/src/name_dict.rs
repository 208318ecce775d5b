//! Open-addressing table keyed by interned name handles.
//!
//! [`NameDict`] backs every name-resolution site of the VM: local slot tables, attribute tables
//! and materialized namespaces. Keys are [`NameHandle`]s, so hashing is a single multiply-shift
//! of the 16-bit handle by a per-table seed. Collisions are resolved by linear scanning with no
//! tombstones; removal uses backward-shift deletion so collision chains stay intact under any mix
//! of inserts, removals and resizes.
//!
//! Tables whose key set is frozen after construction can call [`NameDict::tune_seed`] once to
//! pick the seed from [`HASH_SEEDS`] that spreads the current keys over the most distinct
//! home slots.

use std::fmt;

use crate::intern::NameHandle;

/// Capacity of a freshly constructed table.
pub const DEFAULT_CAPACITY: usize = 8;

/// Fill ratio above which inserting a new key doubles the capacity first.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.67;

/// Candidate hash seeds, scored in this order by [`find_perfect_hash_seed`].
///
/// The first entry is the seed of every new table.
pub const HASH_SEEDS: [u16; 32] = [
    9629, 43049, 13267, 59509, 39251, 1249, 35803, 54469, 27689, 9719, 34897, 18973, 30661, 19913, 27919, 32143, 3467,
    28019, 1051, 39419, 1361, 28547, 48197, 2609, 24317, 22861, 41467, 17623, 52837, 59053, 33589, 32117,
];

/// Home slot of `key` in a table with the given mask and seed.
#[inline]
fn home_slot(key: NameHandle, seed: u16, mask: usize) -> usize {
    let hashed = (u32::from(key.raw()) * u32::from(seed)) >> 8;
    hashed as usize & mask
}

/// Rounds a requested capacity up to the next power of two, with a minimum of 2.
#[must_use]
pub fn table_capacity(requested: usize) -> usize {
    requested.max(2).next_power_of_two()
}

/// Fraction of `keys` that land on distinct home slots under `seed`, in `(0, 1]`.
///
/// An empty key set scores 1.0.
///
/// # Panics
///
/// Panics if `capacity` is not a power of two.
#[must_use]
pub fn seed_score(capacity: usize, keys: &[NameHandle], seed: u16) -> f32 {
    assert!(capacity.is_power_of_two(), "table capacity must be a power of two");
    if keys.is_empty() {
        return 1.0;
    }
    let mask = capacity - 1;
    let mut seen = vec![false; capacity];
    let mut distinct = 0usize;
    for &key in keys {
        let slot = home_slot(key, seed, mask);
        if !seen[slot] {
            seen[slot] = true;
            distinct += 1;
        }
    }
    distinct as f32 / keys.len() as f32
}

/// Picks the seed from [`HASH_SEEDS`] with the highest [`seed_score`] for `keys`.
///
/// Ties go to the earliest candidate; an empty key set gets the first candidate.
#[must_use]
pub fn find_perfect_hash_seed(capacity: usize, keys: &[NameHandle]) -> u16 {
    if keys.is_empty() {
        return HASH_SEEDS[0];
    }
    let mut best_seed = HASH_SEEDS[0];
    let mut best_score = f32::NEG_INFINITY;
    for &seed in &HASH_SEEDS {
        let score = seed_score(capacity, keys, seed);
        if score > best_score {
            best_seed = seed;
            best_score = score;
        }
    }
    best_seed
}

/// Error returned when a required name is absent from a [`NameDict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNotFound {
    pub key: NameHandle,
}

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name {} not found", self.key)
    }
}

impl std::error::Error for KeyNotFound {}

/// Where a key sits, or would sit, in the slot array.
enum Lookup {
    /// The key lives in this slot.
    Found(usize),
    /// The key is absent; this is the empty slot that ends its collision chain.
    Vacant(usize),
}

/// Power-of-two open-addressing map from [`NameHandle`] to a `Copy` value.
///
/// Values are plain data: slot indices, object ids, small integers. Iteration order is slot
/// order, which depends on the seed and capacity and is not stable across mutation.
///
/// [`NameHandle::EMPTY`] is never a valid key: it is reported absent by every lookup and
/// rejected by [`set`](Self::set).
///
/// Deserialization checks the table layout and fails on anything [`NameDict`] itself could
/// not have produced.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "NameDictRepr<V>")]
pub struct NameDict<V> {
    /// `None` marks an empty slot. Length is always a power of two.
    slots: Vec<Option<(NameHandle, V)>>,
    len: usize,
    load_factor: f32,
    seed: u16,
}

impl<V: Copy> Default for NameDict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy> NameDict<V> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] and [`DEFAULT_LOAD_FACTOR`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_and_load_factor(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR)
    }

    /// Creates an empty table with at least `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_load_factor(capacity, DEFAULT_LOAD_FACTOR)
    }

    /// Creates an empty table with at least `capacity` slots that grows once more than
    /// `capacity * load_factor` keys would be stored.
    ///
    /// # Panics
    ///
    /// Panics unless `0 < load_factor < 1`; a full table would make lookups non-terminating.
    #[must_use]
    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Self {
        assert!(
            load_factor > 0.0 && load_factor < 1.0,
            "load factor must be in (0, 1), got {load_factor}"
        );
        Self {
            slots: vec![None; table_capacity(capacity)],
            len: 0,
            load_factor,
            seed: HASH_SEEDS[0],
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// Walks the collision chain of `key`.
    ///
    /// The load factor keeps at least one slot empty, so the chain ends within one lap.
    #[inline]
    fn locate(&self, key: NameHandle) -> Lookup {
        let mask = self.mask();
        let mut index = home_slot(key, self.seed, mask);
        for _ in 0..self.slots.len() {
            match self.slots[index] {
                None => return Lookup::Vacant(index),
                Some((existing, _)) if existing == key => return Lookup::Found(index),
                Some(_) => index = (index + 1) & mask,
            }
        }
        panic!(
            "name table lookup did not terminate: {} entries in {} slots",
            self.len,
            self.slots.len()
        );
    }

    /// Returns the value stored for `key`.
    #[inline]
    #[must_use]
    pub fn get(&self, key: NameHandle) -> Option<V> {
        match self.locate(key) {
            Lookup::Found(index) => self.slots[index].map(|(_, value)| value),
            Lookup::Vacant(_) => None,
        }
    }

    /// Returns the value stored for `key`, or [`KeyNotFound`].
    pub fn require(&self, key: NameHandle) -> Result<V, KeyNotFound> {
        self.get(key).ok_or(KeyNotFound { key })
    }

    /// Returns true if `key` is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: NameHandle) -> bool {
        matches!(self.locate(key), Lookup::Found(_))
    }

    /// Inserts or overwrites the value for `key`, returning the previous value.
    ///
    /// Inserting a new key that would push the table over its load factor doubles the capacity
    /// before the key is placed.
    ///
    /// # Panics
    ///
    /// Panics if `key` is [`NameHandle::EMPTY`].
    pub fn set(&mut self, key: NameHandle, value: V) -> Option<V> {
        assert!(!key.is_empty(), "the empty name handle cannot be used as a key");
        let index = match self.locate(key) {
            Lookup::Found(index) => {
                let previous = self.slots[index].replace((key, value));
                return previous.map(|(_, old)| old);
            }
            Lookup::Vacant(index) => index,
        };
        let index = if (self.len + 1) as f32 > self.slots.len() as f32 * self.load_factor {
            self.rehash(true);
            match self.locate(key) {
                Lookup::Vacant(index) => index,
                Lookup::Found(_) => unreachable!("absent key appeared during resize"),
            }
        } else {
            index
        };
        self.slots[index] = Some((key, value));
        self.len += 1;
        None
    }

    /// Overwrites the value for `key` only if it is already present.
    ///
    /// Returns whether the key was present.
    pub fn try_set(&mut self, key: NameHandle, value: V) -> bool {
        match self.locate(key) {
            Lookup::Found(index) => {
                self.slots[index] = Some((key, value));
                true
            }
            Lookup::Vacant(_) => false,
        }
    }

    /// Copies every entry of `other` into this table, overwriting shared keys.
    pub fn update(&mut self, other: &Self) {
        for (key, value) in other {
            self.set(key, value);
        }
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// The entries following the removed slot in its cluster are shifted back when the hole
    /// lies on their collision path, so no lookup is ever cut short by the removal.
    pub fn erase(&mut self, key: NameHandle) -> Option<V> {
        let Lookup::Found(mut hole) = self.locate(key) else {
            return None;
        };
        let removed = self.slots[hole].take().map(|(_, value)| value);
        self.len -= 1;

        let mask = self.mask();
        let mut index = (hole + 1) & mask;
        while let Some((moved_key, _)) = self.slots[index] {
            let home = home_slot(moved_key, self.seed, mask);
            let distance_from_home = index.wrapping_sub(home) & mask;
            let distance_from_hole = index.wrapping_sub(hole) & mask;
            if distance_from_home >= distance_from_hole {
                self.slots[hole] = self.slots[index].take();
                hole = index;
            }
            index = (index + 1) & mask;
        }
        removed
    }

    /// Removes `key`, returning its value or [`KeyNotFound`].
    pub fn remove_or_err(&mut self, key: NameHandle) -> Result<V, KeyNotFound> {
        self.erase(key).ok_or(KeyNotFound { key })
    }

    /// Rebuilds the table by re-placing every entry, doubling the capacity first if `resize`.
    ///
    /// # Panics
    ///
    /// Panics if the same key is found twice, which means the table was corrupted.
    pub fn rehash(&mut self, resize: bool) {
        let capacity = if resize {
            table_capacity(self.slots.len() * 2)
        } else {
            self.slots.len()
        };
        let old_slots = std::mem::replace(&mut self.slots, vec![None; capacity]);
        for (key, value) in old_slots.into_iter().flatten() {
            match self.locate(key) {
                Lookup::Vacant(index) => self.slots[index] = Some((key, value)),
                Lookup::Found(_) => panic!("name table corrupted: key {key} stored twice"),
            }
        }
    }

    /// Re-seeds the table with the candidate that spreads the current keys best, then rehashes
    /// in place.
    ///
    /// Only collision-chain layout changes; every lookup returns what it returned before.
    pub fn tune_seed(&mut self) {
        let keys: Vec<NameHandle> = self.keys().collect();
        self.seed = find_perfect_hash_seed(self.slots.len(), &keys);
        self.rehash(false);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, always a power of two.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn hash_seed(&self) -> u16 {
        self.seed
    }

    #[must_use]
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Number of entries stored away from their home slot.
    #[must_use]
    pub fn displaced(&self) -> usize {
        let mask = self.mask();
        self.slots
            .iter()
            .enumerate()
            .filter(|(index, slot)| slot.is_some_and(|(key, _)| home_slot(key, self.seed, mask) != *index))
            .count()
    }

    /// Removes every entry, keeping capacity and seed.
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.len = 0;
    }

    /// Iterates over `(key, value)` pairs in slot order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.len,
        }
    }

    /// Iterates over keys in slot order.
    pub fn keys(&self) -> impl Iterator<Item = NameHandle> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Iterates over values in slot order.
    pub fn values(&self) -> impl Iterator<Item = V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Collects every `(key, value)` pair in slot order.
    #[must_use]
    pub fn items(&self) -> Vec<(NameHandle, V)> {
        self.iter().collect()
    }
}

/// Serialized form of a [`NameDict`], validated before it becomes one.
#[derive(serde::Deserialize)]
struct NameDictRepr<V> {
    slots: Vec<Option<(NameHandle, V)>>,
    len: usize,
    load_factor: f32,
    seed: u16,
}

/// Error returned when a serialized [`NameDict`] breaks the table's layout invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidNameDict(&'static str);

impl fmt::Display for InvalidNameDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid name table: {}", self.0)
    }
}

impl std::error::Error for InvalidNameDict {}

impl<V> TryFrom<NameDictRepr<V>> for NameDict<V> {
    type Error = InvalidNameDict;

    fn try_from(repr: NameDictRepr<V>) -> Result<Self, Self::Error> {
        let NameDictRepr {
            slots,
            len,
            load_factor,
            seed,
        } = repr;
        let capacity = slots.len();
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(InvalidNameDict("capacity is not a power of two of at least 2"));
        }
        if !(load_factor > 0.0 && load_factor < 1.0) {
            return Err(InvalidNameDict("load factor outside (0, 1)"));
        }
        if slots.iter().flatten().count() != len {
            return Err(InvalidNameDict("entry count does not match occupied slots"));
        }
        if len as f32 > capacity as f32 * load_factor {
            return Err(InvalidNameDict("entry count exceeds the load factor"));
        }

        // every key must be the first match on its own collision chain, which also rules out
        // duplicates
        let mask = capacity - 1;
        for (index, entry) in slots.iter().enumerate() {
            let Some((key, _)) = entry else { continue };
            if key.is_empty() {
                return Err(InvalidNameDict("empty name handle used as a key"));
            }
            let mut cursor = home_slot(*key, seed, mask);
            loop {
                match &slots[cursor] {
                    Some((existing, _)) if existing == key => break,
                    Some(_) => cursor = (cursor + 1) & mask,
                    None => return Err(InvalidNameDict("entry unreachable from its home slot")),
                }
            }
            if cursor != index {
                return Err(InvalidNameDict("key stored twice"));
            }
        }

        Ok(Self {
            slots,
            len,
            load_factor,
            seed,
        })
    }
}

/// Iterator over the entries of a [`NameDict`], in slot order.
#[derive(Debug, Clone)]
pub struct Iter<'a, V> {
    slots: std::slice::Iter<'a, Option<(NameHandle, V)>>,
    remaining: usize,
}

impl<V: Copy> Iterator for Iter<'_, V> {
    type Item = (NameHandle, V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.slots.by_ref().find_map(|slot| *slot)?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V: Copy> ExactSizeIterator for Iter<'_, V> {}

impl<'a, V: Copy> IntoIterator for &'a NameDict<V> {
    type Item = (NameHandle, V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: Copy> Extend<(NameHandle, V)> for NameDict<V> {
    fn extend<I: IntoIterator<Item = (NameHandle, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<V: Copy> FromIterator<(NameHandle, V)> for NameDict<V> {
    fn from_iter<I: IntoIterator<Item = (NameHandle, V)>>(iter: I) -> Self {
        let mut dict = Self::new();
        dict.extend(iter);
        dict
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn h(raw: u16) -> NameHandle {
        NameHandle::from_raw(raw)
    }

    /// Returns `count` distinct keys that share the same home slot under `seed` and `capacity`.
    fn colliding_keys(count: usize, seed: u16, capacity: usize) -> Vec<NameHandle> {
        let mask = capacity - 1;
        let target = home_slot(h(1), seed, mask);
        (1..=u16::MAX)
            .map(h)
            .filter(|&key| home_slot(key, seed, mask) == target)
            .take(count)
            .collect()
    }

    #[test]
    fn defaults() {
        let dict: NameDict<u32> = NameDict::new();
        assert_eq!(dict.capacity(), 8);
        assert_eq!(dict.hash_seed(), HASH_SEEDS[0]);
        assert!((dict.load_factor() - 0.67).abs() < f32::EPSILON);
        assert!(dict.is_empty());
    }

    #[test]
    fn capacity_rounds_to_power_of_two() {
        assert_eq!(table_capacity(0), 2);
        assert_eq!(table_capacity(1), 2);
        assert_eq!(table_capacity(5), 8);
        assert_eq!(table_capacity(16), 16);
        assert_eq!(NameDict::<u8>::with_capacity(9).capacity(), 16);
    }

    #[test]
    fn sixth_insert_doubles_capacity() {
        let mut dict = NameDict::new();
        for raw in 1..=5u16 {
            dict.set(h(raw), u32::from(raw) * 10);
            assert_eq!(dict.capacity(), 8);
        }
        dict.set(h(6), 60);
        assert_eq!(dict.capacity(), 16);
        assert_eq!(dict.len(), 6);
        for raw in 1..=6u16 {
            assert_eq!(dict.get(h(raw)), Some(u32::from(raw) * 10));
        }
    }

    #[test]
    fn overwriting_never_grows() {
        let mut dict = NameDict::new();
        for raw in 1..=5u16 {
            dict.set(h(raw), 0u8);
        }
        assert_eq!(dict.set(h(5), 1), Some(0));
        assert_eq!(dict.capacity(), 8);
        assert_eq!(dict.get(h(5)), Some(1));
    }

    #[test]
    fn try_set_only_updates_present_keys() {
        let mut dict = NameDict::new();
        assert!(!dict.try_set(h(3), 1u8));
        assert!(dict.is_empty());
        dict.set(h(3), 1);
        assert!(dict.try_set(h(3), 2));
        assert_eq!(dict.get(h(3)), Some(2));
    }

    #[test]
    fn empty_handle_is_never_found() {
        let mut dict = NameDict::new();
        dict.set(h(1), 1u8);
        assert_eq!(dict.get(NameHandle::EMPTY), None);
        assert!(!dict.contains(NameHandle::EMPTY));
    }

    #[test]
    #[should_panic(expected = "empty name handle")]
    fn empty_handle_cannot_be_set() {
        NameDict::new().set(NameHandle::EMPTY, 1u8);
    }

    #[test]
    fn require_and_remove_report_misses() {
        let mut dict: NameDict<u8> = NameDict::new();
        assert_eq!(dict.require(h(9)), Err(KeyNotFound { key: h(9) }));
        assert_eq!(dict.remove_or_err(h(9)), Err(KeyNotFound { key: h(9) }));
        assert_eq!(KeyNotFound { key: h(9) }.to_string(), "name #9 not found");
    }

    #[test]
    fn erase_keeps_collision_chain_reachable() {
        let keys = colliding_keys(4, HASH_SEEDS[0], 16);
        let mut dict = NameDict::with_capacity(16);
        for (value, &key) in keys.iter().enumerate() {
            dict.set(key, value);
        }
        assert_eq!(dict.displaced(), 3);

        assert_eq!(dict.erase(keys[1]), Some(1));
        assert_eq!(dict.get(keys[0]), Some(0));
        assert_eq!(dict.get(keys[2]), Some(2));
        assert_eq!(dict.get(keys[3]), Some(3));
        assert_eq!(dict.get(keys[1]), None);
        assert_eq!(dict.displaced(), 2);

        assert_eq!(dict.erase(keys[0]), Some(0));
        assert_eq!(dict.get(keys[2]), Some(2));
        assert_eq!(dict.get(keys[3]), Some(3));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn erase_does_not_shift_entries_at_home() {
        let mut dict = NameDict::with_capacity(16);
        let keys = colliding_keys(2, HASH_SEEDS[0], 16);
        dict.set(keys[0], 0u8);
        dict.set(keys[1], 1);
        let mask = dict.capacity() - 1;
        let next_home = (home_slot(keys[0], dict.hash_seed(), mask) + 2) & mask;
        let at_home = (1..=u16::MAX)
            .map(h)
            .find(|&key| home_slot(key, dict.hash_seed(), mask) == next_home)
            .unwrap();
        dict.set(at_home, 2);
        dict.erase(keys[0]);
        assert_eq!(dict.displaced(), 0);
        assert_eq!(dict.get(at_home), Some(2));
        assert_eq!(dict.get(keys[1]), Some(1));
    }

    #[test]
    fn rehash_in_place_preserves_entries() {
        let mut dict: NameDict<u16> = (1..=5).map(|raw| (h(raw * 7), raw)).collect();
        let before = {
            let mut items = dict.items();
            items.sort();
            items
        };
        dict.rehash(false);
        let mut after = dict.items();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn seed_search_of_empty_key_set_is_first_candidate() {
        assert_eq!(find_perfect_hash_seed(8, &[]), HASH_SEEDS[0]);
        assert!((seed_score(8, &[], 1) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn seed_search_prefers_earliest_on_ties() {
        // a single key always scores 1.0, so every candidate ties
        assert_eq!(find_perfect_hash_seed(8, &[h(42)]), HASH_SEEDS[0]);
    }

    #[test]
    fn seed_search_picks_maximal_score() {
        let keys: Vec<NameHandle> = (1..=11).map(|raw| h(raw * 13)).collect();
        let best = find_perfect_hash_seed(16, &keys);
        let best_score = seed_score(16, &keys, best);
        for seed in HASH_SEEDS {
            assert!(seed_score(16, &keys, seed) <= best_score);
        }
    }

    #[test]
    fn seed_score_counts_distinct_home_slots() {
        let keys = colliding_keys(3, HASH_SEEDS[0], 8);
        assert!((seed_score(8, &keys, HASH_SEEDS[0]) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn tune_seed_preserves_lookups() {
        let mut dict: NameDict<u32> = (1..=20u16).map(|raw| (h(raw * 31 + 7), u32::from(raw))).collect();
        let snapshot = dict.items();
        dict.tune_seed();
        assert_eq!(dict.len(), snapshot.len());
        for (key, value) in snapshot {
            assert_eq!(dict.get(key), Some(value));
        }
        let keys: Vec<NameHandle> = dict.keys().collect();
        assert_eq!(dict.hash_seed(), find_perfect_hash_seed(dict.capacity(), &keys));
    }

    #[test]
    fn update_merges_and_overwrites() {
        let mut base: NameDict<u8> = [(h(1), 1), (h(2), 2)].into_iter().collect();
        let other: NameDict<u8> = [(h(2), 20), (h(3), 30)].into_iter().collect();
        base.update(&other);
        let mut items = base.items();
        items.sort();
        assert_eq!(items, vec![(h(1), 1), (h(2), 20), (h(3), 30)]);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut dict: NameDict<u8> = (1..=10).map(|raw| (h(raw), 0)).collect();
        let capacity = dict.capacity();
        dict.clear();
        assert!(dict.is_empty());
        assert_eq!(dict.capacity(), capacity);
        assert_eq!(dict.iter().count(), 0);
    }

    #[test]
    fn iterators_agree() {
        let dict: NameDict<u16> = (1..=6).map(|raw| (h(raw), raw * 2)).collect();
        assert_eq!(dict.iter().len(), 6);
        let keys: Vec<_> = dict.keys().collect();
        let values: Vec<_> = dict.values().collect();
        let items = dict.items();
        assert_eq!(items.iter().map(|(k, _)| *k).collect::<Vec<_>>(), keys);
        assert_eq!(items.iter().map(|(_, v)| *v).collect::<Vec<_>>(), values);
    }
}
