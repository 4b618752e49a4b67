//! Day slots and slot sets.
//!
//! A resource exposes slots numbered `1..=25`. An editor's permission on a
//! resource is a [`SlotSet`]: a non-empty, duplicate-free set of slots.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest addressable slot.
pub const MIN_SLOT: u8 = 1;

/// Highest addressable slot.
pub const MAX_SLOT: u8 = 25;

/// A single slot number in `[MIN_SLOT, MAX_SLOT]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Slot(u8);

impl Slot {
    /// Create a slot, rejecting numbers outside `1..=25`.
    pub fn new(n: i64) -> Result<Self, ValidationError> {
        if n < MIN_SLOT as i64 || n > MAX_SLOT as i64 {
            return Err(ValidationError::SlotOutOfRange(n));
        }
        Ok(Self(n as u8))
    }

    /// The slot number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every addressable slot, ascending.
    pub fn all() -> impl Iterator<Item = Slot> {
        (MIN_SLOT..=MAX_SLOT).map(Slot)
    }
}

impl TryFrom<i64> for Slot {
    type Error = ValidationError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Slot::new(n)
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of slots.
///
/// Sets built from caller input go through [`SlotSet::from_requested`],
/// which enforces the grant rules (non-empty, in range, no duplicates).
/// [`SlotSet::empty`] and [`SlotSet::full`] exist for decisions: an editor
/// without a grant has the empty set, an admin has the full range.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u8>")]
pub struct SlotSet(BTreeSet<Slot>);

impl SlotSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// All slots `1..=25`.
    pub fn full() -> Self {
        Self(Slot::all().collect())
    }

    /// Validate a caller-supplied slot list.
    ///
    /// Rejects an empty list, any number outside `1..=25`, and any number
    /// listed twice. Order of the input is irrelevant.
    pub fn from_requested(requested: &[i64]) -> Result<Self, ValidationError> {
        if requested.is_empty() {
            return Err(ValidationError::EmptySlots);
        }

        let mut set = BTreeSet::new();
        for &n in requested {
            let slot = Slot::new(n)?;
            if !set.insert(slot) {
                return Err(ValidationError::DuplicateSlot(slot.get()));
            }
        }

        Ok(Self(set))
    }

    /// Rebuild a set from previously stored slot numbers.
    ///
    /// Unlike [`SlotSet::from_requested`] this accepts an empty list, but it
    /// still refuses out-of-range or repeated numbers.
    pub fn from_stored(stored: &[u8]) -> Result<Self, ValidationError> {
        let mut set = BTreeSet::new();
        for &n in stored {
            let slot = Slot::new(n as i64)?;
            if !set.insert(slot) {
                return Err(ValidationError::DuplicateSlot(n));
            }
        }
        Ok(Self(set))
    }

    /// Whether `slot` is in the set.
    pub fn contains(&self, slot: Slot) -> bool {
        self.0.contains(&slot)
    }

    /// Whether the raw number `n` names a slot in the set.
    ///
    /// Out-of-range numbers are simply not members.
    pub fn contains_number(&self, n: i64) -> bool {
        Slot::new(n).map(|s| self.contains(s)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.0.iter().copied()
    }

    /// Slot numbers in ascending order.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.iter().map(|s| s.get()).collect()
    }
}

impl TryFrom<Vec<i64>> for SlotSet {
    type Error = ValidationError;

    fn try_from(v: Vec<i64>) -> Result<Self, Self::Error> {
        if v.is_empty() {
            return Ok(Self::empty());
        }
        Self::from_requested(&v)
    }
}

impl FromIterator<Slot> for SlotSet {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<SlotSet> for Vec<u8> {
    fn from(set: SlotSet) -> Self {
        set.to_vec()
    }
}

impl fmt::Debug for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotSet{:?}", self.to_vec())
    }
}
