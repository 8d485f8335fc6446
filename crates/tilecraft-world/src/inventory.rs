//! Inventory boundary consumed by the world.
//!
//! The world only needs to know whether the present has been found and to
//! hand collected objects over. Slot bookkeeping belongs to the host.

use serde::{Deserialize, Serialize};
use tilecraft_common::ObjectKind;

/// What the world asks of the player's inventory.
pub trait Inventory {
    /// Whether the present has already been obtained (this or a prior session).
    fn has_present(&self) -> bool;

    /// Records the present as obtained. Returns whether state changed.
    fn obtain_present(&mut self) -> bool;

    /// Stores a collected object. Returns false when there is no room.
    fn add_object(&mut self, kind: ObjectKind) -> bool;
}

/// Fixed-capacity inventory: one object per slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotInventory {
    /// Stored objects
    slots: Vec<ObjectKind>,
    /// Maximum stored objects
    capacity: usize,
    /// Present flag
    has_present: bool,
}

impl SlotInventory {
    /// Creates an empty inventory with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            has_present: false,
        }
    }

    /// Creates an inventory restored from a prior session.
    #[must_use]
    pub fn restored(capacity: usize, slots: Vec<ObjectKind>, has_present: bool) -> Self {
        let mut slots = slots;
        slots.truncate(capacity);
        Self {
            slots,
            capacity,
            has_present,
        }
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Count of a given kind.
    #[must_use]
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.slots.iter().filter(|&&k| k == kind).count()
    }

    /// Removes one object of `kind` (e.g. to place it back into the world).
    pub fn take(&mut self, kind: ObjectKind) -> bool {
        match self.slots.iter().position(|&k| k == kind) {
            Some(index) => {
                self.slots.remove(index);
                true
            },
            None => false,
        }
    }
}

impl Inventory for SlotInventory {
    fn has_present(&self) -> bool {
        self.has_present
    }

    fn obtain_present(&mut self) -> bool {
        let changed = !self.has_present;
        self.has_present = true;
        changed
    }

    fn add_object(&mut self, kind: ObjectKind) -> bool {
        if self.slots.len() >= self.capacity {
            return false;
        }
        self.slots.push(kind);
        true
    }
}
