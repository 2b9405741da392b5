//! # Admission Registry
//!
//! Append-only record of the timing parameters of every admitted
//! deadline-scheduled task. The registry is the source of truth for
//! admission control: feasibility tests run against its contents plus
//! the candidate, never against scheduler state.
//!
//! Entries are appended only after a successful admission and never
//! mutated afterwards. The one exception is task deletion, which
//! compacts by swapping the last entry into the vacated slot.

use heapless::Vec;

use crate::config::REGISTRY_CAPACITY;
use crate::task::EdfParams;

/// One admitted parameter record and the task that owns it.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub params: EdfParams,
    /// Index of the owning task in the scheduler's task array.
    pub owner: usize,
}

/// Fixed-capacity store of admitted `(C, D, T)` records.
pub struct Registry {
    entries: Vec<RegistryEntry, REGISTRY_CAPACITY>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a record. Returns the slot index, or `None` when the
    /// registry is at capacity.
    pub fn add(&mut self, params: EdfParams, owner: usize) -> Option<usize> {
        let slot = self.entries.len();
        self.entries.push(RegistryEntry { params, owner }).ok()?;
        Some(slot)
    }

    /// Remove the record in `slot` by swapping the last entry into its
    /// place. Returns the owner of the entry that now occupies `slot`
    /// (so the caller can patch that task's stored slot index), or
    /// `None` if the slot emptied or was out of range.
    pub fn remove(&mut self, slot: usize) -> Option<usize> {
        if slot >= self.entries.len() {
            return None;
        }
        self.entries.swap_remove(slot);
        if slot < self.entries.len() {
            Some(self.entries[slot].owner)
        } else {
            None
        }
    }

    /// Timing parameters of every admitted task, in slot order.
    pub fn params(&self) -> impl Iterator<Item = &EdfParams> {
        self.entries.iter().map(|e| &e.params)
    }

    pub fn get(&self, slot: usize) -> Option<&RegistryEntry> {
        self.entries.get(slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == REGISTRY_CAPACITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_slot_order() {
        let mut reg = Registry::new();
        assert_eq!(reg.add(EdfParams::new(1, 10, 10), 0), Some(0));
        assert_eq!(reg.add(EdfParams::new(2, 20, 20), 1), Some(1));
        assert_eq!(reg.add(EdfParams::new(3, 30, 30), 2), Some(2));

        let periods: std::vec::Vec<u32> = reg.params().map(|p| p.period).collect();
        assert_eq!(periods, [10, 20, 30]);
    }

    #[test]
    fn rejects_when_full() {
        let mut reg = Registry::new();
        for i in 0..REGISTRY_CAPACITY {
            assert!(reg.add(EdfParams::new(1, 100, 100), i).is_some());
        }
        assert!(reg.is_full());
        assert!(reg.add(EdfParams::new(1, 100, 100), 0).is_none());
        assert_eq!(reg.len(), REGISTRY_CAPACITY);
    }

    #[test]
    fn remove_swaps_last_into_slot() {
        let mut reg = Registry::new();
        reg.add(EdfParams::new(1, 10, 10), 7);
        reg.add(EdfParams::new(2, 20, 20), 8);
        reg.add(EdfParams::new(3, 30, 30), 9);

        // Removing the first slot moves the last entry (owner 9) into it.
        assert_eq!(reg.remove(0), Some(9));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(0).unwrap().params.period, 30);

        // Removing the tail slot moves nothing.
        assert_eq!(reg.remove(1), None);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_out_of_range_is_a_noop() {
        let mut reg = Registry::new();
        reg.add(EdfParams::new(1, 10, 10), 0);
        assert_eq!(reg.remove(5), None);
        assert_eq!(reg.len(), 1);
    }
}
