//! Data structures for the route table

use crate::constants::{MAX_PREFIX_LEN, SECTION_COUNT, SECTION_SIZE, SLOT_COUNT};
use crate::helpers::{canonical, mask};
use ipnet::Ipv4Net;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Every route registered at one exact prefix length.
pub(crate) struct Slot<V> {
    pub(crate) prefix_len: u8,
    pub(crate) mask: u32,                     // top `prefix_len` bits set
    pub(crate) entries: HashMap<u32, Arc<V>>, // canonical network -> value
}

impl<V> Slot<V> {
    pub(crate) fn new(prefix_len: u8) -> Self {
        Self {
            prefix_len,
            mask: mask(prefix_len),
            entries: HashMap::new(),
        }
    }
}

/// Everything a section lock guards.
pub(crate) struct SectionState<V> {
    /// Bit `j` is set iff `slots[j].entries` is non-empty.
    pub(crate) occupancy: u8,
    /// Longest prefix first.
    pub(crate) slots: Vec<Slot<V>>,
}

impl<V> SectionState<V> {
    /// Insert or overwrite; returns the value the slot held before.
    pub(crate) fn insert(&mut self, bit: usize, network: u32, value: Arc<V>) -> Option<Arc<V>> {
        let slot = &mut self.slots[bit];
        debug_assert_eq!(canonical(network, slot.prefix_len), network);
        let prev = slot.entries.insert(network, value);
        self.occupancy |= 1 << bit;
        prev
    }

    pub(crate) fn remove(&mut self, bit: usize, network: u32) -> Option<Arc<V>> {
        let slot = &mut self.slots[bit];
        let prev = slot.entries.remove(&network);
        if slot.entries.is_empty() {
            self.occupancy &= !(1 << bit);
        }
        prev
    }

    /// First hit walking set occupancy bits from the longest prefix down.
    pub(crate) fn probe(&self, addr: u32) -> Option<(&Slot<V>, &Arc<V>)> {
        let mut bits = self.occupancy;
        while bits != 0 {
            let j = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            let slot = &self.slots[j];
            if let Some(value) = slot.entries.get(&(addr & slot.mask)) {
                return Some((slot, value));
            }
        }
        None
    }

    pub(crate) fn drain(&mut self) -> Vec<Arc<V>> {
        self.occupancy = 0;
        self.slots
            .iter_mut()
            .flat_map(|slot| slot.entries.drain().map(|(_, v)| v))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().map(|slot| slot.entries.len()).sum()
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.slots.iter().enumerate().all(|(j, slot)| {
            let occupied = self.occupancy & (1 << j) != 0;
            occupied != slot.entries.is_empty()
                && slot
                    .entries
                    .keys()
                    .all(|&k| canonical(k, slot.prefix_len) == k)
        }) && (self.occupancy as u32) >> self.slots.len() == 0
    }
}

/// A contiguous run of slots behind one lock.
pub(crate) struct Section<V> {
    state: RwLock<SectionState<V>>,
}

impl<V> Section<V> {
    /// Section `index` covers slot indices `index * SECTION_SIZE ..`, clamped to `SLOT_COUNT`.
    pub(crate) fn new(index: usize) -> Self {
        let first = index * SECTION_SIZE;
        let last = (first + SECTION_SIZE).min(SLOT_COUNT);
        let slots = (first..last)
            .map(|slot| Slot::new(MAX_PREFIX_LEN - slot as u8))
            .collect();
        Self {
            state: RwLock::new(SectionState {
                occupancy: 0,
                slots,
            }),
        }
    }

    // A panic cannot leave the bitmask and the maps disagreeing, so poison is ignored.
    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, SectionState<V>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SectionState<V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// IPv4 longest-prefix-match table: sections ordered from /32 down to /0.
///
/// Values are shared with the caller through `Arc`; the table drops only its
/// own reference when a route is overwritten or deleted.
///
/// Slots and sections stay internal; only the table is handed out.
///
/// ```compile_fail
/// let _ = maskroute_core::types::Slot::<u8>::new(24);
/// ```
pub struct RouteTable<V> {
    pub(crate) sections: [Section<V>; SECTION_COUNT],
}

/// Longest-prefix match result.
#[derive(Debug)]
pub struct Match<V> {
    pub network: Ipv4Net,
    pub value: Arc<V>,
}
