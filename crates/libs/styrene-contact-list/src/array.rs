//! Index-addressable row storage with a single removal balloon.
//!
//! Rows live in a flat slot array. Removing a row leaves a hole instead of
//! shifting everything behind it; consecutive holes are kept together as one
//! *balloon* so lookups stay O(1):
//!
//! ```text
//! logical:  0 1 2       3 4
//! physical: A B C [_ _] D E . .
//!                  ^^^ balloon (offset 3, size 2)   ^^^ placeholder tail
//! ```
//!
//! Logical index `i` lives in slot `i` when `i < offset`, else in slot
//! `i + size`.

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a row, valid until the row is removed.
    pub struct RowKey;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balloon {
    /// Logical index of the first row after the balloon.
    pub offset: usize,
    pub size: usize,
}

impl Balloon {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

#[derive(Debug)]
struct Entry<T> {
    slot: usize,
    value: T,
}

#[derive(Debug)]
pub(crate) struct RowArray<T> {
    entries: SlotMap<RowKey, Entry<T>>,
    slots: Vec<Option<RowKey>>,
    count: usize,
    balloon: Balloon,
}

impl<T> Default for RowArray<T> {
    fn default() -> Self {
        Self {
            entries: SlotMap::with_key(),
            slots: Vec::new(),
            count: 0,
            balloon: Balloon::default(),
        }
    }
}

impl<T> RowArray<T> {
    pub fn len(&self) -> usize {
        self.count
    }

    /// Empty slots after the last live row, not counting the balloon.
    pub fn extra(&self) -> usize {
        self.slots.len() - self.count - self.balloon.size
    }

    pub fn balloon(&self) -> Balloon {
        self.balloon
    }

    /// Makes room for `additional` inserts. The tail grows by at least `chunk`.
    pub fn reserve(&mut self, additional: usize, chunk: usize) {
        let available = self.extra() + self.balloon.size;
        if available >= additional {
            return;
        }
        let grow = additional.max(chunk);
        self.slots.resize(self.slots.len() + grow, None);
    }

    fn physical(&self, index: usize) -> usize {
        if self.balloon.is_empty() || index < self.balloon.offset {
            index
        } else {
            index + self.balloon.size
        }
    }

    fn logical(&self, slot: usize) -> usize {
        if self.balloon.is_empty() || slot < self.balloon.offset {
            slot
        } else {
            slot - self.balloon.size
        }
    }

    pub fn key_at(&self, index: usize) -> Option<RowKey> {
        if index >= self.count {
            return None;
        }
        self.slots.get(self.physical(index)).copied().flatten()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.key_at(index).and_then(|key| self.value(key))
    }

    pub fn value(&self, key: RowKey) -> Option<&T> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn index_of(&self, key: RowKey) -> Option<usize> {
        self.entries.get(key).map(|entry| self.logical(entry.slot))
    }

    /// Rows in logical order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).filter_map(move |index| self.get(index))
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = RowKey> + '_ {
        (0..self.count).filter_map(move |index| self.key_at(index))
    }

    /// Stores a new row and returns its key and logical index.
    ///
    /// The row takes the last slot of the balloon when there is one, landing
    /// at the balloon's offset; otherwise it is appended.
    pub fn insert(&mut self, make: impl FnOnce(RowKey) -> T) -> (RowKey, usize) {
        let (slot, index) = if self.balloon.is_empty() {
            if self.extra() == 0 {
                self.slots.push(None);
            }
            (self.count, self.count)
        } else {
            let slot = self.balloon.offset + self.balloon.size - 1;
            let index = self.balloon.offset;
            self.balloon.size -= 1;
            if self.balloon.is_empty() {
                self.balloon = Balloon::default();
            }
            (slot, index)
        };

        let key = self.entries.insert_with_key(|key| Entry {
            slot,
            value: make(key),
        });
        self.slots[slot] = Some(key);
        self.count += 1;
        (key, index)
    }

    /// Removes a row, returning its value and the logical index it had.
    pub fn remove(&mut self, key: RowKey) -> Option<(T, usize)> {
        let slot = self.entries.get(key)?.slot;
        let index = self.logical(slot);
        self.slots[slot] = None;
        self.open_hole(index, slot);
        self.count -= 1;
        if !self.balloon.is_empty() && self.balloon.offset >= self.count {
            // Nothing lives behind the balloon; it is plain tail space now.
            self.balloon = Balloon::default();
        }
        let entry = self.entries.remove(key)?;
        Some((entry.value, index))
    }

    /// Merges the hole at `slot` (logical `index`) into the balloon, moving
    /// whichever rows are cheaper to move.
    fn open_hole(&mut self, index: usize, slot: usize) {
        let Balloon { offset, size } = self.balloon;
        if size == 0 {
            self.balloon = Balloon {
                offset: index,
                size: 1,
            };
            return;
        }
        if slot + 1 == offset {
            self.balloon = Balloon {
                offset: offset - 1,
                size: size + 1,
            };
            return;
        }
        if slot == offset + size {
            self.balloon.size += 1;
            return;
        }

        // Rows behind the balloon, which a collapse would have to move.
        let behind = self.count - offset;
        if slot < offset {
            let between = offset - slot - 1;
            if between <= behind {
                for from in (slot + 1..offset).rev() {
                    self.move_slot(from, from + size);
                }
                self.balloon = Balloon {
                    offset: index,
                    size: size + 1,
                };
                return;
            }
            self.collapse();
            self.balloon = Balloon {
                offset: index,
                size: 1,
            };
        } else {
            // Every row between the balloon and the hole is also behind the
            // balloon, so relocating never costs more than collapsing.
            for from in offset + size..slot {
                self.move_slot(from, from - size);
            }
            self.balloon = Balloon {
                offset: index,
                size: size + 1,
            };
        }
    }

    /// Shifts every row behind the balloon into it, leaving no gap.
    pub fn collapse(&mut self) {
        let Balloon { offset, size } = self.balloon;
        if size == 0 {
            return;
        }
        let end = (self.count + size).min(self.slots.len());
        for from in offset + size..end {
            self.move_slot(from, from - size);
        }
        self.balloon = Balloon::default();
    }

    fn move_slot(&mut self, from: usize, to: usize) {
        let key = self.slots[from].take();
        self.slots[to] = key;
        if let Some(entry) = key.and_then(|key| self.entries.get_mut(key)) {
            entry.slot = to;
        }
    }

    /// Applies a permutation where `new_order[new_index] == old_index`.
    ///
    /// Collapses the balloon first so logical and physical indices agree.
    pub fn reorder(&mut self, new_order: &[usize]) {
        debug_assert_eq!(new_order.len(), self.count);
        self.collapse();
        let reordered: Vec<Option<RowKey>> = new_order
            .iter()
            .map(|&old| self.slots.get(old).copied().flatten())
            .collect();
        for (slot, key) in reordered.into_iter().enumerate() {
            self.slots[slot] = key;
            if let Some(entry) = key.and_then(|key| self.entries.get_mut(key)) {
                entry.slot = slot;
            }
        }
    }
}
