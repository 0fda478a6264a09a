//! Slot storage holding the live instances of one kind.

use std::{cmp::Reverse, collections::BinaryHeap, sync::Arc};

use parking_lot::RwLock;
use smallvec::SmallVec;

/// Handle to a slot. Goes stale once the entry is removed, even if the
/// slot is later reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    index: usize,
    generation: u32,
}

impl Key {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

struct Slot<T: ?Sized> {
    generation: u32,
    value: Option<Arc<T>>,
}

struct Slots<T: ?Sized> {
    entries: Vec<Slot<T>>,
    free: BinaryHeap<Reverse<usize>>,
    len: usize,
}

impl<T: ?Sized> Slots<T> {
    fn live(&self) -> impl Iterator<Item = (Key, &Arc<T>)> {
        self.entries.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Key {
                        index,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    fn take(&mut self, index: usize) -> Option<Arc<T>> {
        let slot = self.entries.get_mut(index)?;
        let value = slot.value.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(Reverse(index));
        self.len -= 1;

        Some(value)
    }
}

/// Pool of live instances addressed by [`Key`].
///
/// Removed slots are reused, lowest index first, before the storage grows.
/// Scans visit entries in slot order.
pub struct Pool<T: ?Sized> {
    slots: RwLock<Slots<T>>,
}

impl<T: ?Sized> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Pool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: Vec::with_capacity(capacity),
                free: BinaryHeap::new(),
                len: 0,
            }),
        }
    }

    pub fn insert(&self, value: Arc<T>) -> Key {
        let mut slots = self.slots.write();
        slots.len += 1;

        if let Some(Reverse(index)) = slots.free.pop() {
            let slot = &mut slots.entries[index];
            slot.value = Some(value);

            Key {
                index,
                generation: slot.generation,
            }
        } else {
            let index = slots.entries.len();
            slots.entries.push(Slot {
                generation: 0,
                value: Some(value),
            });

            Key {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, key: Key) -> Option<Arc<T>> {
        let slots = self.slots.read();
        let slot = slots.entries.get(key.index)?;

        if slot.generation == key.generation {
            slot.value.clone()
        } else {
            None
        }
    }

    #[inline]
    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: Key) -> Option<Arc<T>> {
        let mut slots = self.slots.write();
        let live = matches!(
            slots.entries.get(key.index),
            Some(slot) if slot.generation == key.generation
        );

        if live {
            slots.take(key.index)
        } else {
            None
        }
    }

    /// First live entry matching `pred`.
    pub fn find<F>(&self, mut pred: F) -> Option<Arc<T>>
    where
        F: FnMut(&T) -> bool,
    {
        self.slots
            .read()
            .live()
            .find(|(_, value)| pred(value))
            .map(|(_, value)| value.clone())
    }

    pub fn find_key<F>(&self, mut pred: F) -> Option<Key>
    where
        F: FnMut(&T) -> bool,
    {
        self.slots
            .read()
            .live()
            .find(|(_, value)| pred(value))
            .map(|(key, _)| key)
    }

    pub fn filter<F>(&self, mut pred: F) -> Vec<Arc<T>>
    where
        F: FnMut(&T) -> bool,
    {
        self.slots
            .read()
            .live()
            .filter(|(_, value)| pred(value))
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Snapshot of every live entry.
    pub fn all(&self) -> Vec<Arc<T>> {
        self.filter(|_| true)
    }

    /// Drops the entries `keep` rejects, returning how many went away.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut slots = self.slots.write();
        let doomed: SmallVec<[usize; 8]> = slots
            .live()
            .filter(|(_, value)| !keep(value))
            .map(|(key, _)| key.index)
            .collect();

        for &index in &doomed {
            slots.take(index);
        }

        doomed.len()
    }

    pub fn clear(&self) {
        let mut slots = self.slots.write();
        let indices: SmallVec<[usize; 8]> = slots.live().map(|(key, _)| key.index).collect();

        for index in indices {
            slots.take(index);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.read().len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots allocated so far, live or free.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.read().entries.len()
    }

    #[inline]
    pub fn free_slots(&self) -> usize {
        self.slots.read().free.len()
    }
}
