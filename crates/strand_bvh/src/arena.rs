//! Lock-free bump allocation for nodes and leaf primitives.
//!
//! Workers claim slots with a single atomic add against preallocated
//! storage, so concurrent allocations from distinct threads never
//! contend on a lock. Capacity is fixed up front from the primitive
//! count; running out is a fatal build error.

use std::cell::UnsafeCell;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct Arena<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    len: AtomicUsize,
}

// SAFETY: slots are only written through indices handed out exactly once
// by `push`/`push_iter`, and only read through `get` after the index has
// been published to the reader.
unsafe impl<T: Send + Sync> Sync for Arena<T> {}
unsafe impl<T: Send> Send for Arena<T> {}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self {
            slots,
            len: AtomicUsize::new(0),
        }
    }

    /// Claims the next slot, moves `value` into it, and returns its index.
    pub fn push(&self, value: T) -> usize {
        let index = self.claim(1);
        // SAFETY: `claim` hands out this index exactly once; nothing else
        // touches the slot until the index is published by the caller.
        unsafe { (*self.slots[index].get()).write(value) };
        index
    }

    /// Claims `count` consecutive slots and fills them from `items`,
    /// returning the first index. `items` must yield at least `count`
    /// elements.
    pub fn push_iter(&self, count: usize, items: impl Iterator<Item = T>) -> usize {
        let first = self.claim(count);
        let mut written = 0;
        for (i, item) in items.take(count).enumerate() {
            // SAFETY: as in `push`; the claimed range is exclusively ours.
            unsafe { (*self.slots[first + i].get()).write(item) };
            written += 1;
        }
        assert_eq!(written, count, "arena fill ended short of claimed slots");
        first
    }

    fn claim(&self, count: usize) -> usize {
        let first = self.len.fetch_add(count, Ordering::AcqRel);
        assert!(
            first + count <= self.slots.len(),
            "arena capacity exhausted ({} slots)",
            self.slots.len()
        );
        first
    }

    /// Shared access to an initialized slot.
    pub fn get(&self, index: usize) -> &T {
        debug_assert!(index < self.len.load(Ordering::Acquire));
        // SAFETY: indices below `len` were initialized by `push`/
        // `push_iter` and are never written again.
        unsafe { (*self.slots[index].get()).assume_init_ref() }
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Consumes the arena, returning the initialized prefix.
    pub fn into_vec(self) -> Vec<T> {
        let mut this = ManuallyDrop::new(self);
        let len = *this.len.get_mut();
        let slots = std::mem::take(&mut this.slots);
        let mut out = Vec::with_capacity(len);
        for slot in slots.into_vec().into_iter().take(len) {
            // SAFETY: the first `len` slots are initialized.
            out.push(unsafe { slot.into_inner().assume_init() });
        }
        out
    }
}

impl<T> Drop for Arena<T> {
    fn drop(&mut self) {
        let len = *self.len.get_mut();
        for slot in self.slots.iter_mut().take(len) {
            // SAFETY: the first `len` slots are initialized.
            unsafe { slot.get_mut().assume_init_drop() };
        }
    }
}
