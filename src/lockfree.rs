use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::CachePadded;

// The packed word is `(logical_index << 1) | write_flag`. The helpers
// below are pure functions of the word, shared-state-free so they can be
// tested in isolation from any concurrency.

/// Clears the flag bit, keeping the shifted index.
#[inline]
fn raw_index(w: u32) -> u32 {
    w & !1
}

/// Sets the flag bit.
#[inline]
fn with_flag(w: u32) -> u32 {
    w | 1
}

/// Extracts the occupancy count.
#[inline]
fn logical(w: u32) -> u32 {
    w >> 1
}

/// Decrements the occupancy count, preserving the flag bit.
#[inline]
fn decf(w: u32) -> u32 {
    debug_assert!(w >= 2);
    w - 2
}

/// Increments the occupancy count, preserving the flag bit.
#[inline]
fn incf(w: u32) -> u32 {
    w + 2
}

/// True when the occupancy count is zero, irrespective of the flag bit.
#[inline]
fn is_empty_word(w: u32) -> bool {
    w < 2
}

/// A fixed-capacity stack synchronized purely with atomic compare-and-swap.
///
/// The logical top-of-stack index and an exclusive-write flag are packed
/// into one `AtomicU32` as `(index << 1) | flag`, so every mutation is a
/// single CAS on that word and no operation ever blocks; contended
/// operations spin their retry loop instead.
///
/// # This design is intentionally flawed
///
/// The stack reproduces a classic naive bit-packed scheme to show why it
/// is fragile, and keeps the flaws rather than fixing them:
///
/// * The push-side flag acquisition CAS degenerates to a no-op whenever
///   the flag is already set (`w | 1 == w`), so it "succeeds" even while
///   another writer holds the write window. Two concurrent pushes can
///   therefore write the same slot, duplicating one value and losing the
///   other.
/// * The pop path never consults the flag's meaning at all; it merely
///   strips the bit before comparing, so a pop can race a push's
///   in-flight slot write.
///
/// What does hold: the occupancy count itself only moves through
/// successful CAS steps, so it is conserved: it never exceeds capacity
/// and ends up exactly balanced. Do not use this type where a correct
/// concurrent stack is needed; wrap the baseline in a mutex
/// ([`LockedStack`](crate::LockedStack)) instead.
///
/// Elements move in and out by copy; the index width caps capacity at
/// `u32::MAX >> 1` slots.
///
/// # Examples
/// ```
/// use packed_flag_stack::LockFreeStack;
///
/// let mut stack = LockFreeStack::new();
/// stack.configure(100);
/// stack.push(1);
/// stack.push(2);
/// stack.push(3);
/// assert_eq!(stack.try_pop(), Some(3));
/// assert_eq!(stack.try_pop(), Some(2));
/// assert_eq!(stack.try_pop(), Some(1));
/// assert_eq!(stack.try_pop(), None);
/// ```
pub struct LockFreeStack<T> {
    slots: Box<[UnsafeCell<T>]>,
    /// Sole source of truth for occupancy. Padded to keep the contended
    /// word on its own cache line, away from the slot buffer pointer.
    packed: CachePadded<AtomicU32>,
}

// Safety: slot access is coordinated through `packed` (imperfectly, see
// the type docs), and elements only ever cross threads by copy.
unsafe impl<T: Send + Copy> Sync for LockFreeStack<T> {}

impl<T: Copy + Default> LockFreeStack<T> {
    /// Creates an empty stack with capacity 0.
    ///
    /// Nothing can be pushed until [`configure`](LockFreeStack::configure)
    /// has run.
    pub fn new() -> Self {
        LockFreeStack {
            slots: Box::new([]),
            packed: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// Allocates storage for exactly `capacity` elements and resets the
    /// stack to empty.
    ///
    /// Must not run concurrently with any other operation; the exclusive
    /// borrow enforces that for safe callers. Call exactly once, before
    /// the stack is shared. Slots are default-initialized so no
    /// speculative read ever touches uninitialized memory.
    ///
    /// # Panics
    /// Panics if `capacity` does not fit in the packed index width.
    pub fn configure(&mut self, capacity: usize) {
        assert!(
            capacity <= (u32::MAX >> 1) as usize,
            "capacity exceeds the packed index width"
        );
        self.slots = (0..capacity).map(|_| UnsafeCell::new(T::default())).collect();
        *self.packed.get_mut() = 0;
    }

    /// CAS loop claiming the write flag: load the word, try to swap in
    /// the flagged form, feed each failure's observed value back in as
    /// the next expected operand.
    ///
    /// Known gap, kept on purpose: when the flag is already set,
    /// `with_flag(w) == w` and the CAS succeeds against the very state
    /// that should have excluded us. The "window" is exclusive only
    /// against writers that observe the flag mid-transition.
    fn acquire_write_window(&self) {
        let mut observed = self.packed.load(Ordering::SeqCst);
        loop {
            match self.packed.compare_exchange(
                observed,
                with_flag(observed),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(now) => observed = now,
            }
        }
    }

    /// Pushes a copy of `value` onto the stack.
    ///
    /// Never blocks; spins its CAS loops until the store is published.
    ///
    /// # Panics
    /// Panics if the stack is already at capacity, matching the
    /// [`BoundedStack`](crate::BoundedStack) contract.
    pub fn push(&self, value: T) {
        self.acquire_write_window();
        // Nominally the only writer from here on; see the type docs for
        // why that does not actually hold.
        let mut observed = self.packed.load(Ordering::SeqCst);
        loop {
            let index = logical(raw_index(observed)) as usize;
            assert!(index < self.slots.len(), "push beyond configured capacity");
            // Safety: `index` is in bounds (asserted above). Exclusivity
            // of the store is only as good as the flawed window protocol;
            // a writer that slipped through the acquisition gap may hit
            // the same slot.
            unsafe { self.slots[index].get().write(value) };
            // Publish: bump the occupancy count and clear the flag in one
            // step. A failure means the word moved under us and the store
            // must be redone, since the target index may have moved too.
            match self.packed.compare_exchange(
                observed,
                incf(raw_index(observed)),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(now) => observed = now,
            }
        }
    }

    /// Removes and returns a copy of the most recently pushed element,
    /// or `None` if the stack is empty.
    ///
    /// Never blocks. The slot is read speculatively before the CAS; a
    /// failed CAS discards the copy and retries from a fresh load, since
    /// the index it came from may no longer be the true top.
    pub fn try_pop(&self) -> Option<T> {
        loop {
            let stripped = raw_index(self.packed.load(Ordering::SeqCst));
            if is_empty_word(stripped) {
                return None;
            }
            let index = logical(decf(stripped)) as usize;
            // Safety: `index < capacity` because the occupancy count
            // never exceeds it.
            let value = unsafe { self.slots[index].get().read() };
            // The expected operand is the flag-stripped word, so this CAS
            // coincidentally fails while a push holds the flag; the
            // flag's meaning is otherwise ignored on the pop path.
            if self
                .packed
                .compare_exchange(stripped, decf(stripped), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Some(value);
            }
        }
    }

    /// Returns the number of elements currently on the stack, decoded
    /// from the packed word.
    ///
    /// Under concurrency this is a snapshot: it may be stale by the time
    /// the caller looks at it.
    pub fn len(&self) -> usize {
        logical(raw_index(self.packed.load(Ordering::SeqCst))) as usize
    }

    /// Returns true if the stack holds no elements.
    pub fn is_empty(&self) -> bool {
        is_empty_word(self.packed.load(Ordering::SeqCst))
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T: Copy + Default> Default for LockFreeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockFreeStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.packed.load(Ordering::SeqCst);
        f.debug_struct("LockFreeStack")
            .field("capacity", &self.slots.len())
            .field("len", &logical(raw_index(w)))
            .field("write_flag", &(w & 1 == 1))
            .finish()
    }
}
