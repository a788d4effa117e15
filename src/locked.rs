use std::sync::Mutex;

use crate::bounded::BoundedStack;

/// A thread-safe stack built by wrapping a [`BoundedStack`] in a single
/// mutex.
///
/// Every `push` and `try_pop` holds the lock for the whole call, so
/// concurrent callers are serialized into a total order equal to lock
/// acquisition order. This is the known-correct baseline the lock-free
/// variant is compared against: one lock, never re-entered, so no
/// deadlock is possible.
///
/// # Examples
/// ```
/// use packed_flag_stack::LockedStack;
///
/// let mut stack = LockedStack::new();
/// stack.configure(100);
/// stack.push(1);
/// stack.push(2);
/// stack.push(3);
/// assert_eq!(stack.try_pop(), Some(3));
/// assert_eq!(stack.try_pop(), Some(2));
/// assert_eq!(stack.try_pop(), Some(1));
/// assert_eq!(stack.try_pop(), None);
/// ```
#[derive(Debug, Default)]
pub struct LockedStack<T> {
    inner: Mutex<BoundedStack<T>>,
}

impl<T: Copy + Default> LockedStack<T> {
    /// Creates an empty stack with capacity 0.
    pub fn new() -> Self {
        LockedStack {
            inner: Mutex::new(BoundedStack::new()),
        }
    }

    /// Allocates storage for exactly `capacity` elements and resets the
    /// stack to empty.
    ///
    /// Deliberately does NOT take the lock: the exclusive borrow reaches
    /// the wrapped stack through [`Mutex::get_mut`], so callers must
    /// serialize configuration themselves, before any concurrent use
    /// begins.
    pub fn configure(&mut self, capacity: usize) {
        self.inner
            .get_mut()
            .expect("stack lock poisoned")
            .configure(capacity);
    }

    /// Pushes a copy of `value` onto the stack.
    ///
    /// Blocks while another thread holds the lock.
    ///
    /// # Panics
    /// Panics if the stack is already at capacity, matching the wrapped
    /// [`BoundedStack`] contract.
    pub fn push(&self, value: T) {
        self.inner
            .lock()
            .expect("stack lock poisoned")
            .push(value);
    }

    /// Removes and returns a copy of the most recently pushed element,
    /// or `None` if the stack is empty.
    ///
    /// Blocks while another thread holds the lock; the lock is released
    /// on every exit path, including the empty case.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().expect("stack lock poisoned").try_pop()
    }

    /// Returns the number of elements currently on the stack.
    ///
    /// Under concurrency this is a snapshot: it may be stale by the time
    /// the caller looks at it.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("stack lock poisoned").len()
    }

    /// Returns true if the stack holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("stack lock poisoned").capacity()
    }
}
