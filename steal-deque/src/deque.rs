//! Chase–Lev unbounded work-stealing deque.
//!
//! The owner works the bottom end, thieves the top. `top` is strictly
//! monotone: a steal never decrements it, so a thief that went to sleep
//! holding an old `top` value cannot be fooled by the owner wrapping the
//! buffer around; its CAS argument is stale and the exchange fails.

use std::cell::Cell;
use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{AtomicI64, AtomicPtr, Ordering};
use std::sync::{Arc, Mutex};

use crate::buffer::CircularBuffer;

struct Inner<T> {
    /// Current storage; swapped wholesale on resize.
    buffer: AtomicPtr<CircularBuffer<T>>,
    /// One past the owner's end. Only the owner mutates it.
    bottom: AtomicI64,
    /// The thieves' end. Monotone non-decreasing for the queue's lifetime.
    top: AtomicI64,
    /// Buffers replaced by resize. Kept allocated until the queue drops so a
    /// thief still holding the old pointer reads stale slots, never freed
    /// memory. Only the owner pushes here; drop drains it.
    retired: Mutex<Vec<*mut CircularBuffer<T>>>,
}

// Safety: slot access is coordinated through `bottom`/`top` (see
// `CircularBuffer`); raw buffer pointers are published with release stores
// and stay allocated until drop.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let bottom = *self.bottom.get_mut();
        let top = *self.top.get_mut();
        let buffer = unsafe { Box::from_raw(*self.buffer.get_mut()) };
        for i in top..bottom {
            drop(unsafe { buffer.read(i) });
        }
        // Retired buffers hold only bitwise shadows of tasks that live (or
        // lived) in the current buffer; free the storage without dropping.
        for stale in self.retired.get_mut().unwrap().drain(..) {
            drop(unsafe { Box::from_raw(stale) });
        }
    }
}

/// Owner handle: push and pop at the bottom.
///
/// `Send` but deliberately not `Sync` or `Clone`: exactly one thread may
/// ever act as the owner.
pub struct Deque<T> {
    inner: Arc<Inner<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

/// Thief handle: steal from the top. Freely cloned and shared.
pub struct Stealer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Stealer<T> {
    fn clone(&self) -> Self {
        Stealer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Deque<T> {
    /// An empty deque with initial capacity `2^log_capacity`.
    pub fn new(log_capacity: u32) -> Self {
        let buffer = Box::into_raw(CircularBuffer::new(log_capacity));
        Deque {
            inner: Arc::new(Inner {
                buffer: AtomicPtr::new(buffer),
                bottom: AtomicI64::new(0),
                top: AtomicI64::new(0),
                retired: Mutex::new(Vec::new()),
            }),
            _not_sync: PhantomData,
        }
    }

    /// A thief handle onto this deque.
    pub fn stealer(&self) -> Stealer<T> {
        Stealer {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Current storage capacity. Advisory: grows over time, never shrinks.
    pub fn capacity(&self) -> i64 {
        unsafe { &*self.inner.buffer.load(Ordering::Acquire) }.capacity()
    }

    /// Racy emptiness check; false negatives are possible and harmless.
    pub fn is_empty(&self) -> bool {
        // `top` first: it only grows, so comparing it against any later
        // `bottom` errs on the side of "empty".
        let top = self.inner.top.load(Ordering::Acquire);
        let bottom = self.inner.bottom.load(Ordering::Acquire);
        bottom <= top
    }

    /// Push a task at the bottom. Owner only.
    pub fn push(&self, task: T) {
        let bottom = self.inner.bottom.load(Ordering::Relaxed);
        let top = self.inner.top.load(Ordering::Acquire);
        let mut buffer = self.inner.buffer.load(Ordering::Relaxed);

        // Thieves may have moved `top` since we loaded it, so this can grow
        // early; it never grows late.
        if bottom - top >= unsafe { &*buffer }.capacity() - 1 {
            buffer = self.grow(top, bottom);
        }

        // Slot `bottom` is out of every thief's reach until the increment
        // below publishes it.
        unsafe { (*buffer).write(bottom, task) };
        self.inner.bottom.fetch_add(1, Ordering::Release);
    }

    /// Pop the most recently pushed task. Owner only.
    pub fn pop(&self) -> Option<T> {
        // The decrement must be globally visible before `top` is read; this
        // pair is the fence the whole algorithm hinges on.
        let bottom = self.inner.bottom.fetch_sub(1, Ordering::SeqCst) - 1;
        let top = self.inner.top.load(Ordering::SeqCst);

        let size = bottom - top;
        if size < 0 {
            // Raced to empty; repair the decrement.
            self.inner.bottom.store(top, Ordering::Release);
            return None;
        }

        let buffer = self.inner.buffer.load(Ordering::Acquire);
        let task = unsafe { (*buffer).read(bottom) };
        if size > 0 {
            return Some(task);
        }

        // Exactly one element left and every thief is gunning for it; the
        // `top` CAS picks the winner.
        let won = self
            .inner
            .top
            .compare_exchange(top, top + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok();
        // Win or lose, the queue is now empty: rejoin `bottom` to the new
        // `top` so a later push lands above it.
        self.inner.bottom.store(top + 1, Ordering::Release);
        if won {
            Some(task)
        } else {
            // The winning thief owns the value; ours is a bitwise phantom.
            mem::forget(task);
            None
        }
    }

    /// Allocate a doubled buffer, move the live range, publish it, retire the
    /// old storage. Owner only.
    fn grow(&self, top: i64, bottom: i64) -> *mut CircularBuffer<T> {
        let old = self.inner.buffer.load(Ordering::Relaxed);
        let grown = Box::into_raw(unsafe { (*old).resize(top, bottom) });
        // Release: a thief that reads a `top` advanced past this point also
        // sees the new storage.
        self.inner.buffer.store(grown, Ordering::Release);
        self.inner.retired.lock().unwrap().push(old);
        grown
    }
}

impl<T> Stealer<T> {
    /// Racy emptiness check; cheap pre-filter before [`steal`](Self::steal).
    pub fn is_empty(&self) -> bool {
        let top = self.inner.top.load(Ordering::Acquire);
        let bottom = self.inner.bottom.load(Ordering::Acquire);
        bottom <= top
    }

    /// Try to steal the oldest task. `None` means empty *or* a lost race;
    /// callers simply move on to another victim.
    pub fn steal(&self) -> Option<T> {
        let top = self.inner.top.load(Ordering::Acquire);
        let bottom = self.inner.bottom.load(Ordering::Acquire);
        if bottom <= top {
            return None;
        }

        let buffer = self.inner.buffer.load(Ordering::Acquire);
        let task = unsafe { (*buffer).read(top) };

        // Whoever actually took slot `top` advanced it, so a stale `top`
        // argument fails here no matter what the owner has since written
        // over the slot.
        if self
            .inner
            .top
            .compare_exchange(top, top + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            Some(task)
        } else {
            mem::forget(task);
            None
        }
    }
}
