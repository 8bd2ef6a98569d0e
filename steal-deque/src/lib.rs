//! Lock-free work-stealing execution substrate.
//!
//! Each worker thread owns one unbounded double-ended queue: the owner pushes
//! and pops at the bottom (LIFO), thieves pop at the top (FIFO). The queue is
//! a Chase–Lev deque over a power-of-two circular buffer that doubles in place
//! when full.
//!
//! ## Design
//!
//! - Circular buffer with power-of-2 capacity, indices wrap via bitmask
//! - `bottom` and `top` are signed 64-bit atomics; `top` only ever grows,
//!   which is what makes the stealing CAS immune to ABA
//! - Owner/thief access is split into two handle types so the single-owner
//!   rule is enforced by the type system rather than by convention
//! - Resized-out buffers are retired, not freed, until the queue drops; a
//!   thief holding a stale buffer pointer never reads freed memory
//!
//! ## Trade-offs
//!
//! - No operation blocks; a lost steal race is a `None`, callers retry on
//!   another victim
//! - Memory for retired buffers is O(live capacity) in total (doubling), paid
//!   until the queue drops
//! - Allocation failure on resize aborts, like any other failed allocation

mod buffer;
mod deque;
mod worker;

pub use deque::{Deque, Stealer};
pub use worker::{worker_pool, Worker};

/// A one-shot unit of work.
///
/// Tasks are self-describing: `execute` is handed the id of the worker thread
/// running it and is expected to perform any follow-up scheduling itself
/// (e.g. enqueue a successor task). A task is consumed by execution.
pub trait Task: Send {
    fn execute(self: Box<Self>, worker_id: usize);
}

/// The boxed form workers traffic in.
pub type BoxTask = Box<dyn Task>;
