//! Work-stealing worker loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;

use crate::deque::{Deque, Stealer};
use crate::BoxTask;

/// Consecutive failed steal attempts before the worker yields its timeslice.
const STEAL_YIELD_AFTER: u32 = 64;

/// One scheduling participant: a thread identity, its own deque, and thief
/// handles onto every peer's deque.
pub struct Worker {
    id: usize,
    local: Deque<BoxTask>,
    peers: Arc<[Stealer<BoxTask>]>,
}

/// Build `count` workers wired to each other's stealers.
///
/// Every deque starts with capacity `2^log_capacity`.
pub fn worker_pool(count: usize, log_capacity: u32) -> Vec<Worker> {
    let deques: Vec<Deque<BoxTask>> = (0..count).map(|_| Deque::new(log_capacity)).collect();
    let peers: Arc<[Stealer<BoxTask>]> = deques.iter().map(Deque::stealer).collect();
    deques
        .into_iter()
        .enumerate()
        .map(|(id, local)| Worker {
            id,
            local,
            peers: Arc::clone(&peers),
        })
        .collect()
}

impl Worker {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Queue a task on this worker's own deque.
    pub fn add_task(&self, task: BoxTask) {
        self.local.push(task);
    }

    /// Drain the local deque LIFO, then steal from random victims, until
    /// `done` is signaled. A task already picked up always runs to
    /// completion; `done` is observed between tasks and between steal
    /// attempts.
    pub fn run(&self, done: &AtomicBool) {
        let mut rng = rand::thread_rng();
        let mut failed_steals = 0u32;

        while !done.load(Ordering::Acquire) {
            while let Some(task) = self.local.pop() {
                task.execute(self.id);
            }

            if self.peers.len() < 2 {
                // Nobody to steal from; wait out the phase signal.
                std::thread::yield_now();
                continue;
            }

            let victim = self.random_victim(&mut rng);
            let stolen = if self.peers[victim].is_empty() {
                None
            } else {
                self.peers[victim].steal()
            };

            match stolen {
                Some(task) => {
                    log::trace!("worker {} stole a task from worker {}", self.id, victim);
                    failed_steals = 0;
                    task.execute(self.id);
                }
                None => {
                    failed_steals += 1;
                    if failed_steals >= STEAL_YIELD_AFTER {
                        failed_steals = 0;
                        std::thread::yield_now();
                    }
                }
            }
        }
    }

    /// Comparison variant: same drain loop, but returns as soon as the local
    /// deque is empty instead of stealing.
    pub fn run_no_steal(&self, done: &AtomicBool) {
        while !done.load(Ordering::Acquire) {
            match self.local.pop() {
                Some(task) => task.execute(self.id),
                None => return,
            }
        }
    }

    /// Uniform random peer index, rejecting self.
    fn random_victim(&self, rng: &mut impl Rng) -> usize {
        loop {
            let victim = rng.gen_range(0..self.peers.len());
            if victim != self.id {
                return victim;
            }
        }
    }
}
