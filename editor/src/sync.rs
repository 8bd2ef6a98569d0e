//! Synchronization for the pipeline: per-phase completion counting and the
//! bulk-synchronous barrier between effects on a sliced image.

use std::sync::{Condvar, Mutex};

/// Countdown latch: initialized to a task count, decremented once per
/// completed task, waited on by the pipeline driver.
pub struct Latch {
    remaining: Mutex<usize>,
    zero: Condvar,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Latch {
            remaining: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    /// Record one task completion.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining = remaining
            .checked_sub(1)
            .expect("latch counted down past zero");
        if *remaining == 0 {
            self.zero.notify_all();
        }
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.zero.wait(remaining).unwrap();
        }
    }
}

struct BarrierState {
    arrived: usize,
    generation: u64,
}

/// Barrier for the sub-workers slicing one image.
///
/// Between effects, all `parties` sub-workers must arrive before any
/// proceeds. The last arriver runs a closure under the lock (the pipeline
/// uses it to flip the image's active plane), resets the arrival counter and
/// wakes the rest; the generation count absorbs spurious wakeups.
pub struct EffectBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl EffectBarrier {
    pub fn new(parties: usize) -> Self {
        EffectBarrier {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Arrive and wait for the rest of the group. Exactly one caller per
    /// round (the last to arrive) executes `on_last` while every other
    /// party is blocked, so the closure may mutate state the group shares.
    pub fn arrive(&self, on_last: impl FnOnce()) {
        let mut state = self.state.lock().unwrap();
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            on_last();
            self.released.notify_all();
        } else {
            let generation = state.generation;
            while state.generation == generation {
                state = self.released.wait(state).unwrap();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn latch_releases_at_zero() {
        let latch = Arc::new(Latch::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let latch = Arc::clone(&latch);
            handles.push(thread::spawn(move || latch.count_down()));
        }
        latch.wait();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn latch_at_zero_does_not_block() {
        Latch::new(0).wait();
    }

    #[test]
    fn last_arriver_runs_the_closure_exactly_once_per_round() {
        const PARTIES: usize = 4;
        const ROUNDS: usize = 3;
        let barrier = Arc::new(EffectBarrier::new(PARTIES));
        let flips = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..PARTIES {
            let barrier = Arc::clone(&barrier);
            let flips = Arc::clone(&flips);
            handles.push(thread::spawn(move || {
                for _ in 0..ROUNDS {
                    barrier.arrive(|| {
                        flips.fetch_add(1, Ordering::SeqCst);
                    });
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(flips.load(Ordering::SeqCst), ROUNDS);
    }

    #[test]
    fn rounds_do_not_interleave() {
        // Four sub-workers, three effects: every worker's entry for effect k
        // must land before any entry for effect k+1.
        const PARTIES: usize = 4;
        const EFFECTS: usize = 3;
        let barrier = Arc::new(EffectBarrier::new(PARTIES));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for slice in 0..PARTIES {
            let barrier = Arc::clone(&barrier);
            let log = Arc::clone(&log);
            handles.push(thread::spawn(move || {
                for effect in 0..EFFECTS {
                    log.lock().unwrap().push((effect, slice));
                    barrier.arrive(|| {});
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), PARTIES * EFFECTS);
        for window in log.chunks(PARTIES) {
            // Each group of PARTIES entries belongs to a single effect and
            // names every slice once.
            let effect = window[0].0;
            assert!(window.iter().all(|&(e, _)| e == effect));
            let mut slices: Vec<usize> = window.iter().map(|&(_, s)| s).collect();
            slices.sort_unstable();
            assert_eq!(slices, (0..PARTIES).collect::<Vec<_>>());
        }
    }

    #[test]
    fn single_party_barrier_never_blocks() {
        let barrier = EffectBarrier::new(1);
        let mut ran = 0;
        for _ in 0..5 {
            barrier.arrive(|| ran += 1);
        }
        assert_eq!(ran, 5);
    }
}
