//! The three-stage pipeline: per-batch context and the sharded
//! (work-stealing) driver.
//!
//! Tasks are self-scheduling: executing a load task emits a transform task
//! on the next phase's channel, and so on. The driver only feeds phase one
//! and watches the per-phase completion latches; workers never learn what a
//! phase means.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::error;
use steal_deque::{worker_pool, BoxTask};

use crate::config::Config;
use crate::jobs::Job;
use crate::shard;
use crate::sync::Latch;

use super::tasks::LoadTask;

/// Initial deque capacity per worker (`2^5` slots); the deque grows itself
/// beyond this.
const INITIAL_LOG_CAPACITY: u32 = 5;

/// The three pipeline stages, in hand-off order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Load,
    Transform,
    Save,
}

impl Phase {
    pub(crate) const ALL: [Phase; 3] = [Phase::Load, Phase::Transform, Phase::Save];

    fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn next(self) -> Option<Phase> {
        match self {
            Phase::Load => Some(Phase::Transform),
            Phase::Transform => Some(Phase::Save),
            Phase::Save => None,
        }
    }
}

struct PhaseChannel {
    /// Producer end, behind a lock so the driver can close the channel by
    /// dropping it once the upstream phase has drained.
    sender: Mutex<Option<Sender<BoxTask>>>,
    receiver: Receiver<BoxTask>,
}

/// Everything one chunk's tasks and workers share: the config snapshot, one
/// bounded channel and one completion latch per phase, and the first error
/// seen by any task.
pub(crate) struct PipeContext {
    config: Config,
    channels: [PhaseChannel; 3],
    latches: [Latch; 3],
    first_error: Mutex<Option<anyhow::Error>>,
}

impl PipeContext {
    /// Context for a chunk of `task_count` images. Channels hold one task
    /// per source, so producers never block on a full buffer.
    pub(crate) fn new(config: &Config, task_count: usize) -> Arc<Self> {
        let channels = [(); 3].map(|_| {
            let (sender, receiver) = bounded(task_count);
            PhaseChannel {
                sender: Mutex::new(Some(sender)),
                receiver,
            }
        });
        Arc::new(PipeContext {
            config: config.clone(),
            channels,
            latches: [(); 3].map(|_| Latch::new(task_count)),
            first_error: Mutex::new(None),
        })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Hand a task to `phase`. Channels are chunk-sized, so this never
    /// blocks.
    pub(crate) fn send(&self, phase: Phase, task: BoxTask) {
        let guard = self.channels[phase.index()].sender.lock().unwrap();
        let sender = guard
            .as_ref()
            .expect("phase channel closed while upstream tasks were still running");
        sender
            .send(task)
            .expect("phase receiver dropped before its latch fired");
    }

    pub(crate) fn receiver(&self, phase: Phase) -> Receiver<BoxTask> {
        self.channels[phase.index()].receiver.clone()
    }

    pub(crate) fn latch(&self, phase: Phase) -> &Latch {
        &self.latches[phase.index()]
    }

    /// Drop `phase`'s producer end: receivers see end-of-stream once the
    /// buffered tasks are gone.
    pub(crate) fn close(&self, phase: Phase) {
        self.channels[phase.index()].sender.lock().unwrap().take();
    }

    /// Keep the first task-level failure for the driver to report.
    pub(crate) fn record_error(&self, err: impl Into<anyhow::Error>) {
        let mut slot = self.first_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err.into());
        }
    }

    pub(crate) fn take_error(&self) -> Option<anyhow::Error> {
        self.first_error.lock().unwrap().take()
    }
}

/// Work-stealing pipeline driver (`pipebspws`, and its no-stealing
/// comparison twin when `steal` is false).
///
/// Returns the wall-clock time of the parallel section.
pub(crate) fn run_sharded(
    config: &Config,
    mut jobs: Vec<Job>,
    thread_count: usize,
    steal: bool,
) -> Duration {
    let parallel_start = Instant::now();

    let bounds = shard::chunk_bounds(jobs.len(), config.chunk_size);
    for window in bounds.windows(2) {
        let chunk: Vec<Job> = jobs.drain(..window[1] - window[0]).collect();
        run_chunk(config, chunk, thread_count, steal);
    }

    parallel_start.elapsed()
}

fn run_chunk(config: &Config, chunk: Vec<Job>, thread_count: usize, steal: bool) {
    let task_count = chunk.len();
    if task_count == 0 {
        return;
    }
    let ctx = PipeContext::new(config, task_count);
    // One termination flag per phase, shared by all of that phase's workers.
    let dones: [Arc<AtomicBool>; 3] = [(); 3].map(|_| Arc::new(AtomicBool::new(false)));

    let mut handles = Vec::new();
    for phase in Phase::ALL {
        let workers = worker_pool(thread_count, INITIAL_LOG_CAPACITY);
        let counts = shard::divide(task_count, thread_count);
        for (worker, count) in workers.into_iter().zip(counts) {
            let receiver = ctx.receiver(phase);
            let done = Arc::clone(&dones[phase.index()]);
            handles.push(thread::spawn(move || {
                // Feed: pull this worker's share into its own deque before
                // executing anything. A disconnect means upstream failures
                // shrank the phase; run with what arrived.
                for _ in 0..count {
                    match receiver.recv() {
                        Ok(task) => worker.add_task(task),
                        Err(_) => break,
                    }
                }
                if steal {
                    worker.run(&done);
                } else {
                    worker.run_no_steal(&done);
                }
            }));
        }
    }

    for job in chunk {
        let task = LoadTask::new(Arc::clone(&ctx), job);
        ctx.send(Phase::Load, Box::new(task));
    }
    ctx.close(Phase::Load);

    for phase in Phase::ALL {
        ctx.latch(phase).wait();
        if let Some(next) = phase.next() {
            ctx.close(next);
        }
        dones[phase.index()].store(true, Ordering::Release);
    }
    for handle in handles {
        handle.join().unwrap();
    }

    if let Some(err) = ctx.take_error() {
        error!("chunk finished with failures, first was: {err:#}");
    }
}
