//! Pipeline without work stealing: each phase's workers consume the phase
//! channel directly and exit when it closes.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use steal_deque::Task;

use crate::config::Config;
use crate::jobs::Job;
use crate::shard;

use super::pipeline::{Phase, PipeContext};
use super::tasks::LoadTask;

pub(crate) fn run(config: &Config, mut jobs: Vec<Job>, thread_count: usize) -> Duration {
    let parallel_start = Instant::now();

    let bounds = shard::chunk_bounds(jobs.len(), config.chunk_size);
    for window in bounds.windows(2) {
        let chunk: Vec<Job> = jobs.drain(..window[1] - window[0]).collect();
        run_chunk(config, chunk, thread_count);
    }

    parallel_start.elapsed()
}

fn run_chunk(config: &Config, chunk: Vec<Job>, thread_count: usize) {
    let task_count = chunk.len();
    if task_count == 0 {
        return;
    }
    let ctx = PipeContext::new(config, task_count);

    let mut handles = Vec::new();
    for phase in Phase::ALL {
        for _ in 0..thread_count {
            let receiver = ctx.receiver(phase);
            handles.push(thread::spawn(move || {
                // Ends cleanly when the channel is closed and drained.
                for task in receiver.iter() {
                    task.execute(0);
                }
            }));
        }
    }

    for job in chunk {
        let task = LoadTask::new(Arc::clone(&ctx), job);
        ctx.send(Phase::Load, Box::new(task));
    }
    ctx.close(Phase::Load);

    // Closing each downstream channel as its feeding phase drains is what
    // lets the plain consumers above exit; no worker is left behind.
    for phase in Phase::ALL {
        ctx.latch(phase).wait();
        if let Some(next) = phase.next() {
            ctx.close(next);
        }
    }
    for handle in handles {
        handle.join().unwrap();
    }

    if let Some(err) = ctx.take_error() {
        log::error!("chunk finished with failures, first was: {err:#}");
    }
}
