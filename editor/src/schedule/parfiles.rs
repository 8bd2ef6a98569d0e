//! Whole images in parallel: `thread_count` workers pull jobs off a shared
//! locked queue until it runs dry.

use std::thread;
use std::time::{Duration, Instant};

use log::warn;
use pixel_effects::Image;

use crate::jobs::{Job, JobQueue};

pub(crate) fn run(jobs: Vec<Job>, thread_count: usize) -> Duration {
    let queue = JobQueue::new(jobs);

    let parallel_start = Instant::now();
    thread::scope(|scope| {
        for _ in 0..thread_count {
            scope.spawn(|| {
                while let Some(job) = queue.next() {
                    process(&job);
                }
            });
        }
    });
    parallel_start.elapsed()
}

fn process(job: &Job) {
    let img = match Image::load(&job.in_path) {
        Ok(img) => img,
        Err(err) => {
            warn!("skipping {}: {err}", job.in_path.display());
            return;
        }
    };
    for &effect in &job.effects {
        img.apply(effect);
        img.flip();
    }
    if let Err(err) = img.save(&job.out_path) {
        warn!("failed to save {}: {err}", job.out_path.display());
    }
}
