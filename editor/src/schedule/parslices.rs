//! One image at a time, each effect applied by `thread_count` scoped threads
//! over disjoint row bands, joined between effects.

use std::thread;
use std::time::{Duration, Instant};

use log::warn;
use pixel_effects::Image;

use crate::jobs::Job;
use crate::shard;

/// Returns the cumulative time spent in the per-image parallel sections.
pub(crate) fn run(jobs: Vec<Job>, thread_count: usize) -> Duration {
    let mut parallel = Duration::ZERO;

    for job in jobs {
        let img = match Image::load(&job.in_path) {
            Ok(img) => img,
            Err(err) => {
                warn!("skipping {}: {err}", job.in_path.display());
                continue;
            }
        };
        let slices = shard::row_slices(img.height(), thread_count);

        let start = Instant::now();
        for &effect in &job.effects {
            // The join at the end of the scope is the barrier between
            // effects here; no worker can race the flip.
            thread::scope(|scope| {
                for rows in &slices {
                    let img = &img;
                    let rows = rows.clone();
                    scope.spawn(move || img.apply_rows(effect, rows));
                }
            });
            img.flip();
        }
        parallel += start.elapsed();

        if let Err(err) = img.save(&job.out_path) {
            warn!("failed to save {}: {err}", job.out_path.display());
        }
    }
    parallel
}
