//! The three task flavors flowing through the pipeline.
//!
//! Error policy: a failed load or save is logged, recorded on the context,
//! and the affected image drops out of the pipeline, with its completion
//! latches settled for every phase it will no longer visit so the driver
//! always drains.

use std::sync::Arc;
use std::thread;

use log::warn;
use pixel_effects::{Effect, Image};
use steal_deque::Task;

use crate::jobs::Job;
use crate::shard;
use crate::sync::EffectBarrier;

use super::pipeline::{Phase, PipeContext};

/// Phase 1: decode the PNG and emit the transform task.
pub(crate) struct LoadTask {
    ctx: Arc<PipeContext>,
    job: Job,
}

impl LoadTask {
    pub(crate) fn new(ctx: Arc<PipeContext>, job: Job) -> Self {
        LoadTask { ctx, job }
    }
}

impl Task for LoadTask {
    fn execute(self: Box<Self>, _worker_id: usize) {
        let LoadTask { ctx, job } = *self;
        match Image::load(&job.in_path) {
            Ok(img) => {
                let next = TransformTask {
                    ctx: Arc::clone(&ctx),
                    job,
                    img,
                };
                ctx.send(Phase::Transform, Box::new(next));
                ctx.latch(Phase::Load).count_down();
            }
            Err(err) => {
                warn!("skipping {}: {err}", job.in_path.display());
                ctx.record_error(err);
                // This image will never reach the later phases; settle their
                // latches too so the driver still terminates.
                ctx.latch(Phase::Load).count_down();
                ctx.latch(Phase::Transform).count_down();
                ctx.latch(Phase::Save).count_down();
            }
        }
    }
}

/// Phase 2: apply the effect chain, sliced across sub-workers when
/// configured, and emit the save task.
pub(crate) struct TransformTask {
    ctx: Arc<PipeContext>,
    job: Job,
    img: Image,
}

impl Task for TransformTask {
    fn execute(self: Box<Self>, _worker_id: usize) {
        let TransformTask { ctx, job, img } = *self;

        let sub_threads = ctx.config().sub_threads;
        if sub_threads > 1 {
            apply_sliced(&img, &job.effects, sub_threads);
        } else {
            for &effect in &job.effects {
                img.apply(effect);
                img.flip();
            }
        }

        let next = SaveTask {
            ctx: Arc::clone(&ctx),
            job,
            img,
        };
        ctx.send(Phase::Save, Box::new(next));
        ctx.latch(Phase::Transform).count_down();
    }
}

/// Run the whole effect chain over `img` with one scoped sub-worker per row
/// band. Sub-workers rendezvous at the barrier after each effect; the last
/// arriver flips the active plane so the next effect reads this one's
/// output.
pub(crate) fn apply_sliced(img: &Image, effects: &[Effect], sub_threads: usize) {
    let slices = shard::row_slices(img.height(), sub_threads);
    let barrier = EffectBarrier::new(slices.len());
    thread::scope(|scope| {
        for rows in slices {
            let barrier = &barrier;
            scope.spawn(move || {
                for &effect in effects {
                    img.apply_rows(effect, rows.clone());
                    barrier.arrive(|| img.flip());
                }
            });
        }
    });
}

/// Phase 3: encode the finished image. Terminal.
pub(crate) struct SaveTask {
    ctx: Arc<PipeContext>,
    job: Job,
    img: Image,
}

impl Task for SaveTask {
    fn execute(self: Box<Self>, _worker_id: usize) {
        let SaveTask { ctx, job, img } = *self;
        if let Err(err) = img.save(&job.out_path) {
            warn!("failed to save {}: {err}", job.out_path.display());
            ctx.record_error(err);
        }
        ctx.latch(Phase::Save).count_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_effects::Effect;

    #[test]
    fn sliced_application_matches_whole_image() {
        let mut pixels = Vec::new();
        for n in 0..(12u32 * 12) {
            let v = (n * 397 % 65536) as u16;
            pixels.extend_from_slice(&[v, v.wrapping_add(9000), v / 3, 65535]);
        }
        let effects = [Effect::Grayscale, Effect::Edge, Effect::Sharpen, Effect::Blur];

        let sliced = Image::from_raw(12, 12, pixels.clone());
        apply_sliced(&sliced, &effects, 4);

        let whole = Image::from_raw(12, 12, pixels);
        for &effect in &effects {
            whole.apply(effect);
            whole.flip();
        }

        assert_eq!(sliced.active_pixels(), whole.active_pixels());
    }

    #[test]
    fn more_sub_workers_than_rows_still_terminates() {
        let img = Image::from_raw(4, 2, vec![1000u16; 4 * 2 * 4]);
        apply_sliced(&img, &[Effect::Blur], 8);
    }
}
