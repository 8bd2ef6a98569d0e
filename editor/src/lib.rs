//! Batch PNG editor.
//!
//! Applies a per-image list of effects (grayscale and 3×3 convolutions) to a
//! directory of PNGs under one of six scheduling schemes, from fully
//! sequential up to a three-stage pipeline (load → transform → save) whose
//! workers own work-stealing deques and whose transform stage can slice each
//! image across BSP-synchronized sub-workers.

pub mod config;
pub mod jobs;
pub mod results;
pub mod schedule;
pub mod shard;
pub mod sync;
