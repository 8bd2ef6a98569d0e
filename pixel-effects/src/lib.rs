//! PNG images with a fixed palette of filtering effects.
//!
//! An [`Image`] keeps two full-resolution 16-bit RGBA planes and an atomic
//! flag naming the one holding the latest result. Applying an effect reads
//! the active plane and writes the other; flipping the flag makes the output
//! the next input. This lets a chain of effects run without reallocating, and
//! lets multiple threads fill disjoint row bands of the output plane in
//! parallel as long as they barrier before the flip.

mod effect;
mod error;
mod raster;

pub use effect::{Effect, Kernel};
pub use error::EffectError;
pub use raster::Image;
