//! Double-buffered 16-bit RGBA pixel store.

use std::cell::UnsafeCell;
use std::ops::Range;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageBuffer, ImageReader, Rgba};

use crate::effect::{Effect, Kernel, KERNEL_CENTER, KERNEL_DIM};
use crate::error::EffectError;

const CHANNELS: usize = 4;

/// One full-resolution plane of interleaved RGBA16 samples. Samples sit in
/// `UnsafeCell`s so concurrent writers to disjoint row bands never need a
/// `&mut` over the whole plane.
type Plane = Box<[UnsafeCell<u16>]>;

fn plane_from(pixels: Vec<u16>) -> Plane {
    pixels.into_iter().map(UnsafeCell::new).collect()
}

fn blank_plane(len: usize) -> Plane {
    (0..len).map(|_| UnsafeCell::new(0)).collect()
}

#[inline]
fn clamp(component: f64) -> u16 {
    component.clamp(0.0, 65535.0) as u16
}

/// A PNG image with two pixel planes and an atomic flag naming the active
/// one (the plane holding the most recent result).
///
/// Effects read the active plane and write the inactive one; [`flip`]
/// afterwards makes the output the next input.
///
/// # Safety contract
///
/// `Image` is `Sync` under the rule the effect pipeline follows: during one
/// effect round, writers cover pairwise-disjoint row ranges of the inactive
/// plane, nobody writes the active plane, and `flip` happens only after all
/// writers of the round have arrived at a barrier.
///
/// [`flip`]: Image::flip
pub struct Image {
    width: u32,
    height: u32,
    planes: [Plane; 2],
    active: AtomicUsize,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// Safety: see the struct-level contract; all slot access goes through
// UnsafeCell and row-range discipline, the flag is atomic.
unsafe impl Sync for Image {}

impl Image {
    /// Decode the PNG at `path`. The decoded pixels become plane 0 and the
    /// active plane; plane 1 starts blank.
    pub fn load(path: &Path) -> Result<Image, EffectError> {
        let reader = ImageReader::open(path).map_err(|source| EffectError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| EffectError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let buffer = decoded.to_rgba16();
        let (width, height) = buffer.dimensions();
        Ok(Image::from_raw(width, height, buffer.into_raw()))
    }

    /// Build an image from interleaved RGBA16 samples, row-major.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u16>) -> Image {
        let len = width as usize * height as usize * CHANNELS;
        assert_eq!(pixels.len(), len, "pixel buffer does not match dimensions");
        Image {
            width,
            height,
            planes: [plane_from(pixels), blank_plane(len)],
            active: AtomicUsize::new(0),
        }
    }

    /// Encode the active plane as PNG at `path`.
    pub fn save(&self, path: &Path) -> Result<(), EffectError> {
        let buffer =
            ImageBuffer::<Rgba<u16>, Vec<u16>>::from_raw(self.width, self.height, self.active_pixels())
                .expect("plane length matches dimensions");
        DynamicImage::ImageRgba16(buffer)
            .save(path)
            .map_err(|source| EffectError::Encode {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Copy of the active plane's samples.
    pub fn active_pixels(&self) -> Vec<u16> {
        let plane = &self.planes[self.active_index()];
        plane.iter().map(|slot| unsafe { *slot.get() }).collect()
    }

    /// RGBA sample at `(x, y)` in the active plane.
    pub fn pixel(&self, x: u32, y: u32) -> [u16; 4] {
        let plane = &self.planes[self.active_index()];
        let base = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            unsafe { *plane[base].get() },
            unsafe { *plane[base + 1].get() },
            unsafe { *plane[base + 2].get() },
            unsafe { *plane[base + 3].get() },
        ]
    }

    /// Make the last-written plane the input for the next effect.
    ///
    /// Callers must ensure no writer of the previous round is still running;
    /// in the sliced pipeline this is the barrier's final arriver.
    pub fn flip(&self) {
        self.active.fetch_xor(1, Ordering::AcqRel);
    }

    /// Apply `effect` to the whole image (active plane → inactive plane).
    /// Does not flip.
    pub fn apply(&self, effect: Effect) {
        self.apply_rows(effect, 0..self.height);
    }

    /// Apply `effect` to the row band `rows` only.
    ///
    /// Concurrent callers must cover disjoint row ranges; see the
    /// struct-level safety contract.
    pub fn apply_rows(&self, effect: Effect, rows: Range<u32>) {
        let input = &self.planes[self.active_index()];
        let output = &self.planes[1 - self.active_index()];
        match effect.kernel() {
            None => self.grayscale(input, output, rows),
            Some(kernel) => self.convolve(kernel, input, output, rows),
        }
    }

    fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn grayscale(&self, input: &Plane, output: &Plane, rows: Range<u32>) {
        for y in rows {
            for x in 0..self.width {
                let base = (y as usize * self.width as usize + x as usize) * CHANNELS;
                // Safety: `base..base+4` lies in this caller's row band.
                unsafe {
                    let r = *input[base].get();
                    let g = *input[base + 1].get();
                    let b = *input[base + 2].get();
                    let a = *input[base + 3].get();
                    let grey = clamp((r as f64 + g as f64 + b as f64) / 3.0);
                    *output[base].get() = grey;
                    *output[base + 1].get() = grey;
                    *output[base + 2].get() = grey;
                    *output[base + 3].get() = a;
                }
            }
        }
    }

    fn convolve(&self, kernel: &Kernel, input: &Plane, output: &Plane, rows: Range<u32>) {
        let width = self.width as i64;
        let height = self.height as i64;
        let dim = KERNEL_DIM as i64;

        for y in rows {
            for x in 0..self.width {
                let mut acc = [0.0f64; 3];
                for (i, weight) in kernel.values().iter().enumerate() {
                    let m = (i / KERNEL_DIM) as i64;
                    let n = (i % KERNEL_DIM) as i64;
                    // Flipped kernel indices: true convolution, not
                    // correlation. Symmetric for this palette, kept anyway.
                    let mm = dim - 1 - m;
                    let nn = dim - 1 - n;
                    let yy = y as i64 + (KERNEL_CENTER - mm);
                    let xx = x as i64 + (KERNEL_CENTER - nn);
                    // Zero padding outside the image.
                    if xx >= 0 && xx < width && yy >= 0 && yy < height {
                        let tap = (yy as usize * self.width as usize + xx as usize) * CHANNELS;
                        // Safety: reads only; the input plane has no writers
                        // during an effect round.
                        unsafe {
                            acc[0] += *input[tap].get() as f64 * weight;
                            acc[1] += *input[tap + 1].get() as f64 * weight;
                            acc[2] += *input[tap + 2].get() as f64 * weight;
                        }
                    }
                }
                let base = (y as usize * self.width as usize + x as usize) * CHANNELS;
                // Alpha is forced opaque; carrying it through the kernel
                // shifts results on images with transparent borders.
                unsafe {
                    *output[base].get() = clamp(acc[0]);
                    *output[base + 1].get() = clamp(acc[1]);
                    *output[base + 2].get() = clamp(acc[2]);
                    *output[base + 3].get() = 65535;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u16; 4]) -> Image {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgba);
        }
        Image::from_raw(width, height, pixels)
    }

    #[test]
    fn grayscale_averages_channels() {
        let img = solid(16, 16, [65535, 0, 0, 65535]);
        img.apply(Effect::Grayscale);
        img.flip();
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(img.pixel(x, y), [21845, 21845, 21845, 65535]);
            }
        }
    }

    #[test]
    fn grayscale_preserves_alpha() {
        let img = solid(4, 4, [300, 600, 900, 1234]);
        img.apply(Effect::Grayscale);
        img.flip();
        assert_eq!(img.pixel(2, 2), [600, 600, 600, 1234]);
    }

    #[test]
    fn blur_is_identity_away_from_borders() {
        let img = solid(8, 8, [9000, 9000, 9000, 65535]);
        img.apply(Effect::Blur);
        img.flip();
        assert_eq!(img.pixel(3, 3), [9000, 9000, 9000, 65535]);
        // Corners see only 4 of the 9 taps (zero padding).
        assert_eq!(img.pixel(0, 0), [4000, 4000, 4000, 65535]);
    }

    #[test]
    fn edge_flattens_uniform_regions() {
        let img = solid(8, 8, [12345, 12345, 12345, 65535]);
        img.apply(Effect::Edge);
        img.flip();
        assert_eq!(img.pixel(4, 4), [0, 0, 0, 65535]);
    }

    #[test]
    fn sharpen_is_identity_on_uniform_interior() {
        let img = solid(8, 8, [5000, 6000, 7000, 65535]);
        img.apply(Effect::Sharpen);
        img.flip();
        assert_eq!(img.pixel(4, 4), [5000, 6000, 7000, 65535]);
    }

    #[test]
    fn flip_alternates_planes() {
        let img = solid(2, 2, [100, 200, 300, 65535]);
        img.apply(Effect::Grayscale);
        // Not flipped yet: active plane still holds the original.
        assert_eq!(img.pixel(0, 0), [100, 200, 300, 65535]);
        img.flip();
        assert_eq!(img.pixel(0, 0), [200, 200, 200, 65535]);
        img.flip();
        assert_eq!(img.pixel(0, 0), [100, 200, 300, 65535]);
    }

    #[test]
    fn row_bands_compose_to_the_full_effect() {
        let img = solid(6, 9, [1000, 2000, 3000, 65535]);
        img.apply_rows(Effect::Blur, 0..3);
        img.apply_rows(Effect::Blur, 3..9);
        img.flip();

        let whole = solid(6, 9, [1000, 2000, 3000, 65535]);
        whole.apply(Effect::Blur);
        whole.flip();

        assert_eq!(img.active_pixels(), whole.active_pixels());
    }

    #[test]
    #[should_panic(expected = "does not match dimensions")]
    fn from_raw_checks_length() {
        Image::from_raw(4, 4, vec![0u16; 7]);
    }
}
