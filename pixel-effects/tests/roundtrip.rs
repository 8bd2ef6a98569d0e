//! On-disk PNG round trips.

use pixel_effects::{Effect, EffectError, Image};

#[test]
fn save_then_load_preserves_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.png");

    let mut pixels = Vec::new();
    for y in 0..8u16 {
        for x in 0..8u16 {
            pixels.extend_from_slice(&[x * 8000, y * 8000, 40000, 65535]);
        }
    }
    let original = Image::from_raw(8, 8, pixels.clone());
    original.save(&path).unwrap();

    let reloaded = Image::load(&path).unwrap();
    assert_eq!(reloaded.width(), 8);
    assert_eq!(reloaded.height(), 8);
    assert_eq!(reloaded.active_pixels(), pixels);
}

#[test]
fn effects_survive_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sharpened.png");

    let img = Image::from_raw(4, 4, vec![20000u16; 4 * 4 * 4]);
    img.apply(Effect::Sharpen);
    img.flip();
    img.save(&path).unwrap();

    let reloaded = Image::load(&path).unwrap();
    assert_eq!(reloaded.active_pixels(), img.active_pixels());
}

#[test]
fn load_missing_file_reports_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Image::load(&dir.path().join("absent.png")).unwrap_err();
    assert!(matches!(err, EffectError::Open { .. }));
}
