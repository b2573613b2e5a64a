//! Pure grayscale image transforms.

use image::{imageops, DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Cross-shaped 3x3 sharpening kernel (strengthens horizontal and vertical edges).
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

pub fn grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Stretch the darkest and brightest pixels to the full 0..=255 range.
pub fn normalize(image: &GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    remap(image, min, max)
}

/// Clip `black` and `white` fractions of pixels at each end of the
/// histogram, then stretch what remains to the full range.
pub fn contrast_stretch(image: &GrayImage, black: f32, white: f32) -> GrayImage {
    let histogram = histogram(image);
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return image.clone();
    }

    let low = percentile_level(&histogram, (black.clamp(0.0, 1.0) as f64 * total as f64) as u64);
    let high = {
        let mut reversed = histogram;
        reversed.reverse();
        255 - percentile_level(&reversed, (white.clamp(0.0, 1.0) as f64 * total as f64) as u64)
    };
    remap(image, low, high)
}

/// Apply the 3x3 sharpening kernel, clamping reads at the image edges.
pub fn sharpen(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let sample = |x: i64, y: i64| {
        let x = x.clamp(0, width as i64 - 1) as u32;
        let y = y.clamp(0, height as i64 - 1) as u32;
        image.get_pixel(x, y).0[0] as f32
    };
    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0.0;
        for (i, weight) in SHARPEN_KERNEL.iter().enumerate() {
            let dx = (i % 3) as i64 - 1;
            let dy = (i / 3) as i64 - 1;
            acc += weight * sample(x as i64 + dx, y as i64 + dy);
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// Hard binarisation: pixels above `level` become white, the rest black.
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
    }
    out
}

/// Morphological closing of dark ink on a light page.
///
/// Bridges small gaps in broken pen strokes without thickening the
/// background.
pub fn close_ink(image: &GrayImage) -> GrayImage {
    let mut ink = image.clone();
    imageops::invert(&mut ink);
    let mut closed = morphology::close(&ink, Norm::LInf, 1);
    imageops::invert(&mut closed);
    closed
}

fn histogram(image: &GrayImage) -> [u64; 256] {
    let mut counts = [0u64; 256];
    for pixel in image.pixels() {
        counts[pixel.0[0] as usize] += 1;
    }
    counts
}

/// First level at which more than `clip` pixels have been accumulated.
fn percentile_level(histogram: &[u64; 256], clip: u64) -> u8 {
    let mut seen = 0u64;
    for (level, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > clip {
            return level as u8;
        }
    }
    255
}

/// Linearly map `low..=high` onto `0..=255`, clamping outside values.
fn remap(image: &GrayImage, low: u8, high: u8) -> GrayImage {
    if high <= low {
        return image.clone();
    }
    let span = (high - low) as f32;
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let scaled = (value as f32 - low as f32) * 255.0 / span;
        *slot = scaled.round().clamp(0.0, 255.0) as u8;
    }
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
    out
}
