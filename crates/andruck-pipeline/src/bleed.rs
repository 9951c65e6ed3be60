//! Ink bleed: directional wet-ink wicking into the paper.
//!
//! Wherever the sheet is darker than bare paper, wet ink wicks outward
//! along the paper fibers — predominantly along the feed direction.
//! The stage computes an ink-density field, convolves both the density
//! and the color channels with an oriented cone kernel, and blends each
//! pixel toward its blurred surroundings in proportion to how much wet
//! ink sits there.
//!
//! This stage must read the source while writing the destination (the
//! kernel reads neighborhoods), so it never works in place. Rows are
//! independent and are convolved in parallel.

use rayon::prelude::*;

use crate::color::Rgb;
use crate::params::{FeedDirection, InkBleedConfig};
use crate::types::RgbaImage;

/// One kernel tap: pixel offset and weight.
struct Tap {
    dx: i32,
    dy: i32,
    weight: f32,
}

/// Build the oriented cone kernel.
///
/// The kernel is a linear falloff disk (`1 − D/r`), squeezed on its
/// minor axis by `1 − directionality` and rotated to put the major
/// axis along the feed.
fn build_kernel(config: &InkBleedConfig, feed: FeedDirection) -> (Vec<Tap>, f32) {
    let r = config.radius as i32;
    let r_f = f64::from(config.radius);
    let angle = match feed {
        FeedDirection::Vertical => std::f64::consts::FRAC_PI_2,
        FeedDirection::Horizontal => 0.0,
    };
    let (sin, cos) = angle.sin_cos();
    let stretch = (1.0 - config.directionality).max(0.1);

    let mut taps = Vec::new();
    let mut total = 0.0f32;
    for y in -r..=r {
        for x in -r..=r {
            let rx = f64::from(x) * cos - f64::from(y) * sin;
            let ry = f64::from(x) * sin + f64::from(y) * cos;
            let dist = (rx * rx + (ry / stretch) * (ry / stretch)).sqrt();
            if dist <= r_f {
                let weight = (1.0 - dist / r_f) as f32;
                if weight > 0.0 {
                    taps.push(Tap { dx: x, dy: y, weight });
                    total += weight;
                }
            }
        }
    }
    (taps, total)
}

/// Ink density relative to the paper color, clamped to `[0, 1]`.
///
/// Zero on bare paper, rising toward 1 as the pixel gets darker than
/// the sheet; brighter-than-paper pixels clamp to zero.
fn density(px: [u8; 4], paper: Rgb) -> f32 {
    let relative = 0.299 * f64::from(i16::from(px[0]) - i16::from(paper.r)) / 255.0
        + 0.587 * f64::from(i16::from(px[1]) - i16::from(paper.g)) / 255.0
        + 0.114 * f64::from(i16::from(px[2]) - i16::from(paper.b)) / 255.0;
    (-relative).clamp(0.0, 1.0) as f32
}

/// Apply the bleed. Alpha is copied from the source.
#[must_use]
pub fn bleed(
    image: &RgbaImage,
    config: &InkBleedConfig,
    paper: Rgb,
    feed: FeedDirection,
) -> RgbaImage {
    let (width, height) = (image.width(), image.height());
    let (w, h) = (width as i32, height as i32);
    let (taps, kernel_total) = build_kernel(config, feed);

    // Precompute the density field once; the convolution reads it per tap.
    let density_field: Vec<f32> = image.pixels().map(|px| density(px.0, paper)).collect();

    let src = image.as_raw();
    let row_bytes = width as usize * 4;
    let mut out = RgbaImage::new(width, height);
    let absorbency = config.absorbency;

    out.par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, out_row)| {
            let y = y as i32;
            for x in 0..w {
                let mut rho = 0.0f32;
                let mut acc = [0.0f32; 3];
                for tap in &taps {
                    // Border policy: clamp sample coordinates.
                    let sx = (x + tap.dx).clamp(0, w - 1) as usize;
                    let sy = (y + tap.dy).clamp(0, h - 1) as usize;
                    let base = sy * width as usize * 4 + sx * 4;
                    rho += density_field[sy * width as usize + sx] * tap.weight;
                    for c in 0..3 {
                        acc[c] += f32::from(src[base + c]) * tap.weight;
                    }
                }
                rho /= kernel_total;
                let blurred = [
                    acc[0] / kernel_total,
                    acc[1] / kernel_total,
                    acc[2] / kernel_total,
                ];

                // The curve keeps faint coverage bleeding visibly while
                // saturating in the solids.
                let blend = (f64::from(rho.max(0.0)).sqrt() * absorbency * 1.5).clamp(0.0, 1.0);

                let base = x as usize * 4;
                let src_base = y as usize * width as usize * 4 + base;
                for c in 0..3 {
                    let original = f64::from(src[src_base + c]);
                    let mixed = original + (f64::from(blurred[c]) - original) * blend;
                    out_row[base + c] = mixed.clamp(0.0, 255.0).round() as u8;
                }
                out_row[base + 3] = src[src_base + 3];
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_sheet(w: u32, h: u32, paper: Rgb) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, _| image::Rgba([paper.r, paper.g, paper.b, 255]))
    }

    fn default_paper() -> Rgb {
        Rgb::new(0xF0, 0xEA, 0xD8)
    }

    #[test]
    fn bare_paper_does_not_bleed() {
        let paper = default_paper();
        let sheet = paper_sheet(16, 16, paper);
        let out = bleed(
            &sheet,
            &InkBleedConfig::default(),
            paper,
            FeedDirection::Vertical,
        );
        assert_eq!(out, sheet);
    }

    #[test]
    fn zero_absorbency_is_identity() {
        let paper = default_paper();
        let mut sheet = paper_sheet(16, 16, paper);
        sheet.put_pixel(8, 8, image::Rgba([0, 0, 0, 255]));
        let config = InkBleedConfig {
            absorbency: 0.0,
            ..InkBleedConfig::default()
        };
        let out = bleed(&sheet, &config, paper, FeedDirection::Vertical);
        assert_eq!(out, sheet);
    }

    #[test]
    fn ink_spreads_into_neighbors() {
        let paper = Rgb::WHITE;
        let mut sheet = paper_sheet(21, 21, paper);
        for y in 8..13 {
            for x in 8..13 {
                sheet.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
            }
        }
        let out = bleed(
            &sheet,
            &InkBleedConfig {
                radius: 4,
                absorbency: 1.0,
                directionality: 0.0,
            },
            paper,
            FeedDirection::Vertical,
        );
        // A pixel just outside the blot should have picked up ink.
        assert!(out.get_pixel(10, 14).0[0] < 255);
        // And the blot itself should have lightened toward its blurred
        // surroundings.
        assert!(out.get_pixel(10, 10).0[0] > 0);
    }

    #[test]
    fn directionality_elongates_along_feed() {
        let paper = Rgb::WHITE;
        let mut sheet = paper_sheet(31, 31, paper);
        sheet.put_pixel(15, 15, image::Rgba([0, 0, 0, 255]));
        let config = InkBleedConfig {
            radius: 6,
            absorbency: 1.0,
            directionality: 0.8,
        };
        let out = bleed(&sheet, &config, paper, FeedDirection::Vertical);
        // Four pixels away along the feed axis the kernel still
        // reaches; the same distance across it does not.
        let below = out.get_pixel(15, 19).0[0];
        let beside = out.get_pixel(19, 15).0[0];
        assert!(
            below < beside,
            "feed-axis neighbor ({below}) should be darker than cross-axis ({beside})"
        );
    }

    #[test]
    fn dimensions_and_alpha_preserved() {
        let paper = default_paper();
        let mut sheet = paper_sheet(9, 13, paper);
        sheet.put_pixel(4, 6, image::Rgba([20, 20, 20, 99]));
        let out = bleed(
            &sheet,
            &InkBleedConfig::default(),
            paper,
            FeedDirection::Horizontal,
        );
        assert_eq!((out.width(), out.height()), (9, 13));
        assert_eq!(out.get_pixel(4, 6).0[3], 99);
    }
}
