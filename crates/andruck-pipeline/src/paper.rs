//! Paper tooth: surface texture and fiber structure.
//!
//! A shared scalar *paper map* drives two effects. In the highlights,
//! the map modulates brightness directly — raw paper showing its
//! texture where little ink sits. In the shadows, under reduced
//! impression pressure, positive map values let the sheet show through
//! the ink as mottle.
//!
//! The map is seeded (mulberry32 with fixed seeds for the base grain
//! and the fiber strokes), so identical texture/fiber/feed settings
//! reproduce the identical sheet. Fibers run along the feed axis.

use crate::color::{clamp_u8, lerp, luminance, Rgb};
use crate::params::{FeedDirection, PaperConfig};
use crate::rng::Mulberry32;
use crate::types::RgbaImage;

/// Seed for the base texture noise.
const TEXTURE_SEED: u32 = 7001;

/// Seed for the fiber strokes.
const FIBER_SEED: u32 = 9001;

/// Brightness swing of the highlight noise at full map value.
const HIGHLIGHT_GAIN: f64 = 150.0;

/// Build the paper map: base noise plus fiber strokes.
///
/// Returns the row-major field and the number of fibers drawn. Values
/// are roughly within `±texture`, with fiber accumulation on top.
#[must_use]
pub fn build_paper_map(
    width: u32,
    height: u32,
    config: &PaperConfig,
    feed: FeedDirection,
) -> (Vec<f32>, usize) {
    let (w, h) = (width as usize, height as usize);
    let long_axis = f64::from(width.max(height));

    let mut rng = Mulberry32::new(TEXTURE_SEED);
    let mut map: Vec<f32> = (0..w * h)
        .map(|_| (rng.signed_unit() * config.texture) as f32)
        .collect();

    // Fiber strokes: short runs along the feed axis that fade out
    // toward their tail. Draw order per fiber: start x, start y,
    // length, value.
    let fiber_count = (long_axis * config.fibers * 0.3).round() as usize;
    let mut rng = Mulberry32::new(FIBER_SEED);
    for _ in 0..fiber_count {
        let start_x = (rng.next_f64() * f64::from(width)) as usize;
        let start_y = (rng.next_f64() * f64::from(height)) as usize;
        let length = rng.range(10.0, long_axis * 0.2 + 10.0);
        let value = rng.signed_unit() * config.fibers;

        let steps = length as usize;
        for step in 0..steps {
            let (x, y) = match feed {
                FeedDirection::Horizontal => (start_x + step, start_y),
                FeedDirection::Vertical => (start_x, start_y + step),
            };
            if x >= w || y >= h {
                break;
            }
            let taper = 1.0 - step as f64 / length;
            map[y * w + x] += (value * taper) as f32;
        }
    }

    (map, fiber_count)
}

/// Apply the paper map to the sheet.
///
/// `pressure` comes from the press module; at full pressure (1.0) the
/// shadow mottle vanishes and only the highlight noise remains.
#[must_use]
pub fn apply(
    image: &RgbaImage,
    map: &[f32],
    config: &PaperConfig,
    paper: Rgb,
    pressure: f64,
) -> RgbaImage {
    let width = image.width() as usize;
    let mut out = image.clone();
    let paper_channels = paper.channels();
    let mottle_active = pressure < 1.0;
    let safe_texture = config.texture.max(0.001);

    for (x, y, px) in out.enumerate_pixels_mut() {
        let map_val = f64::from(map[y as usize * width + x as usize]);
        let lum = luminance(px.0[0], px.0[1], px.0[2]) / 255.0;

        // Highlight noise: raw texture shows where the sheet is bright.
        if lum > 0.4 {
            let highlight_weight = ((lum - 0.4) / 0.6).clamp(0.0, 1.0);
            let offset = map_val * highlight_weight * HIGHLIGHT_GAIN;
            for c in 0..3 {
                px.0[c] = clamp_u8(f64::from(px.0[c]) + offset);
            }
        }

        // Shadow mottle: raised paper refuses ink under light pressure.
        if mottle_active && lum < 0.6 && map_val > 0.0 {
            let shadow_weight = ((0.6 - lum) / 0.6).clamp(0.0, 1.0);
            let mottle = ((1.0 - pressure) * (map_val / safe_texture) * shadow_weight * 2.0)
                .clamp(0.0, 1.0);
            for c in 0..3 {
                px.0[c] = clamp_u8(lerp(
                    f64::from(px.0[c]),
                    f64::from(paper_channels[c]),
                    mottle,
                ));
            }
        }
    }

    out
}

/// Build the map and apply it in one step. Returns the toothed raster
/// and the fiber count for diagnostics.
#[must_use]
pub fn tooth(
    image: &RgbaImage,
    config: &PaperConfig,
    paper: Rgb,
    pressure: f64,
    feed: FeedDirection,
) -> (RgbaImage, usize) {
    let (map, fibers) = build_paper_map(image.width(), image.height(), config, feed);
    (apply(image, &map, config, paper, pressure), fibers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, _| image::Rgba([v, v, v, 255]))
    }

    #[test]
    fn map_is_reproducible() {
        let config = PaperConfig::default();
        let (a, _) = build_paper_map(48, 48, &config, FeedDirection::Vertical);
        let (b, _) = build_paper_map(48, 48, &config, FeedDirection::Vertical);
        assert_eq!(a, b);
    }

    #[test]
    fn fiber_count_scales_with_density_and_size() {
        let sparse = PaperConfig {
            fibers: 0.05,
            ..PaperConfig::default()
        };
        let dense = PaperConfig {
            fibers: 0.4,
            ..PaperConfig::default()
        };
        let (_, few) = build_paper_map(100, 100, &sparse, FeedDirection::Vertical);
        let (_, many) = build_paper_map(100, 100, &dense, FeedDirection::Vertical);
        assert!(many > few);
        assert_eq!(few, (100.0f64 * 0.05 * 0.3).round() as usize);
    }

    #[test]
    fn zero_texture_and_fibers_leave_highlights_flat() {
        let config = PaperConfig {
            texture: 0.0,
            fibers: 0.0,
        };
        let img = solid(24, 24, 220);
        let (out, fibers) = tooth(
            &img,
            &config,
            Rgb::WHITE,
            1.0,
            FeedDirection::Vertical,
        );
        assert_eq!(fibers, 0);
        assert_eq!(out, img);
    }

    #[test]
    fn highlights_get_noisy_shadows_stay_clean_at_full_pressure() {
        let config = PaperConfig {
            texture: 0.3,
            fibers: 0.0,
        };
        let bright = solid(32, 32, 230);
        let dark = solid(32, 32, 40);
        let (bright_out, _) = tooth(&bright, &config, Rgb::WHITE, 1.0, FeedDirection::Vertical);
        let (dark_out, _) = tooth(&dark, &config, Rgb::WHITE, 1.0, FeedDirection::Vertical);

        let changed = |out: &RgbaImage, base: u8| {
            out.pixels().filter(|px| px.0[0] != base).count()
        };
        assert!(changed(&bright_out, 230) > 0, "highlights should speckle");
        assert_eq!(changed(&dark_out, 40), 0, "full pressure holds the shadows");
    }

    #[test]
    fn low_pressure_mottles_the_shadows_toward_paper() {
        let config = PaperConfig {
            texture: 0.3,
            fibers: 0.0,
        };
        let dark = solid(32, 32, 40);
        let (out, _) = tooth(&dark, &config, Rgb::WHITE, 0.3, FeedDirection::Vertical);
        // Positive map values pull shadow pixels toward white paper.
        assert!(out.pixels().any(|px| px.0[0] > 40));
        // Negative map values never darken the shadows.
        assert!(out.pixels().all(|px| px.0[0] >= 40));
    }

    #[test]
    fn fibers_run_along_the_feed_axis() {
        let config = PaperConfig {
            texture: 0.0,
            fibers: 0.5,
        };
        let (map, fibers) = build_paper_map(80, 80, &config, FeedDirection::Horizontal);
        assert!(fibers > 0);

        // With no base texture, every nonzero sample belongs to a
        // fiber; horizontal feed means runs extend in +x.
        let longest_row_run = (0..80)
            .map(|y| {
                let mut best = 0;
                let mut current = 0;
                for x in 0..80 {
                    current = if map[y * 80 + x] != 0.0 { current + 1 } else { 0 };
                    best = best.max(current);
                }
                best
            })
            .max()
            .unwrap();
        assert!(
            longest_row_run >= 10,
            "fibers should run at least their minimum length, got {longest_row_run}"
        );
    }

    #[test]
    fn alpha_preserved() {
        let mut img = solid(16, 16, 200);
        img.put_pixel(5, 5, image::Rgba([200, 200, 200, 3]));
        let (out, _) = tooth(
            &img,
            &PaperConfig::default(),
            Rgb::WHITE,
            0.5,
            FeedDirection::Vertical,
        );
        assert_eq!(out.get_pixel(5, 5).0[3], 3);
    }
}
