//! Ink-skip map: seeded bands of ink starvation.
//!
//! A worn or under-inked roller starves dots in streaks that run
//! *across* the feed direction. The map is a scalar field in
//! `[-intensity, +intensity]` built from elongated elliptical blobs —
//! negative values starve ink, positive values flood it slightly.
//!
//! The field is seeded per plate (`plate_index * 1000`, pre-laydown
//! index) so two runs with the same configuration produce bit-identical
//! maps. Draw order per blob is fixed: center x, center y, x-radius
//! scale, y-radius scale, value.

use crate::params::{FeedDirection, InkSkipConfig};
use crate::rng::Mulberry32;

/// Seed stride between plates.
const PLATE_SEED_STRIDE: u32 = 1000;

/// Build the skip map for one plate.
///
/// `plate_index` is the 1-based pre-laydown-sort channel index. The
/// returned field is row-major `width * height`, clamped to
/// `[-intensity, +intensity]`, zero where no blob reaches.
#[must_use]
pub fn build_skip_map(
    width: u32,
    height: u32,
    config: &InkSkipConfig,
    feed: FeedDirection,
    plate_index: usize,
) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    let mut numerator = vec![0.0f64; w * h];
    let mut weight = vec![0.0f64; w * h];

    let mut rng = Mulberry32::new(plate_index as u32 * PLATE_SEED_STRIDE);

    let blob_count = (((1.0 - config.scale) * 12.0 + 3.0).max(3.0) * 3.0).round() as usize;
    let base_radius = config.scale * f64::from(width.min(height)) * 0.6;

    // Major axis orthogonal to the feed, minor along it: a vertical
    // feed gives tall narrow streaks smeared across x by the roller.
    let (rx_base, ry_base) = match feed {
        FeedDirection::Vertical => (base_radius * 0.15, base_radius * 2.5),
        FeedDirection::Horizontal => (base_radius * 2.5, base_radius * 0.15),
    };

    for _ in 0..blob_count {
        let cx = rng.next_f64() * f64::from(width);
        let cy = rng.next_f64() * f64::from(height);
        let rx = (rx_base * rng.range(0.5, 1.5)).max(0.5);
        let ry = (ry_base * rng.range(0.5, 1.5)).max(0.5);
        let value = rng.signed_unit() * config.intensity;

        let x0 = ((cx - rx).floor().max(0.0)) as usize;
        let x1 = ((cx + rx).ceil().min(f64::from(width) - 1.0)) as usize;
        let y0 = ((cy - ry).floor().max(0.0)) as usize;
        let y1 = ((cy + ry).ceil().min(f64::from(height) - 1.0)) as usize;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x as f64 - cx) / rx;
                let dy = (y as f64 - cy) / ry;
                let d = (dx * dx + dy * dy).sqrt();
                if d < 1.0 {
                    let falloff = 1.0 - d;
                    numerator[y * w + x] += value * falloff;
                    weight[y * w + x] += falloff;
                }
            }
        }
    }

    numerator
        .iter()
        .zip(weight.iter())
        .map(|(&num, &den)| {
            if den > 0.0 {
                (num / den).clamp(-config.intensity, config.intensity) as f32
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_plate_same_map() {
        let config = InkSkipConfig::default();
        let a = build_skip_map(64, 64, &config, FeedDirection::Vertical, 1);
        let b = build_skip_map(64, 64, &config, FeedDirection::Vertical, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn different_plates_differ() {
        let config = InkSkipConfig::default();
        let a = build_skip_map(64, 64, &config, FeedDirection::Vertical, 1);
        let b = build_skip_map(64, 64, &config, FeedDirection::Vertical, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn values_bounded_by_intensity() {
        let config = InkSkipConfig {
            intensity: 0.25,
            scale: 0.5,
        };
        let map = build_skip_map(48, 48, &config, FeedDirection::Horizontal, 3);
        for &v in &map {
            assert!(v.abs() <= 0.2501, "value {v} exceeds intensity bound");
        }
    }

    #[test]
    fn map_is_not_all_zero() {
        let map = build_skip_map(64, 64, &InkSkipConfig::default(), FeedDirection::Vertical, 1);
        assert!(map.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn bands_elongate_along_feed() {
        // With a vertical feed the blobs are tall and thin, so column
        // runs of nonzero values should dwarf row runs.
        let config = InkSkipConfig {
            intensity: 1.0,
            scale: 0.3,
        };
        let (w, h) = (96usize, 96usize);
        let map = build_skip_map(w as u32, h as u32, &config, FeedDirection::Vertical, 1);

        let longest_column_run = (0..w)
            .map(|x| longest_run((0..h).map(|y| map[y * w + x] != 0.0)))
            .max()
            .unwrap_or(0);
        let longest_row_run = (0..h)
            .map(|y| longest_run((0..w).map(|x| map[y * w + x] != 0.0)))
            .max()
            .unwrap_or(0);

        assert!(
            longest_column_run >= longest_row_run,
            "vertical feed should streak vertically ({longest_column_run} vs {longest_row_run})"
        );
        assert!(
            longest_column_run > h / 2,
            "streaks should span most of a column, got {longest_column_run}"
        );
    }

    fn longest_run(bits: impl Iterator<Item = bool>) -> usize {
        let mut best = 0;
        let mut current = 0;
        for b in bits {
            current = if b { current + 1 } else { 0 };
            best = best.max(current);
        }
        best
    }
}
