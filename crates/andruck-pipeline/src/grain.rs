//! Film grain: additive luminance-weighted noise.
//!
//! Grain is deliberately **unseeded** — every run speckles differently,
//! like a fresh scan of the same negative. The shadow-weighted mode
//! biases the noise toward dark regions, where real grain reads
//! strongest.

use rand::Rng;

use crate::color::{clamp_u8, luminance};
use crate::params::GrainConfig;
use crate::types::RgbaImage;

/// Shadow-weight multiplier: at full black the noise amplitude is 1.5x
/// the nominal amount, tapering to zero at white.
const SHADOW_WEIGHT_GAIN: f64 = 1.5;

/// Add grain. The same random offset is applied to R, G and B so the
/// noise is luminance-only, never chroma speckle. Alpha is untouched.
#[must_use]
pub fn apply(image: &RgbaImage, config: &GrainConfig) -> RgbaImage {
    let mut rng = rand::thread_rng();
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let weight = if config.weighted {
            (1.0 - luminance(px.0[0], px.0[1], px.0[2]) / 255.0) * SHADOW_WEIGHT_GAIN
        } else {
            1.0
        };
        let offset = rng.gen_range(-1.0..=1.0) * config.amount * 255.0 * weight;
        for c in 0..3 {
            px.0[c] = clamp_u8(f64::from(px.0[c]) + offset);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(v: u8) -> RgbaImage {
        RgbaImage::from_fn(64, 64, |_, _| image::Rgba([v, v, v, 255]))
    }

    fn mean_abs_deviation(img: &RgbaImage, base: u8) -> f64 {
        let total: f64 = img
            .pixels()
            .map(|px| (f64::from(px.0[0]) - f64::from(base)).abs())
            .sum();
        total / f64::from(img.width() * img.height())
    }

    #[test]
    fn zero_amount_changes_nothing() {
        let img = solid(128);
        let out = apply(
            &img,
            &GrainConfig {
                amount: 0.0,
                weighted: false,
            },
        );
        assert_eq!(out, img);
    }

    #[test]
    fn noise_is_luminance_only() {
        let img = RgbaImage::from_fn(16, 16, |_, _| image::Rgba([80, 120, 160, 255]));
        let out = apply(&img, &GrainConfig::default());
        for (before, after) in img.pixels().zip(out.pixels()) {
            // Unclamped channels move together.
            let dr = i16::from(after.0[0]) - i16::from(before.0[0]);
            let dg = i16::from(after.0[1]) - i16::from(before.0[1]);
            assert_eq!(dr, dg);
        }
    }

    #[test]
    fn weighted_grain_is_stronger_in_shadows() {
        let config = GrainConfig {
            amount: 0.2,
            weighted: true,
        };
        let dark = mean_abs_deviation(&apply(&solid(40), &config), 40);
        let light = mean_abs_deviation(&apply(&solid(220), &config), 220);
        assert!(
            dark > light * 1.5,
            "shadow deviation {dark:.2} should exceed highlight deviation {light:.2}"
        );
    }

    #[test]
    fn unweighted_grain_is_uniform() {
        let config = GrainConfig {
            amount: 0.2,
            weighted: false,
        };
        let dark = mean_abs_deviation(&apply(&solid(100), &config), 100);
        let light = mean_abs_deviation(&apply(&solid(150), &config), 150);
        let ratio = dark / light;
        assert!(
            (0.6..1.7).contains(&ratio),
            "deviations should be comparable, ratio {ratio:.2}"
        );
    }

    #[test]
    fn alpha_and_dimensions_preserved() {
        let img = RgbaImage::from_fn(10, 12, |_, _| image::Rgba([50, 60, 70, 200]));
        let out = apply(&img, &GrainConfig::default());
        assert_eq!((out.width(), out.height()), (10, 12));
        assert!(out.pixels().all(|px| px.0[3] == 200));
    }
}
