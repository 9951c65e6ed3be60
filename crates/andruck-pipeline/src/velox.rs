//! Velox crush: high-contrast sigmoid binarization to grayscale.
//!
//! Named for the trademark high-contrast photographic paper. The stage
//! computes each pixel's luminance, pushes it through a steep logistic
//! curve, and replicates the result to all three channels — the output
//! is grayscale, nearly two-tone at high contrast settings.

use crate::color::{clamp_u8, luminance};
use crate::params::VeloxConfig;
use crate::types::RgbaImage;

/// Build the 256-entry sigmoid LUT:
/// `lut[i] = 255 / (1 + e^(−10·contrast·(i/255 − threshold)))`.
fn build_lut(config: &VeloxConfig) -> [u8; 256] {
    let steepness = 10.0 * config.contrast;
    std::array::from_fn(|i| {
        let t = i as f64 / 255.0;
        clamp_u8(255.0 / (1.0 + (-steepness * (t - config.threshold)).exp()))
    })
}

/// Apply the crush. Alpha is untouched.
#[must_use]
pub fn crush(image: &RgbaImage, config: &VeloxConfig) -> RgbaImage {
    let lut = build_lut(config);
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let lum = clamp_u8(luminance(px.0[0], px.0[1], px.0[2]));
        let v = lut[lum as usize];
        px.0[0] = v;
        px.0[1] = v;
        px.0[2] = v;
    }
    out
}
