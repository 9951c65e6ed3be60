//! Film-stock development: tone curves, halation, saturation, fade.
//!
//! The first full stage of the pipeline. Each stock in the embedded
//! catalog defines a five-point tone curve per RGB channel, a
//! saturation scalar, an optional B&W conversion with its own
//! luminance weights, and a halation spec. Development runs in a fixed
//! order — halation bloom is added to the *pre-curve* buffer so the
//! bloom itself is pushed through the tone curve, B&W runs after the
//! curves, fade runs last.
//!
//! The catalog is static configuration, not code: tweaking a stock
//! means editing its table entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blur::box_blur;
use crate::color::{clamp_u8, lerp, luminance};
use crate::params::FilmConfig;
use crate::types::RgbaImage;

/// Identifier of a stock in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilmStockId {
    /// Kodak Tri-X 400: contrasty B&W with crunchy shadows.
    Trix,
    /// Ilford HP5 Plus: softer, wide-latitude B&W.
    Hp5,
    /// Kodachrome: saturated color, deep blacks, warm red halation.
    Kodachrome,
    /// Kodak Portra: gentle color negative tuned for skin.
    Portra,
    /// Ektachrome: cool-leaning slide film.
    Ektachrome,
}

impl fmt::Display for FilmStockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trix => f.write_str("trix"),
            Self::Hp5 => f.write_str("hp5"),
            Self::Kodachrome => f.write_str("kodachrome"),
            Self::Portra => f.write_str("portra"),
            Self::Ektachrome => f.write_str("ektachrome"),
        }
    }
}

impl FromStr for FilmStockId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "trix" => Ok(Self::Trix),
            "hp5" => Ok(Self::Hp5),
            "kodachrome" => Ok(Self::Kodachrome),
            "portra" => Ok(Self::Portra),
            "ektachrome" => Ok(Self::Ektachrome),
            _ => Err(()),
        }
    }
}

/// Halation: light bouncing off the film base behind highlights,
/// blooming into a tinted glow around bright edges.
#[derive(Debug, Clone, Copy)]
pub struct HalationSpec {
    /// Box-blur radius of the bloom, in pixels.
    pub radius: usize,
    /// Bloom tint, 0–255 per channel.
    pub tint: [f64; 3],
    /// Stock-specific strength multiplier.
    pub strength: f64,
}

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct FilmStock {
    /// Tone curve control points per channel (R, G, B), sampled at
    /// x = 0, 0.25, 0.5, 0.75, 1.0.
    pub curves: [[f64; 5]; 3],
    /// Saturation applied after the curves (color stocks only).
    pub saturation: f64,
    /// B&W conversion weights (R, G, B), or `None` for color stocks.
    pub bw_weights: Option<[f64; 3]>,
    /// Halation behavior.
    pub halation: HalationSpec,
}

impl FilmStockId {
    /// The catalog entry for this stock.
    #[must_use]
    pub const fn stock(self) -> &'static FilmStock {
        match self {
            Self::Trix => &TRIX,
            Self::Hp5 => &HP5,
            Self::Kodachrome => &KODACHROME,
            Self::Portra => &PORTRA,
            Self::Ektachrome => &EKTACHROME,
        }
    }
}

static TRIX: FilmStock = FilmStock {
    curves: [
        [0.02, 0.20, 0.52, 0.86, 0.99],
        [0.02, 0.20, 0.52, 0.86, 0.99],
        [0.02, 0.20, 0.52, 0.86, 0.99],
    ],
    saturation: 1.0,
    bw_weights: Some([0.25, 0.64, 0.11]),
    halation: HalationSpec {
        radius: 4,
        tint: [255.0, 240.0, 220.0],
        strength: 0.25,
    },
};

static HP5: FilmStock = FilmStock {
    curves: [
        [0.04, 0.26, 0.52, 0.78, 0.96],
        [0.04, 0.26, 0.52, 0.78, 0.96],
        [0.04, 0.26, 0.52, 0.78, 0.96],
    ],
    saturation: 1.0,
    bw_weights: Some([0.30, 0.59, 0.11]),
    halation: HalationSpec {
        radius: 3,
        tint: [255.0, 248.0, 240.0],
        strength: 0.18,
    },
};

static KODACHROME: FilmStock = FilmStock {
    curves: [
        [0.00, 0.21, 0.52, 0.82, 1.00],
        [0.00, 0.20, 0.49, 0.78, 0.98],
        [0.02, 0.20, 0.47, 0.75, 0.96],
    ],
    saturation: 1.25,
    bw_weights: None,
    halation: HalationSpec {
        radius: 5,
        tint: [255.0, 90.0, 48.0],
        strength: 0.40,
    },
};

static PORTRA: FilmStock = FilmStock {
    curves: [
        [0.03, 0.27, 0.53, 0.79, 0.97],
        [0.03, 0.26, 0.51, 0.77, 0.96],
        [0.04, 0.25, 0.49, 0.75, 0.94],
    ],
    saturation: 0.92,
    bw_weights: None,
    halation: HalationSpec {
        radius: 4,
        tint: [255.0, 150.0, 110.0],
        strength: 0.22,
    },
};

static EKTACHROME: FilmStock = FilmStock {
    curves: [
        [0.01, 0.22, 0.49, 0.78, 0.98],
        [0.01, 0.23, 0.51, 0.80, 0.99],
        [0.02, 0.24, 0.53, 0.82, 1.00],
    ],
    saturation: 1.15,
    bw_weights: None,
    halation: HalationSpec {
        radius: 4,
        tint: [160.0, 200.0, 255.0],
        strength: 0.20,
    },
};

/// Halation below this effective strength is skipped entirely.
const HALATION_EPSILON: f64 = 0.005;

/// Fade below this amount is treated as off.
const FADE_EPSILON: f64 = 0.01;

/// Evaluate a five-point curve at `t ∈ [0, 1]` with smoothstep
/// interpolation (`3t² − 2t³`) between neighboring control points.
fn curve_at(points: &[f64; 5], t: f64) -> f64 {
    let scaled = t.clamp(0.0, 1.0) * 4.0;
    let segment = (scaled.floor() as usize).min(3);
    let local = scaled - segment as f64;
    let smooth = local * local * (3.0 - 2.0 * local);
    lerp(points[segment], points[segment + 1], smooth)
}

/// Build the 256-entry exposure + tone-curve LUT for one channel.
fn build_curve_lut(points: &[f64; 5], exposure_ev: f64) -> [u8; 256] {
    let gain = 2.0f64.powf(exposure_ev);
    std::array::from_fn(|i| {
        let exposed = (i as f64 * gain / 255.0).clamp(0.0, 1.0);
        clamp_u8(255.0 * curve_at(points, exposed))
    })
}

/// Build the per-channel fade LUTs (normalized 0–1 outputs).
fn build_fade_luts(fade: f64, is_bw: bool) -> [[f64; 256]; 3] {
    let lift = 0.07 * fade;
    let contrast = 1.0 - 0.22 * fade;
    let scales = if is_bw {
        [1.0, 1.0, 1.0]
    } else {
        [1.0 + 0.14 * fade, 1.0 + 0.03 * fade, 1.0 - 0.08 * fade]
    };
    std::array::from_fn(|c| {
        std::array::from_fn(|i| ((lift + (i as f64 / 255.0) * contrast) * scales[c]).clamp(0.0, 1.0))
    })
}

/// Develop the raster through the configured stock.
///
/// Stage order: halation bloom onto the pre-curve buffer, exposure +
/// tone curves, B&W conversion, saturation, fade. Alpha is untouched.
#[must_use]
pub fn develop(image: &RgbaImage, config: &FilmConfig) -> RgbaImage {
    let stock = config.stock.stock();
    let mut out = image.clone();
    let (width, height) = (out.width() as usize, out.height() as usize);

    // Halation first: the bloom has to feed into the tone curves.
    let effective = config.halation * stock.halation.strength;
    if effective > HALATION_EPSILON {
        apply_halation(&mut out, &stock.halation, config.halation, width, height);
    }

    // Exposure + tone curves, one LUT per channel.
    let luts: [[u8; 256]; 3] =
        std::array::from_fn(|c| build_curve_lut(&stock.curves[c], config.exposure));
    for px in out.pixels_mut() {
        px.0[0] = luts[0][px.0[0] as usize];
        px.0[1] = luts[1][px.0[1] as usize];
        px.0[2] = luts[2][px.0[2] as usize];
    }

    // B&W conversion with the stock's own weights.
    if let Some([wr, wg, wb]) = stock.bw_weights {
        for px in out.pixels_mut() {
            let gray = clamp_u8(
                wr * f64::from(px.0[0]) + wg * f64::from(px.0[1]) + wb * f64::from(px.0[2]),
            );
            px.0[0] = gray;
            px.0[1] = gray;
            px.0[2] = gray;
        }
    } else if (stock.saturation - 1.0).abs() > f64::EPSILON {
        // Saturation: lerp each channel away from (or toward) luminance.
        let sat = stock.saturation;
        for px in out.pixels_mut() {
            let lum = luminance(px.0[0], px.0[1], px.0[2]);
            for c in 0..3 {
                px.0[c] = clamp_u8(lum + (f64::from(px.0[c]) - lum) * sat);
            }
        }
    }

    // Fade last: lifted blacks, compressed contrast, color shift,
    // partial desaturation.
    if config.fade > FADE_EPSILON {
        let luts = build_fade_luts(config.fade, stock.bw_weights.is_some());
        let desat = 0.35 * config.fade;
        for px in out.pixels_mut() {
            let faded = [
                luts[0][px.0[0] as usize],
                luts[1][px.0[1] as usize],
                luts[2][px.0[2] as usize],
            ];
            let lum = 0.299 * faded[0] + 0.587 * faded[1] + 0.114 * faded[2];
            for c in 0..3 {
                px.0[c] = clamp_u8(lerp(faded[c], lum, desat) * 255.0);
            }
        }
    }

    out
}

/// Add the blurred highlight bloom onto the buffer in place.
fn apply_halation(
    out: &mut RgbaImage,
    spec: &HalationSpec,
    halation: f64,
    width: usize,
    height: usize,
) {
    // Brightness field: how far above the highlight knee each pixel sits.
    let mut field: Vec<f32> = out
        .pixels()
        .map(|px| {
            let lum = luminance(px.0[0], px.0[1], px.0[2]) / 255.0;
            (((lum - 0.65) / 0.35).max(0.0)) as f32
        })
        .collect();

    // Two box passes approximate a Gaussian falloff.
    box_blur(&mut field, width, height, spec.radius, 2);

    let gain = halation * spec.strength;
    for (px, &bloom) in out.pixels_mut().zip(field.iter()) {
        let bloom = f64::from(bloom) * gain;
        for c in 0..3 {
            px.0[c] = clamp_u8(f64::from(px.0[c]) + bloom * spec.tint[c]);
        }
    }
}
