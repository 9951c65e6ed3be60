//! Halftone screening: separation, per-plate rasterization, laydown.
//!
//! The continuous-tone buffer becomes a paper-colored sheet with up to
//! four screened ink plates pressed onto it. Each active channel
//! produces an independent plate raster (see [`crate::plate`]); the
//! plates are then composited onto the paper base with multiplicative
//! blending in the order given by the press laydown sequence. Plates
//! are never combined arithmetically before composition — overlap
//! colors come entirely from the multiply.
//!
//! Plate rasterization is independent per plate (seeded defect maps use
//! per-plate seeds), so the plates render in parallel; compositing
//! afterwards is strictly sequential in laydown order.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::color::{self, Rgb};
use crate::inkskip::build_skip_map;
use crate::params::{
    DotGainConfig, HalftoneConfig, HickeysConfig, InkSkipConfig, PressConfig, RegistrationConfig,
};
use crate::plate::{rasterize, PlateJob};
use crate::types::RgbaImage;

/// Separation mode: how many plates and what each one carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenMode {
    /// Single plate from inverted luminance.
    Bw,
    /// Two plates: shadows in ink 1, highlights in ink 2.
    Duotone,
    /// Four process plates from CMYK separation.
    Cmyk,
}

impl fmt::Display for ScreenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bw => f.write_str("bw"),
            Self::Duotone => f.write_str("duotone"),
            Self::Cmyk => f.write_str("cmyk"),
        }
    }
}

impl FromStr for ScreenMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "bw" => Ok(Self::Bw),
            "duotone" => Ok(Self::Duotone),
            "cmyk" => Ok(Self::Cmyk),
            _ => Err(()),
        }
    }
}

/// Shape drawn at each screen cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotShape {
    /// Filled disk.
    Circle,
    /// Filled diamond (rotated square).
    Diamond,
    /// Bar spanning the cell, rotated with the screen.
    Line,
}

impl fmt::Display for DotShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Circle => f.write_str("circle"),
            Self::Diamond => f.write_str("diamond"),
            Self::Line => f.write_str("line"),
        }
    }
}

impl FromStr for DotShape {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "circle" => Ok(Self::Circle),
            "diamond" => Ok(Self::Diamond),
            "line" => Ok(Self::Line),
            _ => Err(()),
        }
    }
}

/// A plate's channel identity. Duotone plates borrow the key (ink 1)
/// and cyan (ink 2) slots for angle, registration and laydown purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InkChannel {
    /// Process cyan.
    Cyan,
    /// Process magenta.
    Magenta,
    /// Process yellow.
    Yellow,
    /// Key (black).
    Key,
}

/// How a sampled source pixel converts to ink coverage in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateValue {
    /// `1 − L/255`: dark source pixels get big dots (bw, duotone ink 1).
    Shadow,
    /// `L/255`: bright source pixels get big dots (duotone ink 2).
    Highlight,
    /// Standard CMYK separation for the given process channel.
    Separation(InkChannel),
}

impl PlateValue {
    /// Ink coverage for a sampled pixel.
    #[must_use]
    pub fn ink_fraction(self, r: u8, g: u8, b: u8) -> f64 {
        match self {
            Self::Shadow => 1.0 - color::luminance(r, g, b) / 255.0,
            Self::Highlight => color::luminance(r, g, b) / 255.0,
            Self::Separation(channel) => separation(channel, r, g, b),
        }
    }
}

/// CMYK separation: `K = 1 − max(R,G,B)/255`; the chromatic plates
/// divide out the key so solid black carries no process ink.
fn separation(channel: InkChannel, r: u8, g: u8, b: u8) -> f64 {
    let key = 1.0 - f64::from(r.max(g).max(b)) / 255.0;
    if matches!(channel, InkChannel::Key) {
        return key;
    }
    if key >= 1.0 {
        return 0.0;
    }
    let value = match channel {
        InkChannel::Cyan => f64::from(r),
        InkChannel::Magenta => f64::from(g),
        InkChannel::Yellow => f64::from(b),
        InkChannel::Key => unreachable!(),
    };
    ((1.0 - value / 255.0 - key) / (1.0 - key)).clamp(0.0, 1.0)
}

/// One plate to rasterize: channel, ink, screen angle, value function,
/// and the pre-laydown index that drives fan-out and defect seeds.
#[derive(Debug, Clone, Copy)]
pub struct PlateSpec {
    /// Channel slot (angle, registration, laydown position).
    pub channel: InkChannel,
    /// Ink color.
    pub ink: Rgb,
    /// Screen angle in degrees, master rotation included.
    pub angle_deg: f64,
    /// Value function.
    pub value: PlateValue,
    /// 1-based index in channel-array order, before the laydown sort.
    pub plate_index: usize,
}

/// The channel array for a mode, in pre-laydown order.
#[must_use]
pub fn plate_specs(config: &HalftoneConfig) -> Vec<PlateSpec> {
    let master = f64::from(config.master_angle);
    match config.mode {
        ScreenMode::Bw => vec![PlateSpec {
            channel: InkChannel::Key,
            ink: config.duotone_color1,
            angle_deg: f64::from(config.angle_k) + master,
            value: PlateValue::Shadow,
            plate_index: 1,
        }],
        ScreenMode::Duotone => vec![
            PlateSpec {
                channel: InkChannel::Key,
                ink: config.duotone_color1,
                angle_deg: f64::from(config.angle_k) + master,
                value: PlateValue::Shadow,
                plate_index: 1,
            },
            PlateSpec {
                channel: InkChannel::Cyan,
                ink: config.duotone_color2,
                angle_deg: f64::from(config.angle_c) + master,
                value: PlateValue::Highlight,
                plate_index: 2,
            },
        ],
        ScreenMode::Cmyk => vec![
            PlateSpec {
                channel: InkChannel::Cyan,
                ink: color::INK_CYAN,
                angle_deg: f64::from(config.angle_c) + master,
                value: PlateValue::Separation(InkChannel::Cyan),
                plate_index: 1,
            },
            PlateSpec {
                channel: InkChannel::Magenta,
                ink: color::INK_MAGENTA,
                angle_deg: f64::from(config.angle_m) + master,
                value: PlateValue::Separation(InkChannel::Magenta),
                plate_index: 2,
            },
            PlateSpec {
                channel: InkChannel::Yellow,
                ink: color::INK_YELLOW,
                angle_deg: f64::from(config.angle_y) + master,
                value: PlateValue::Separation(InkChannel::Yellow),
                plate_index: 3,
            },
            PlateSpec {
                channel: InkChannel::Key,
                ink: color::INK_KEY,
                angle_deg: f64::from(config.angle_k) + master,
                value: PlateValue::Separation(InkChannel::Key),
                plate_index: 4,
            },
        ],
    }
}

/// Everything the screening stage reads besides the source buffer.
#[derive(Debug, Clone, Copy)]
pub struct ScreenContext<'a> {
    /// Screen geometry and inks.
    pub halftone: &'a HalftoneConfig,
    /// Press mechanics (feed, laydown, slur).
    pub press: &'a PressConfig,
    /// Dot gain, if active.
    pub dot_gain: Option<&'a DotGainConfig>,
    /// Registration error, if active.
    pub registration: Option<&'a RegistrationConfig>,
    /// Ink skip, if active.
    pub ink_skip: Option<&'a InkSkipConfig>,
    /// Hickeys, if active.
    pub hickeys: Option<&'a HickeysConfig>,
}

/// Counts collected while screening, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenStats {
    /// Number of plates rasterized.
    pub plates: usize,
    /// Total dots drawn across all plates.
    pub dots: usize,
}

/// Screen the source buffer into a paper-and-ink raster.
///
/// The source is consumed as *sample data only*: the output starts as
/// a sheet of paper color and receives the plates multiplicatively in
/// laydown order. Alpha is copied through from the source.
#[must_use]
pub fn screen(source: &RgbaImage, ctx: &ScreenContext<'_>) -> (RgbaImage, ScreenStats) {
    let (width, height) = (source.width(), source.height());
    let specs = plate_specs(ctx.halftone);
    let cell = f64::from(ctx.halftone.cell_size);

    // Rasterize every plate; seeded maps key off the plate index, so
    // the parallel order cannot change any output.
    let plates: Vec<(PlateSpec, RgbaImage, usize)> = specs
        .par_iter()
        .map(|spec| {
            let skip_map = ctx
                .ink_skip
                .map(|cfg| build_skip_map(width, height, cfg, ctx.press.feed, spec.plate_index));
            let offset = ctx
                .registration
                .map_or((0.0, 0.0), |reg| reg.offset(spec.channel));
            let fanout = ctx.registration.map_or(0.0, |reg| reg.fanout);
            let job = PlateJob {
                ink: spec.ink,
                angle_deg: spec.angle_deg,
                value: spec.value,
                plate_index: spec.plate_index,
                cell,
                shape: ctx.halftone.dot_shape,
                feed: ctx.press.feed,
                slur: ctx.press.slur,
                offset,
                fanout,
                dot_gain: ctx.dot_gain.copied(),
                skip_map: skip_map.as_deref(),
                hickeys: ctx.hickeys.copied(),
            };
            let (plate, dots) = rasterize(source, &job);
            (*spec, plate, dots)
        })
        .collect();

    let stats = ScreenStats {
        plates: plates.len(),
        dots: plates.iter().map(|(_, _, d)| d).sum(),
    };

    // Paper base; alpha comes from the source, untouched by screening.
    let paper = ctx.halftone.paper_color;
    let mut out = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([paper.r, paper.g, paper.b, source.get_pixel(x, y).0[3]])
    });

    // Press the plates in laydown order. The sort is stable, so modes
    // sharing a channel slot keep their pre-sort relative order.
    let mut ordered: Vec<&(PlateSpec, RgbaImage, usize)> = plates.iter().collect();
    ordered.sort_by_key(|(spec, _, _)| ctx.press.laydown.position(spec.channel));

    for (_, plate, _) in ordered {
        for (out_px, plate_px) in out.pixels_mut().zip(plate.pixels()) {
            for c in 0..3 {
                let product = u16::from(out_px.0[c]) * u16::from(plate_px.0[c]);
                out_px.0[c] = ((product + 127) / 255) as u8;
            }
        }
    }

    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Laydown;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, _| image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    fn context<'a>(halftone: &'a HalftoneConfig, press: &'a PressConfig) -> ScreenContext<'a> {
        ScreenContext {
            halftone,
            press,
            dot_gain: None,
            registration: None,
            ink_skip: None,
            hickeys: None,
        }
    }

    #[test]
    fn separation_of_gray_is_pure_key() {
        for v in [0u8, 64, 128, 200] {
            assert_eq!(separation(InkChannel::Cyan, v, v, v), 0.0);
            assert_eq!(separation(InkChannel::Magenta, v, v, v), 0.0);
            assert_eq!(separation(InkChannel::Yellow, v, v, v), 0.0);
        }
        assert!((separation(InkChannel::Key, 128, 128, 128) - (1.0 - 128.0 / 255.0)).abs() < 1e-9);
    }

    #[test]
    fn separation_of_black_has_no_process_ink() {
        assert_eq!(separation(InkChannel::Key, 0, 0, 0), 1.0);
        assert_eq!(separation(InkChannel::Cyan, 0, 0, 0), 0.0);
        assert_eq!(separation(InkChannel::Magenta, 0, 0, 0), 0.0);
        assert_eq!(separation(InkChannel::Yellow, 0, 0, 0), 0.0);
    }

    #[test]
    fn separation_of_red_is_magenta_plus_yellow() {
        assert_eq!(separation(InkChannel::Key, 255, 0, 0), 0.0);
        assert_eq!(separation(InkChannel::Cyan, 255, 0, 0), 0.0);
        assert!((separation(InkChannel::Magenta, 255, 0, 0) - 1.0).abs() < 1e-9);
        assert!((separation(InkChannel::Yellow, 255, 0, 0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn plate_indices_are_pre_sort_channel_order() {
        let config = HalftoneConfig::default();
        let specs = plate_specs(&config);
        let indices: Vec<usize> = specs.iter().map(|s| s.plate_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(specs[0].channel, InkChannel::Cyan);
        assert_eq!(specs[3].channel, InkChannel::Key);
    }

    #[test]
    fn white_source_on_white_paper_is_white() {
        let src = solid(4, 4, [255, 255, 255]);
        let halftone = HalftoneConfig {
            paper_color: Rgb::WHITE,
            ..HalftoneConfig::default()
        };
        let press = PressConfig::default();
        let (out, _) = screen(&src, &context(&halftone, &press));
        assert!(out.pixels().all(|px| px.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn black_source_bw_mode_prints_dark_dots() {
        let src = solid(4, 4, [0, 0, 0]);
        let halftone = HalftoneConfig {
            mode: ScreenMode::Bw,
            cell_size: 4,
            angle_k: 0,
            master_angle: 0,
            paper_color: Rgb::WHITE,
            ..HalftoneConfig::default()
        };
        let press = PressConfig::default();
        let (out, stats) = screen(&src, &context(&halftone, &press));
        assert_eq!(stats.plates, 1);
        let min_brightness = out
            .pixels()
            .map(|px| px.0[0].min(px.0[1]).min(px.0[2]))
            .min()
            .unwrap();
        assert!(min_brightness <= 10, "darkest pixel {min_brightness}");
    }

    #[test]
    fn empty_source_tone_still_yields_paper_color() {
        // A white source draws no dots, so the sheet shows through.
        let src = solid(8, 8, [255, 255, 255]);
        let halftone = HalftoneConfig::default();
        let press = PressConfig::default();
        let (out, _) = screen(&src, &context(&halftone, &press));
        let paper = HalftoneConfig::DEFAULT_PAPER_COLOR;
        assert!(out
            .pixels()
            .all(|px| px.0[0] == paper.r && px.0[1] == paper.g && px.0[2] == paper.b));
    }

    #[test]
    fn laydown_order_changes_overlap_color() {
        // A colorful gradient puts every plate's screen at partial
        // coverage, so overlap pixels take many distinct values. Each
        // plate press quantizes to 8 bits, which makes the composite
        // sensitive to laydown order wherever screens overlap.
        let src = RgbaImage::from_fn(64, 64, |x, y| {
            image::Rgba([(40 + x * 2) as u8, (30 + y * 2) as u8, 70, 255])
        });
        let halftone = HalftoneConfig {
            cell_size: 5,
            ..HalftoneConfig::default()
        };
        let first = PressConfig {
            laydown: Laydown::Kcmy,
            ..PressConfig::default()
        };
        let second = PressConfig {
            laydown: Laydown::Ymck,
            ..PressConfig::default()
        };
        let (a, _) = screen(&src, &context(&halftone, &first));
        let (b, _) = screen(&src, &context(&halftone, &second));
        let diff = a
            .pixels()
            .zip(b.pixels())
            .filter(|(pa, pb)| pa.0 != pb.0)
            .count();
        assert!(diff > 0, "laydown swap should change the composite");
    }

    #[test]
    fn duotone_uses_both_inks() {
        let src = RgbaImage::from_fn(48, 48, |x, _| {
            let v = if x < 24 { 20 } else { 235 };
            image::Rgba([v, v, v, 255])
        });
        let halftone = HalftoneConfig {
            mode: ScreenMode::Duotone,
            duotone_color1: Rgb::new(20, 20, 80),
            duotone_color2: Rgb::new(220, 120, 20),
            paper_color: Rgb::WHITE,
            cell_size: 6,
            ..HalftoneConfig::default()
        };
        let press = PressConfig::default();
        let (out, stats) = screen(&src, &context(&halftone, &press));
        assert_eq!(stats.plates, 2);
        // Shadow half is dominated by ink 1 (bluish: b > r), highlight
        // half by ink 2 (orange: r > b). Compare halves in aggregate so
        // individual pixels landing between dots don't matter.
        let balance = |x0: u32, x1: u32| -> i64 {
            let mut sum = 0i64;
            for y in 0..48 {
                for x in x0..x1 {
                    let px = out.get_pixel(x, y).0;
                    sum += i64::from(px[2]) - i64::from(px[0]);
                }
            }
            sum
        };
        assert!(balance(0, 24) > 0, "shadow half should lean blue");
        assert!(balance(24, 48) < 0, "highlight half should lean orange");
    }

    #[test]
    fn alpha_passes_through_from_source() {
        let mut src = solid(8, 8, [128, 128, 128]);
        src.put_pixel(3, 3, image::Rgba([128, 128, 128, 17]));
        let halftone = HalftoneConfig::default();
        let press = PressConfig::default();
        let (out, _) = screen(&src, &context(&halftone, &press));
        assert_eq!(out.get_pixel(3, 3).0[3], 17);
        assert_eq!(out.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn registration_shift_moves_cyan_only() {
        let src = solid(60, 60, [64, 128, 192]);
        let halftone = HalftoneConfig::default();
        let press = PressConfig::default();
        let registration = RegistrationConfig {
            cx: 5.0,
            ..RegistrationConfig::default()
        };
        let mut ctx = context(&halftone, &press);
        ctx.registration = Some(&registration);
        let (shifted, _) = screen(&src, &ctx);
        let (reference, _) = screen(&src, &context(&halftone, &press));
        assert_ne!(shifted, reference);
    }
}
