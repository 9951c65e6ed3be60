//! Module parameter bundle and its resolution into typed stage configs.
//!
//! A host hands the pipeline a *raw bundle*: `module id → parameter id
//! → value`, plus the set of active module ids. This module turns that
//! into a [`RenderConfig`] of typed per-stage configs:
//!
//! - unknown module ids and unknown parameter ids are silently ignored;
//! - missing parameters fall back to their documented defaults;
//! - a recognized parameter outside its documented range rejects the
//!   run with [`RenderError::InvalidParameter`].
//!
//! `halftone` and `press` have no disabled state: when absent from the
//! active set they resolve to their defaults. Every other module is
//! `None` (its stage becomes a pass-through) unless activated.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::film::FilmStockId;
use crate::halftone::{DotShape, InkChannel, ScreenMode};
use crate::types::RenderError;

/// A single raw parameter value as provided by the host.
///
/// Hosts deal in sliders (numbers) and dropdowns (keywords), so a value
/// is either. Numeric parameters also accept numeric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A numeric value.
    Number(f64),
    /// A keyword, color, or other textual value.
    Text(String),
}

impl ParamValue {
    /// Interpret as a number, parsing numeric text if necessary.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Interpret as text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// Parameters of one module: parameter id → value.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// The full raw bundle: module id → parameter map.
pub type ParamBundle = BTreeMap<String, ParamMap>;

/// The set of active module ids.
pub type ActiveModules = BTreeSet<String>;

// ───────────────────────── press-wide kinds ──────────────────────────

/// The axis along which paper travels through the press.
///
/// Several effects orient along this axis: fan-out stretches *across*
/// it, slur elongates dots *along* it, ink-skip bands and paper fibers
/// run with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedDirection {
    /// Paper travels top-to-bottom.
    #[default]
    Vertical,
    /// Paper travels left-to-right.
    Horizontal,
}

impl fmt::Display for FeedDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertical => f.write_str("vertical"),
            Self::Horizontal => f.write_str("horizontal"),
        }
    }
}

impl FromStr for FeedDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            _ => Err(()),
        }
    }
}

/// The physical order in which plates are pressed onto the paper.
///
/// Later plates multiply over earlier ones, so the sequence is visible
/// wherever inks overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Laydown {
    /// Key first, then cyan, magenta, yellow.
    #[default]
    #[serde(rename = "k-c-m-y")]
    Kcmy,
    /// Yellow, magenta, cyan, key.
    #[serde(rename = "y-m-c-k")]
    Ymck,
    /// Cyan, magenta, yellow, key.
    #[serde(rename = "c-m-y-k")]
    Cmyk,
    /// Magenta, cyan, yellow, key.
    #[serde(rename = "m-c-y-k")]
    Mcyk,
}

impl Laydown {
    /// The press sequence, first plate down first.
    #[must_use]
    pub const fn sequence(self) -> [InkChannel; 4] {
        use InkChannel::{Cyan, Key, Magenta, Yellow};
        match self {
            Self::Kcmy => [Key, Cyan, Magenta, Yellow],
            Self::Ymck => [Yellow, Magenta, Cyan, Key],
            Self::Cmyk => [Cyan, Magenta, Yellow, Key],
            Self::Mcyk => [Magenta, Cyan, Yellow, Key],
        }
    }

    /// Position of a channel within the laydown sequence (0 = first
    /// down).
    #[must_use]
    pub fn position(self, channel: InkChannel) -> usize {
        self.sequence()
            .iter()
            .position(|&c| c == channel)
            .unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Laydown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kcmy => f.write_str("k-c-m-y"),
            Self::Ymck => f.write_str("y-m-c-k"),
            Self::Cmyk => f.write_str("c-m-y-k"),
            Self::Mcyk => f.write_str("m-c-y-k"),
        }
    }
}

impl FromStr for Laydown {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "k-c-m-y" => Ok(Self::Kcmy),
            "y-m-c-k" => Ok(Self::Ymck),
            "c-m-y-k" => Ok(Self::Cmyk),
            "m-c-y-k" => Ok(Self::Mcyk),
            _ => Err(()),
        }
    }
}

// ───────────────────────── per-module configs ────────────────────────

/// Film-stock development (`filmstock` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilmConfig {
    /// Which stock from the catalog to develop with.
    pub stock: FilmStockId,
    /// Exposure compensation in EV, `[-2, 2]`.
    pub exposure: f64,
    /// Halation strength multiplier, `[0, 1]`.
    pub halation: f64,
    /// Age fade, `[0, 1]`.
    pub fade: f64,
}

impl FilmConfig {
    /// Default exposure (EV).
    pub const DEFAULT_EXPOSURE: f64 = 0.0;
    /// Default halation strength.
    pub const DEFAULT_HALATION: f64 = 0.5;
    /// Default fade.
    pub const DEFAULT_FADE: f64 = 0.0;
}

impl Default for FilmConfig {
    fn default() -> Self {
        Self {
            stock: FilmStockId::Kodachrome,
            exposure: Self::DEFAULT_EXPOSURE,
            halation: Self::DEFAULT_HALATION,
            fade: Self::DEFAULT_FADE,
        }
    }
}

/// High-contrast sigmoid crush (`velox` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VeloxConfig {
    /// Sigmoid midpoint, `[0.1, 0.9]`.
    pub threshold: f64,
    /// Sigmoid steepness, `[1.0, 3.0]`.
    pub contrast: f64,
}

impl VeloxConfig {
    /// Default sigmoid midpoint.
    pub const DEFAULT_THRESHOLD: f64 = 0.5;
    /// Default steepness.
    pub const DEFAULT_CONTRAST: f64 = 1.5;
}

impl Default for VeloxConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            contrast: Self::DEFAULT_CONTRAST,
        }
    }
}

/// Additive noise (`grain` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrainConfig {
    /// Noise amplitude, `[0, 0.5]`.
    pub amount: f64,
    /// Weight noise toward the shadows.
    pub weighted: bool,
}

impl GrainConfig {
    /// Default noise amplitude.
    pub const DEFAULT_AMOUNT: f64 = 0.12;
    /// Default shadow weighting.
    pub const DEFAULT_WEIGHTED: bool = true;
}

impl Default for GrainConfig {
    fn default() -> Self {
        Self {
            amount: Self::DEFAULT_AMOUNT,
            weighted: Self::DEFAULT_WEIGHTED,
        }
    }
}

/// Screen geometry and inks (`halftone` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalftoneConfig {
    /// Separation mode.
    pub mode: ScreenMode,
    /// Screen cell size in pixels, `[3, 24]`.
    pub cell_size: u32,
    /// Shape drawn at each screen cell.
    pub dot_shape: DotShape,
    /// Base paper color the plates are pressed onto.
    pub paper_color: Rgb,
    /// Master screen rotation added to every plate angle, `[0, 179]`.
    pub master_angle: i32,
    /// Key plate screen angle, `[0, 179]`.
    pub angle_k: i32,
    /// Cyan plate screen angle, `[0, 179]`.
    pub angle_c: i32,
    /// Magenta plate screen angle, `[0, 179]`.
    pub angle_m: i32,
    /// Yellow plate screen angle, `[0, 179]`.
    pub angle_y: i32,
    /// First duotone ink (also the single `bw` ink).
    pub duotone_color1: Rgb,
    /// Second duotone ink.
    pub duotone_color2: Rgb,
}

impl HalftoneConfig {
    /// Default screen cell size in pixels.
    pub const DEFAULT_CELL_SIZE: u32 = 10;
    /// Default paper color (warm off-white).
    pub const DEFAULT_PAPER_COLOR: Rgb = Rgb::new(0xF0, 0xEA, 0xD8);
    /// Default master rotation.
    pub const DEFAULT_MASTER_ANGLE: i32 = 0;
    /// Default key screen angle.
    pub const DEFAULT_ANGLE_K: i32 = 45;
    /// Default cyan screen angle.
    pub const DEFAULT_ANGLE_C: i32 = 15;
    /// Default magenta screen angle.
    pub const DEFAULT_ANGLE_M: i32 = 75;
    /// Default yellow screen angle.
    pub const DEFAULT_ANGLE_Y: i32 = 90;
    /// Default first duotone ink (also the `bw` ink): pure black.
    pub const DEFAULT_DUOTONE_COLOR1: Rgb = Rgb::new(0, 0, 0);
    /// Default second duotone ink (process magenta).
    pub const DEFAULT_DUOTONE_COLOR2: Rgb = crate::color::INK_MAGENTA;
}

impl Default for HalftoneConfig {
    fn default() -> Self {
        Self {
            mode: ScreenMode::Cmyk,
            cell_size: Self::DEFAULT_CELL_SIZE,
            dot_shape: DotShape::Circle,
            paper_color: Self::DEFAULT_PAPER_COLOR,
            master_angle: Self::DEFAULT_MASTER_ANGLE,
            angle_k: Self::DEFAULT_ANGLE_K,
            angle_c: Self::DEFAULT_ANGLE_C,
            angle_m: Self::DEFAULT_ANGLE_M,
            angle_y: Self::DEFAULT_ANGLE_Y,
            duotone_color1: Self::DEFAULT_DUOTONE_COLOR1,
            duotone_color2: Self::DEFAULT_DUOTONE_COLOR2,
        }
    }
}

/// Press mechanics shared by several stages (`press` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressConfig {
    /// Paper feed axis.
    pub feed: FeedDirection,
    /// Plate laydown sequence.
    pub laydown: Laydown,
    /// Impression pressure, `[0.1, 1.0]`. Below 1.0 the paper tooth
    /// shows through the shadows as mottle.
    pub pressure: f64,
    /// Dot slur along the feed axis, `[0, 0.5]`.
    pub slur: f64,
}

impl PressConfig {
    /// Default impression pressure.
    pub const DEFAULT_PRESSURE: f64 = 1.0;
    /// Default slur.
    pub const DEFAULT_SLUR: f64 = 0.0;
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            feed: FeedDirection::Vertical,
            laydown: Laydown::Kcmy,
            pressure: Self::DEFAULT_PRESSURE,
            slur: Self::DEFAULT_SLUR,
        }
    }
}

/// Midtone dot enlargement (`dotgain` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotGainConfig {
    /// Gain amount, `[0, 1]`, concentrated in the midtones.
    pub amount: f64,
    /// Shadow fill, `[0, 1]`: pushes already-dark cells toward solid.
    pub shadow: f64,
}

impl DotGainConfig {
    /// Default gain amount.
    pub const DEFAULT_AMOUNT: f64 = 0.25;
    /// Default shadow fill.
    pub const DEFAULT_SHADOW: f64 = 0.3;
}

impl Default for DotGainConfig {
    fn default() -> Self {
        Self {
            amount: Self::DEFAULT_AMOUNT,
            shadow: Self::DEFAULT_SHADOW,
        }
    }
}

/// Per-plate registration offsets and fan-out (`registration` module).
///
/// The key plate is the registration reference and has no offset of its
/// own; cyan, magenta and yellow each carry an `(x, y)` offset in
/// pixels, `[-15, 15]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Cyan x offset.
    pub cx: f64,
    /// Cyan y offset.
    pub cy: f64,
    /// Magenta x offset.
    pub mx: f64,
    /// Magenta y offset.
    pub my: f64,
    /// Yellow x offset.
    pub yx: f64,
    /// Yellow y offset.
    pub yy: f64,
    /// Fan-out web stretch in pixels, `[0, 10]`. Later plates stretch
    /// more, orthogonal to the feed axis.
    pub fanout: f64,
}

impl RegistrationConfig {
    /// Registration offset for a channel, `(x, y)` in pixels.
    #[must_use]
    pub const fn offset(&self, channel: InkChannel) -> (f64, f64) {
        match channel {
            InkChannel::Cyan => (self.cx, self.cy),
            InkChannel::Magenta => (self.mx, self.my),
            InkChannel::Yellow => (self.yx, self.yy),
            InkChannel::Key => (0.0, 0.0),
        }
    }
}

/// Seeded ink-starvation bands (`inkskip` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkSkipConfig {
    /// Band strength, `[0, 1]`.
    pub intensity: f64,
    /// Band size relative to the raster, `[0.05, 1]`.
    pub scale: f64,
}

impl InkSkipConfig {
    /// Default band strength.
    pub const DEFAULT_INTENSITY: f64 = 0.3;
    /// Default band scale.
    pub const DEFAULT_SCALE: f64 = 0.4;
}

impl Default for InkSkipConfig {
    fn default() -> Self {
        Self {
            intensity: Self::DEFAULT_INTENSITY,
            scale: Self::DEFAULT_SCALE,
        }
    }
}

/// Paper texture and fiber strokes (`paper` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Base tooth amplitude, `[0, 0.5]`.
    pub texture: f64,
    /// Fiber stroke density, `[0, 0.5]`.
    pub fibers: f64,
}

impl PaperConfig {
    /// Default tooth amplitude.
    pub const DEFAULT_TEXTURE: f64 = 0.15;
    /// Default fiber density.
    pub const DEFAULT_FIBERS: f64 = 0.05;
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            texture: Self::DEFAULT_TEXTURE,
            fibers: Self::DEFAULT_FIBERS,
        }
    }
}

/// Directional wet-ink wicking (`inkbleed` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkBleedConfig {
    /// Bleed radius in pixels, `[1, 16]`.
    pub radius: u32,
    /// Paper absorbency, `[0, 1]`.
    pub absorbency: f64,
    /// How strongly the bleed follows the feed axis, `[0, 1]`.
    pub directionality: f64,
}

impl InkBleedConfig {
    /// Default bleed radius.
    pub const DEFAULT_RADIUS: u32 = 3;
    /// Default absorbency.
    pub const DEFAULT_ABSORBENCY: f64 = 0.8;
    /// Default directionality.
    pub const DEFAULT_DIRECTIONALITY: f64 = 0.7;
}

impl Default for InkBleedConfig {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
            absorbency: Self::DEFAULT_ABSORBENCY,
            directionality: Self::DEFAULT_DIRECTIONALITY,
        }
    }
}

/// Donut-shaped blanket defects (`hickeys` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HickeysConfig {
    /// Defects per plate, `[1, 100]`.
    pub count: u32,
    /// Maximum outer radius in pixels, `[3, 30]`.
    pub size_max: u32,
}

impl HickeysConfig {
    /// Default defect count.
    pub const DEFAULT_COUNT: u32 = 12;
    /// Default maximum outer radius.
    pub const DEFAULT_SIZE_MAX: u32 = 8;
}

impl Default for HickeysConfig {
    fn default() -> Self {
        Self {
            count: Self::DEFAULT_COUNT,
            size_max: Self::DEFAULT_SIZE_MAX,
        }
    }
}

// ───────────────────────── resolved config ───────────────────────────

/// The fully resolved configuration for one render run.
///
/// Optional modules are `None` when absent from the active set;
/// `halftone` and `press` are always present (defaulted when the host
/// did not activate them).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Film development, or `None` to pass through.
    pub film: Option<FilmConfig>,
    /// Velox crush, or `None` to pass through.
    pub velox: Option<VeloxConfig>,
    /// Grain, or `None` to pass through.
    pub grain: Option<GrainConfig>,
    /// Screen geometry. Always applied.
    pub halftone: HalftoneConfig,
    /// Press mechanics. Always applied.
    pub press: PressConfig,
    /// Dot gain, or `None` for geometrically exact dots.
    pub dot_gain: Option<DotGainConfig>,
    /// Registration error, or `None` for perfect register.
    pub registration: Option<RegistrationConfig>,
    /// Ink skip, or `None` for even inking.
    pub ink_skip: Option<InkSkipConfig>,
    /// Paper tooth, or `None` for smooth paper.
    pub paper: Option<PaperConfig>,
    /// Ink bleed, or `None` for dry-crisp dots.
    pub bleed: Option<InkBleedConfig>,
    /// Hickeys, or `None` for a clean blanket.
    pub hickeys: Option<HickeysConfig>,
}

impl RenderConfig {
    /// Resolve the raw bundle into typed configs.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidParameter`] if any recognized
    /// parameter is outside its documented range or malformed (e.g. a
    /// color that is not `#rrggbb`).
    pub fn resolve(active: &ActiveModules, params: &ParamBundle) -> Result<Self, RenderError> {
        let module = |id: &str| params.get(id);
        let wants = |id: &str| active.contains(id);

        Ok(Self {
            film: wants("filmstock")
                .then(|| resolve_film(module("filmstock")))
                .transpose()?,
            velox: wants("velox")
                .then(|| resolve_velox(module("velox")))
                .transpose()?,
            grain: wants("grain")
                .then(|| resolve_grain(module("grain")))
                .transpose()?,
            halftone: resolve_halftone(module("halftone"))?,
            press: resolve_press(module("press"))?,
            dot_gain: wants("dotgain")
                .then(|| resolve_dot_gain(module("dotgain")))
                .transpose()?,
            registration: wants("registration")
                .then(|| resolve_registration(module("registration")))
                .transpose()?,
            ink_skip: wants("inkskip")
                .then(|| resolve_ink_skip(module("inkskip")))
                .transpose()?,
            paper: wants("paper")
                .then(|| resolve_paper(module("paper")))
                .transpose()?,
            bleed: wants("inkbleed")
                .then(|| resolve_bleed(module("inkbleed")))
                .transpose()?,
            hickeys: wants("hickeys")
                .then(|| resolve_hickeys(module("hickeys")))
                .transpose()?,
        })
    }
}

// ─────────────────────── parameter readers ───────────────────────────

fn out_of_range(module: &str, key: &str, value: impl fmt::Display, range: &str) -> RenderError {
    RenderError::InvalidParameter(format!("{module}.{key} = {value} is outside {range}"))
}

/// Read a float parameter, defaulting when missing, rejecting when out
/// of range. Numeric text is accepted; non-numeric text is rejected.
fn number(
    map: Option<&ParamMap>,
    module: &str,
    key: &str,
    default: f64,
    range: RangeInclusive<f64>,
) -> Result<f64, RenderError> {
    let Some(value) = map.and_then(|m| m.get(key)) else {
        return Ok(default);
    };
    let Some(n) = value.as_f64() else {
        return Err(RenderError::InvalidParameter(format!(
            "{module}.{key} must be a number"
        )));
    };
    if !range.contains(&n) {
        return Err(out_of_range(
            module,
            key,
            n,
            &format!("[{}, {}]", range.start(), range.end()),
        ));
    }
    Ok(n)
}

/// Read an integer parameter (stored as a number, rounded).
fn integer(
    map: Option<&ParamMap>,
    module: &str,
    key: &str,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, RenderError> {
    let n = number(
        map,
        module,
        key,
        default as f64,
        *range.start() as f64..=*range.end() as f64,
    )?;
    Ok(n.round() as i64)
}

/// Read a keyword parameter via `FromStr`.
fn keyword<T: FromStr + Copy>(
    map: Option<&ParamMap>,
    module: &str,
    key: &str,
    default: T,
    allowed: &str,
) -> Result<T, RenderError> {
    let Some(value) = map.and_then(|m| m.get(key)) else {
        return Ok(default);
    };
    value
        .as_text()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            RenderError::InvalidParameter(format!("{module}.{key} must be one of {allowed}"))
        })
}

/// Read a `#rrggbb` color parameter.
fn color(
    map: Option<&ParamMap>,
    module: &str,
    key: &str,
    default: Rgb,
) -> Result<Rgb, RenderError> {
    let Some(value) = map.and_then(|m| m.get(key)) else {
        return Ok(default);
    };
    value
        .as_text()
        .and_then(Rgb::parse_hex)
        .ok_or_else(|| {
            RenderError::InvalidParameter(format!("{module}.{key} must be a #rrggbb color"))
        })
}

/// Read an on/off toggle parameter.
fn toggle(
    map: Option<&ParamMap>,
    module: &str,
    key: &str,
    default: bool,
) -> Result<bool, RenderError> {
    let Some(value) = map.and_then(|m| m.get(key)) else {
        return Ok(default);
    };
    match value {
        ParamValue::Text(s) if s == "on" => Ok(true),
        ParamValue::Text(s) if s == "off" => Ok(false),
        ParamValue::Number(n) => Ok(*n != 0.0),
        ParamValue::Text(_) => Err(RenderError::InvalidParameter(format!(
            "{module}.{key} must be \"on\" or \"off\""
        ))),
    }
}

// ─────────────────────── per-module resolvers ────────────────────────

fn resolve_film(map: Option<&ParamMap>) -> Result<FilmConfig, RenderError> {
    Ok(FilmConfig {
        stock: keyword(
            map,
            "filmstock",
            "stock",
            FilmStockId::Kodachrome,
            "trix, hp5, kodachrome, portra, ektachrome",
        )?,
        exposure: number(
            map,
            "filmstock",
            "exposure",
            FilmConfig::DEFAULT_EXPOSURE,
            -2.0..=2.0,
        )?,
        halation: number(
            map,
            "filmstock",
            "halation",
            FilmConfig::DEFAULT_HALATION,
            0.0..=1.0,
        )?,
        fade: number(map, "filmstock", "fade", FilmConfig::DEFAULT_FADE, 0.0..=1.0)?,
    })
}

fn resolve_velox(map: Option<&ParamMap>) -> Result<VeloxConfig, RenderError> {
    Ok(VeloxConfig {
        threshold: number(
            map,
            "velox",
            "threshold",
            VeloxConfig::DEFAULT_THRESHOLD,
            0.1..=0.9,
        )?,
        contrast: number(
            map,
            "velox",
            "contrast",
            VeloxConfig::DEFAULT_CONTRAST,
            1.0..=3.0,
        )?,
    })
}

fn resolve_grain(map: Option<&ParamMap>) -> Result<GrainConfig, RenderError> {
    Ok(GrainConfig {
        amount: number(map, "grain", "amount", GrainConfig::DEFAULT_AMOUNT, 0.0..=0.5)?,
        weighted: toggle(map, "grain", "weighted", GrainConfig::DEFAULT_WEIGHTED)?,
    })
}

fn resolve_halftone(map: Option<&ParamMap>) -> Result<HalftoneConfig, RenderError> {
    let angle = |key, default| integer(map, "halftone", key, default, 0..=179);
    Ok(HalftoneConfig {
        mode: keyword(map, "halftone", "mode", ScreenMode::Cmyk, "bw, duotone, cmyk")?,
        cell_size: integer(
            map,
            "halftone",
            "cellSize",
            i64::from(HalftoneConfig::DEFAULT_CELL_SIZE),
            3..=24,
        )? as u32,
        dot_shape: keyword(
            map,
            "halftone",
            "dotShape",
            DotShape::Circle,
            "circle, diamond, line",
        )?,
        paper_color: color(
            map,
            "halftone",
            "paperColor",
            HalftoneConfig::DEFAULT_PAPER_COLOR,
        )?,
        master_angle: angle("masterAngle", i64::from(HalftoneConfig::DEFAULT_MASTER_ANGLE))? as i32,
        angle_k: angle("angleK", i64::from(HalftoneConfig::DEFAULT_ANGLE_K))? as i32,
        angle_c: angle("angleC", i64::from(HalftoneConfig::DEFAULT_ANGLE_C))? as i32,
        angle_m: angle("angleM", i64::from(HalftoneConfig::DEFAULT_ANGLE_M))? as i32,
        angle_y: angle("angleY", i64::from(HalftoneConfig::DEFAULT_ANGLE_Y))? as i32,
        duotone_color1: color(
            map,
            "halftone",
            "duotoneColor1",
            HalftoneConfig::DEFAULT_DUOTONE_COLOR1,
        )?,
        duotone_color2: color(
            map,
            "halftone",
            "duotoneColor2",
            HalftoneConfig::DEFAULT_DUOTONE_COLOR2,
        )?,
    })
}

fn resolve_press(map: Option<&ParamMap>) -> Result<PressConfig, RenderError> {
    Ok(PressConfig {
        feed: keyword(
            map,
            "press",
            "feed",
            FeedDirection::Vertical,
            "vertical, horizontal",
        )?,
        laydown: keyword(
            map,
            "press",
            "laydown",
            Laydown::Kcmy,
            "k-c-m-y, y-m-c-k, c-m-y-k, m-c-y-k",
        )?,
        pressure: number(
            map,
            "press",
            "pressure",
            PressConfig::DEFAULT_PRESSURE,
            0.1..=1.0,
        )?,
        slur: number(map, "press", "slur", PressConfig::DEFAULT_SLUR, 0.0..=0.5)?,
    })
}

fn resolve_dot_gain(map: Option<&ParamMap>) -> Result<DotGainConfig, RenderError> {
    Ok(DotGainConfig {
        amount: number(
            map,
            "dotgain",
            "amount",
            DotGainConfig::DEFAULT_AMOUNT,
            0.0..=1.0,
        )?,
        shadow: number(
            map,
            "dotgain",
            "shadow",
            DotGainConfig::DEFAULT_SHADOW,
            0.0..=1.0,
        )?,
    })
}

fn resolve_registration(map: Option<&ParamMap>) -> Result<RegistrationConfig, RenderError> {
    let offset = |key| number(map, "registration", key, 0.0, -15.0..=15.0);
    Ok(RegistrationConfig {
        cx: offset("cx")?,
        cy: offset("cy")?,
        mx: offset("mx")?,
        my: offset("my")?,
        yx: offset("yx")?,
        yy: offset("yy")?,
        fanout: number(map, "registration", "fanout", 0.0, 0.0..=10.0)?,
    })
}

fn resolve_ink_skip(map: Option<&ParamMap>) -> Result<InkSkipConfig, RenderError> {
    Ok(InkSkipConfig {
        intensity: number(
            map,
            "inkskip",
            "intensity",
            InkSkipConfig::DEFAULT_INTENSITY,
            0.0..=1.0,
        )?,
        scale: number(
            map,
            "inkskip",
            "scale",
            InkSkipConfig::DEFAULT_SCALE,
            0.05..=1.0,
        )?,
    })
}

fn resolve_paper(map: Option<&ParamMap>) -> Result<PaperConfig, RenderError> {
    Ok(PaperConfig {
        texture: number(
            map,
            "paper",
            "texture",
            PaperConfig::DEFAULT_TEXTURE,
            0.0..=0.5,
        )?,
        fibers: number(map, "paper", "fibers", PaperConfig::DEFAULT_FIBERS, 0.0..=0.5)?,
    })
}

fn resolve_bleed(map: Option<&ParamMap>) -> Result<InkBleedConfig, RenderError> {
    Ok(InkBleedConfig {
        radius: integer(
            map,
            "inkbleed",
            "radius",
            i64::from(InkBleedConfig::DEFAULT_RADIUS),
            1..=16,
        )? as u32,
        absorbency: number(
            map,
            "inkbleed",
            "absorbency",
            InkBleedConfig::DEFAULT_ABSORBENCY,
            0.0..=1.0,
        )?,
        directionality: number(
            map,
            "inkbleed",
            "directionality",
            InkBleedConfig::DEFAULT_DIRECTIONALITY,
            0.0..=1.0,
        )?,
    })
}

fn resolve_hickeys(map: Option<&ParamMap>) -> Result<HickeysConfig, RenderError> {
    Ok(HickeysConfig {
        count: integer(
            map,
            "hickeys",
            "count",
            i64::from(HickeysConfig::DEFAULT_COUNT),
            1..=100,
        )? as u32,
        size_max: integer(
            map,
            "hickeys",
            "sizeMax",
            i64::from(HickeysConfig::DEFAULT_SIZE_MAX),
            3..=30,
        )? as u32,
    })
}
