//! Shared types for the andruck rendering pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::PipelineDiagnostics;

/// Re-export `RgbaImage` so downstream crates can hold rasters without
/// depending on `image` directly. All pipeline stages consume and
/// produce this type; the alpha channel is carried through untouched.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of a raster.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output-scale options for a render run.
///
/// The same pipeline serves three request shapes: a bounded preview, a
/// full-resolution loupe sample, and a full-resolution export. The only
/// difference between them is the pre-stage resample controlled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Export mode: apply `upscale` instead of the preview clamp.
    pub for_export: bool,
    /// Preview clamp: the longest axis of the working raster will not
    /// exceed this many pixels. Ignored when `for_export` is set.
    pub preview_max_px: u32,
    /// Integer export upscale factor (`>= 1`; `1` means native size).
    /// Ignored unless `for_export` is set.
    pub upscale: u32,
}

impl RenderOptions {
    /// Default preview clamp for the longest raster axis.
    pub const DEFAULT_PREVIEW_MAX_PX: u32 = 1400;

    /// Options for a clamped preview render.
    #[must_use]
    pub const fn preview(preview_max_px: u32) -> Self {
        Self {
            for_export: false,
            preview_max_px,
            upscale: 1,
        }
    }

    /// Options for a full-resolution export render.
    #[must_use]
    pub const fn export(upscale: u32) -> Self {
        Self {
            for_export: true,
            preview_max_px: Self::DEFAULT_PREVIEW_MAX_PX,
            upscale,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::preview(Self::DEFAULT_PREVIEW_MAX_PX)
    }
}

/// Errors a render run can produce.
///
/// The variants follow the error taxonomy of the rendering contract:
/// invalid input rejects the run, resource exhaustion fails it, and a
/// stage changing the raster's dimensions is an internal invariant
/// violation that aborts it. Unknown modules or parameters are *not*
/// errors — they silently fall back to defaults during resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum RenderError {
    /// The source raster has zero width or height.
    #[error("source raster is empty (zero width or height)")]
    EmptyInput,

    /// A recognized parameter was outside its documented range, or an
    /// option was malformed (e.g. a non-hex color, upscale of zero).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A working buffer could not be allocated.
    #[error("buffer allocation failed: {0}")]
    Resource(String),

    /// A stage produced a raster of different dimensions than its
    /// input. Fatal: the run is aborted and no result is emitted.
    #[error("stage '{stage}' changed raster dimensions from {expected} to {actual}")]
    DimensionMismatch {
        /// Name of the offending stage.
        stage: String,
        /// Dimensions going into the stage.
        expected: Dimensions,
        /// Dimensions coming out of the stage.
        actual: Dimensions,
    },
}

/// The full output of a staged render: every intermediate raster, the
/// final output, and the diagnostics collected along the way.
///
/// Retaining all intermediates lets a host display any stage in a
/// split view or magnifier without re-running the pipeline. For a
/// 1400px preview this pins roughly 8 MB per retained stage; callers
/// that only need the finished raster should use
/// [`render`](crate::render), which discards the intermediates.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// The working raster after the pre-stage resample (never the
    /// caller's buffer; always a copy).
    pub resampled: RgbaImage,
    /// After film-stock development (equal to `resampled` when the
    /// module is inactive).
    pub developed: RgbaImage,
    /// After the velox crush.
    pub veloxed: RgbaImage,
    /// After grain.
    pub grained: RgbaImage,
    /// After halftone screening and plate composition.
    pub screened: RgbaImage,
    /// After ink bleed.
    pub bled: RgbaImage,
    /// The finished raster, after paper tooth.
    pub output: RgbaImage,
    /// Dimensions shared by every raster above.
    pub dimensions: Dimensions,
    /// Per-stage timing and metrics.
    pub diagnostics: PipelineDiagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_of_matches_image() {
        let img = RgbaImage::new(17, 31);
        let d = Dimensions::of(&img);
        assert_eq!(d.width, 17);
        assert_eq!(d.height, 31);
        assert_eq!(d.pixel_count(), 17 * 31);
    }

    #[test]
    fn dimensions_display_is_w_x_h() {
        let d = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(d.to_string(), "640x480");
    }

    #[test]
    fn default_options_are_preview() {
        let opts = RenderOptions::default();
        assert!(!opts.for_export);
        assert_eq!(opts.upscale, 1);
    }

    #[test]
    fn error_round_trips_through_json() {
        let err = RenderError::DimensionMismatch {
            stage: "halftone".into(),
            expected: Dimensions {
                width: 10,
                height: 10,
            },
            actual: Dimensions {
                width: 10,
                height: 9,
            },
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: RenderError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn error_display_names_the_stage() {
        let err = RenderError::DimensionMismatch {
            stage: "bleed".into(),
            expected: Dimensions {
                width: 4,
                height: 4,
            },
            actual: Dimensions {
                width: 5,
                height: 4,
            },
        };
        assert!(err.to_string().contains("bleed"));
        assert!(err.to_string().contains("4x4"));
    }
}
