//! Pipeline diagnostics: timing and counts for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter experimentation and performance work. Every staged render
//! collects them alongside the pipeline results.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since [`std::time::Duration`] does not implement
//! serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single render run.
///
/// Stages that were skipped (their module absent from the active set)
/// have `Option` fields that are `None`. The halftone/press pair and
/// the resample always run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: pre-stage resample.
    pub resample: StageDiagnostics,
    /// Stage 1: film-stock development (only when `filmstock` active).
    pub film: Option<StageDiagnostics>,
    /// Stage 2: velox crush (only when `velox` active).
    pub velox: Option<StageDiagnostics>,
    /// Stage 3: grain (only when `grain` active).
    pub grain: Option<StageDiagnostics>,
    /// Stage 4: halftone screening and plate composition.
    pub halftone: StageDiagnostics,
    /// Stage 5: ink bleed (only when `inkbleed` active).
    pub bleed: Option<StageDiagnostics>,
    /// Stage 6: paper tooth (only when `paper` active).
    pub paper: Option<StageDiagnostics>,
    /// Total wall-clock duration of the run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the run.
    pub summary: RunSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Pre-stage resample.
    Resample {
        /// Source dimensions.
        from: Dimensions,
        /// Working dimensions.
        to: Dimensions,
        /// Whether any rescale actually happened.
        applied: bool,
    },
    /// Film development.
    Film {
        /// Stock id developed with.
        stock: String,
    },
    /// Velox crush (LUT only, nothing to count).
    Velox,
    /// Grain.
    Grain,
    /// Halftone screening.
    Halftone {
        /// Plates rasterized.
        plates: usize,
        /// Total dots drawn across plates.
        dots: usize,
    },
    /// Ink bleed.
    Bleed {
        /// Kernel radius in pixels.
        radius: u32,
    },
    /// Paper tooth.
    Paper {
        /// Fiber strokes drawn into the paper map.
        fibers: usize,
    },
}

/// Summary counts for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Output dimensions.
    pub dimensions: Dimensions,
    /// Output pixel count.
    pub pixel_count: u64,
    /// Plates pressed.
    pub plates: usize,
}
