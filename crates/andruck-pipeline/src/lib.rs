//! andruck-pipeline: offset-press print simulation (sans-IO).
//!
//! Renders a source raster as if it had been photographed on film,
//! screened to halftone, and pressed onto paper by a multi-plate
//! offset press:
//!
//! resample -> film stock -> velox -> grain ->
//! halftone screening -> ink bleed -> paper tooth.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! RGBA buffers and returns structured data. Image decode/encode,
//! file handling, and the control surface live in the host crates.
//!
//! Stages are optional: a module absent from the active set is a
//! perfect no-op. The `halftone` and `press` modules have no disabled
//! state and fall back to their defaults, so even an empty active set
//! produces a screened sheet, not the source image. Seeded effects
//! (ink skip, hickeys, paper tooth) are reproducible bit-for-bit;
//! grain is deliberately unseeded.

pub mod bleed;
pub mod blur;
pub mod color;
pub mod diagnostics;
pub mod film;
pub mod grain;
pub mod halftone;
pub mod inkskip;
pub mod paper;
pub mod params;
pub mod pipeline;
pub mod plate;
pub mod resample;
pub mod rng;
pub mod types;
pub mod velox;

pub use color::Rgb;
pub use diagnostics::{PipelineDiagnostics, StageDiagnostics, StageMetrics};
pub use film::FilmStockId;
pub use halftone::{DotShape, InkChannel, ScreenMode};
pub use params::{
    ActiveModules, FeedDirection, Laydown, ParamBundle, ParamValue, RenderConfig,
};
pub use pipeline::{Advance, Pipeline, RenderCache, Stage};
pub use types::{Dimensions, RenderError, RenderOptions, RgbaImage, StagedResult};

/// Run the full pipeline, preserving every intermediate raster.
///
/// Resolves the raw parameter bundle against the active module set
/// (unknown entries ignored, missing entries defaulted), then drives
/// all stages and returns a [`StagedResult`] with each stage's output
/// and the run diagnostics.
///
/// # Errors
///
/// Returns [`RenderError::EmptyInput`] for a zero-dimension source,
/// [`RenderError::InvalidParameter`] for out-of-range parameters or
/// options, [`RenderError::Resource`] for an export too large to
/// allocate, and [`RenderError::DimensionMismatch`] if a stage breaks
/// the size invariant.
pub fn render_staged(
    source: &RgbaImage,
    active: &ActiveModules,
    params: &ParamBundle,
    options: &RenderOptions,
) -> Result<StagedResult, RenderError> {
    let config = RenderConfig::resolve(active, params)?;
    render_staged_with(source, &config, options)
}

/// Run the full pipeline from an already-resolved [`RenderConfig`].
///
/// # Errors
///
/// Same as [`render_staged`], minus the parameter-resolution errors.
pub fn render_staged_with(
    source: &RgbaImage,
    config: &RenderConfig,
    options: &RenderOptions,
) -> Result<StagedResult, RenderError> {
    let mut stage: Stage = Pipeline::new(source.clone(), config.clone(), *options).into();
    loop {
        match stage.advance()? {
            Advance::Next(next) => stage = next,
            Advance::Complete(done) => break Ok(done.into_result()),
        }
    }
}

/// Run the full pipeline and return only the finished raster.
///
/// This is a convenience wrapper around [`render_staged`] that
/// discards the intermediates.
///
/// # Errors
///
/// Same as [`render_staged`].
pub fn render(
    source: &RgbaImage,
    active: &ActiveModules,
    params: &ParamBundle,
    options: &RenderOptions,
) -> Result<RgbaImage, RenderError> {
    Ok(render_staged(source, active, params, options)?.output)
}
