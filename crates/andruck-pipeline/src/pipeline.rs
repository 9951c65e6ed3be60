//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate raster before continuing.
//!
//! Unlike [`crate::render_staged`] which runs the entire pipeline in
//! one call, [`Pipeline`] lets the caller drive execution one step at
//! a time:
//!
//! ```rust
//! # use andruck_pipeline::{Pipeline, RenderConfig, RenderError, RenderOptions};
//! # use andruck_pipeline::types::RgbaImage;
//! # fn run(source: RgbaImage) -> Result<(), RenderError> {
//! let staged = Pipeline::new(source, RenderConfig::default(), RenderOptions::default())
//!     .resample()?
//!     .develop()?
//!     .crush()?
//!     .grain()?
//!     .screen()?
//!     .bleed()?
//!     .tooth()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state, carrying all previously computed intermediates. A stage
//! whose module is absent from the resolved config is a pass-through:
//! its output is its input and its diagnostics slot stays `None`.
//!
//! Every transition re-checks the dimension invariant — a stage that
//! changes the raster's size aborts the run with
//! [`RenderError::DimensionMismatch`] rather than emitting a partial
//! result.
//!
//! # Memory
//!
//! Every stage retains the full raster stack computed so far. For a
//! 1400px preview that is roughly 8 MB per stage pinned until
//! [`Output::into_result`] hands everything to the caller. This is
//! intentional: [`StagedResult`] needs every intermediate for
//! split-view display, and [`RenderCache`] needs them to restart a
//! re-render at the earliest changed stage.

use std::time::Instant;

use crate::diagnostics::{PipelineDiagnostics, RunSummary, StageDiagnostics, StageMetrics};
use crate::halftone::{screen as screen_plates, ScreenContext};
use crate::params::RenderConfig;
use crate::types::{Dimensions, RenderError, RenderOptions, RgbaImage, StagedResult};
use crate::{bleed as bleed_mod, film, grain as grain_mod, paper, resample, velox};

/// Total number of pipeline states (`Pending` through `Output`).
pub const STAGE_COUNT: usize = 8;

/// Upper bound on output pixels; beyond this the allocation for the
/// raster stack is rejected up front instead of aborting mid-run.
const MAX_OUTPUT_PIXELS: u64 = 1 << 28;

// Stage indices used by the cache's earliest-changed computation.
const STAGE_RESAMPLE: usize = 0;
const STAGE_FILM: usize = 1;
const STAGE_VELOX: usize = 2;
const STAGE_GRAIN: usize = 3;
const STAGE_HALFTONE: usize = 4;
const STAGE_BLEED: usize = 5;
const STAGE_PAPER: usize = 6;
/// Sentinel: no stage changed, the cached result can be returned as-is.
const STAGE_NOTHING: usize = 7;

/// Reuse plan attached to a run restarted from a cache: stages with an
/// index below `earliest` clone their raster and diagnostics from the
/// prior result instead of recomputing.
struct ReusePlan {
    prior: StagedResult,
    earliest: usize,
}

/// State threaded through every stage of one run.
struct RunState {
    config: RenderConfig,
    started: Instant,
    reuse: Option<ReusePlan>,
}

impl RunState {
    /// The prior result, if this stage may be served from it.
    fn reusable(&self, stage: usize) -> Option<&StagedResult> {
        self.reuse
            .as_ref()
            .filter(|plan| stage < plan.earliest)
            .map(|plan| &plan.prior)
    }
}

/// Check the dimension invariant after a stage.
fn ensure_dims(stage: &str, expected: Dimensions, output: &RgbaImage) -> Result<(), RenderError> {
    let actual = Dimensions::of(output);
    if actual == expected {
        Ok(())
    } else {
        Err(RenderError::DimensionMismatch {
            stage: stage.to_owned(),
            expected,
            actual,
        })
    }
}

/// Time a stage body and wrap its metrics.
fn timed<F: FnOnce() -> (RgbaImage, StageMetrics)>(f: F) -> (RgbaImage, StageDiagnostics) {
    let start = Instant::now();
    let (image, metrics) = f();
    (
        image,
        StageDiagnostics {
            duration: start.elapsed(),
            metrics,
        },
    )
}

/// Entry point for constructing a pipeline run.
pub struct Pipeline;

impl Pipeline {
    /// Begin a run over `source` with a resolved config.
    ///
    /// The source buffer is owned by the run and never mutated; the
    /// first stage copies or rescales it.
    #[must_use]
    pub fn new(source: RgbaImage, config: RenderConfig, options: RenderOptions) -> Pending {
        Pending {
            source,
            config,
            options,
            reuse: None,
        }
    }

    /// Begin a run that may reuse intermediates from a prior result.
    fn with_reuse(
        source: RgbaImage,
        config: RenderConfig,
        options: RenderOptions,
        reuse: Option<ReusePlan>,
    ) -> Pending {
        Pending {
            source,
            config,
            options,
            reuse,
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing — call .resample() to continue"]
pub struct Pending {
    source: RgbaImage,
    config: RenderConfig,
    options: RenderOptions,
    reuse: Option<ReusePlan>,
}

impl Pending {
    /// The source raster.
    #[must_use]
    pub const fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// Validate the input and produce the working raster.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyInput`] for a zero-dimension source,
    /// [`RenderError::InvalidParameter`] for a zero `upscale` or
    /// `preview_max_px`, and [`RenderError::Resource`] when the
    /// requested export size is beyond what the run will allocate.
    pub fn resample(self) -> Result<Resampled, RenderError> {
        let started = Instant::now();
        let source_dims = Dimensions::of(&self.source);
        if source_dims.width == 0 || source_dims.height == 0 {
            return Err(RenderError::EmptyInput);
        }
        if self.options.upscale == 0 {
            return Err(RenderError::InvalidParameter(
                "options.upscale must be at least 1".into(),
            ));
        }
        if self.options.preview_max_px == 0 {
            return Err(RenderError::InvalidParameter(
                "options.preview_max_px must be at least 1".into(),
            ));
        }
        if self.options.for_export {
            let target =
                source_dims.pixel_count() * u64::from(self.options.upscale).pow(2);
            if target > MAX_OUTPUT_PIXELS {
                return Err(RenderError::Resource(format!(
                    "export of {target} pixels exceeds the {MAX_OUTPUT_PIXELS} pixel limit"
                )));
            }
        }

        let run = RunState {
            config: self.config,
            started,
            reuse: self.reuse,
        };

        let (resampled, diag_resample) =
            if let Some(prior) = run.reusable(STAGE_RESAMPLE) {
                (prior.resampled.clone(), prior.diagnostics.resample.clone())
            } else {
                timed(|| {
                    let (image, applied) = resample::resample(&self.source, &self.options);
                    let metrics = StageMetrics::Resample {
                        from: source_dims,
                        to: Dimensions::of(&image),
                        applied,
                    };
                    (image, metrics)
                })
            };

        Ok(Resampled {
            run,
            resampled,
            diag_resample,
        })
    }
}

// ──────────────────────── Stage 1: Resampled ─────────────────────────

/// Working raster produced; film development is next.
#[must_use = "pipeline stages are consumed by advancing — call .develop() to continue"]
pub struct Resampled {
    run: RunState,
    resampled: RgbaImage,
    diag_resample: StageDiagnostics,
}

impl Resampled {
    /// The working raster.
    #[must_use]
    pub const fn resampled(&self) -> &RgbaImage {
        &self.resampled
    }

    /// Develop through the film stock, or pass through when the
    /// `filmstock` module is inactive.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DimensionMismatch`] if the stage output
    /// changes size.
    pub fn develop(self) -> Result<Developed, RenderError> {
        let dims = Dimensions::of(&self.resampled);
        let (developed, diag_film) = if let Some(prior) = self.run.reusable(STAGE_FILM) {
            (prior.developed.clone(), prior.diagnostics.film.clone())
        } else {
            match &self.run.config.film {
                Some(cfg) => {
                    let (image, diag) = timed(|| {
                        (
                            film::develop(&self.resampled, cfg),
                            StageMetrics::Film {
                                stock: cfg.stock.to_string(),
                            },
                        )
                    });
                    (image, Some(diag))
                }
                None => (self.resampled.clone(), None),
            }
        };
        ensure_dims("film", dims, &developed)?;

        Ok(Developed {
            run: self.run,
            resampled: self.resampled,
            developed,
            diag_resample: self.diag_resample,
            diag_film,
        })
    }
}

// ──────────────────────── Stage 2: Developed ─────────────────────────

/// Film development done; the velox crush is next.
#[must_use = "pipeline stages are consumed by advancing — call .crush() to continue"]
pub struct Developed {
    run: RunState,
    resampled: RgbaImage,
    developed: RgbaImage,
    diag_resample: StageDiagnostics,
    diag_film: Option<StageDiagnostics>,
}

impl Developed {
    /// The developed raster.
    #[must_use]
    pub const fn developed(&self) -> &RgbaImage {
        &self.developed
    }

    /// Apply the velox crush, or pass through when inactive.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DimensionMismatch`] if the stage output
    /// changes size.
    pub fn crush(self) -> Result<Veloxed, RenderError> {
        let dims = Dimensions::of(&self.developed);
        let (veloxed, diag_velox) = if let Some(prior) = self.run.reusable(STAGE_VELOX) {
            (prior.veloxed.clone(), prior.diagnostics.velox.clone())
        } else {
            match &self.run.config.velox {
                Some(cfg) => {
                    let (image, diag) =
                        timed(|| (velox::crush(&self.developed, cfg), StageMetrics::Velox));
                    (image, Some(diag))
                }
                None => (self.developed.clone(), None),
            }
        };
        ensure_dims("velox", dims, &veloxed)?;

        Ok(Veloxed {
            run: self.run,
            resampled: self.resampled,
            developed: self.developed,
            veloxed,
            diag_resample: self.diag_resample,
            diag_film: self.diag_film,
            diag_velox,
        })
    }
}

// ───────────────────────── Stage 3: Veloxed ──────────────────────────

/// Velox done; grain is next.
#[must_use = "pipeline stages are consumed by advancing — call .grain() to continue"]
pub struct Veloxed {
    run: RunState,
    resampled: RgbaImage,
    developed: RgbaImage,
    veloxed: RgbaImage,
    diag_resample: StageDiagnostics,
    diag_film: Option<StageDiagnostics>,
    diag_velox: Option<StageDiagnostics>,
}

impl Veloxed {
    /// Add grain, or pass through when inactive.
    ///
    /// Grain draws from an unseeded generator: two otherwise identical
    /// runs produce different speckle here (unless served from cache).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DimensionMismatch`] if the stage output
    /// changes size.
    pub fn grain(self) -> Result<Grained, RenderError> {
        let dims = Dimensions::of(&self.veloxed);
        let (grained, diag_grain) = if let Some(prior) = self.run.reusable(STAGE_GRAIN) {
            (prior.grained.clone(), prior.diagnostics.grain.clone())
        } else {
            match &self.run.config.grain {
                Some(cfg) => {
                    let (image, diag) =
                        timed(|| (grain_mod::apply(&self.veloxed, cfg), StageMetrics::Grain));
                    (image, Some(diag))
                }
                None => (self.veloxed.clone(), None),
            }
        };
        ensure_dims("grain", dims, &grained)?;

        Ok(Grained {
            run: self.run,
            resampled: self.resampled,
            developed: self.developed,
            veloxed: self.veloxed,
            grained,
            diag_resample: self.diag_resample,
            diag_film: self.diag_film,
            diag_velox: self.diag_velox,
            diag_grain,
        })
    }
}

// ───────────────────────── Stage 4: Grained ──────────────────────────

/// Grain done; halftone screening is next.
#[must_use = "pipeline stages are consumed by advancing — call .screen() to continue"]
pub struct Grained {
    run: RunState,
    resampled: RgbaImage,
    developed: RgbaImage,
    veloxed: RgbaImage,
    grained: RgbaImage,
    diag_resample: StageDiagnostics,
    diag_film: Option<StageDiagnostics>,
    diag_velox: Option<StageDiagnostics>,
    diag_grain: Option<StageDiagnostics>,
}

impl Grained {
    /// The pre-halftone raster — the last continuous-tone buffer, which
    /// screening consumes as sample data.
    #[must_use]
    pub const fn continuous_tone(&self) -> &RgbaImage {
        &self.grained
    }

    /// Screen into plates and press them onto the paper base.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DimensionMismatch`] if the stage output
    /// changes size.
    pub fn screen(self) -> Result<Screened, RenderError> {
        let dims = Dimensions::of(&self.grained);
        let (screened, plates, diag_halftone) =
            if let Some(prior) = self.run.reusable(STAGE_HALFTONE) {
                (
                    prior.screened.clone(),
                    prior.diagnostics.summary.plates,
                    prior.diagnostics.halftone.clone(),
                )
            } else {
                let config = &self.run.config;
                let ctx = ScreenContext {
                    halftone: &config.halftone,
                    press: &config.press,
                    dot_gain: config.dot_gain.as_ref(),
                    registration: config.registration.as_ref(),
                    ink_skip: config.ink_skip.as_ref(),
                    hickeys: config.hickeys.as_ref(),
                };
                let start = Instant::now();
                let (image, stats) = screen_plates(&self.grained, &ctx);
                let diag = StageDiagnostics {
                    duration: start.elapsed(),
                    metrics: StageMetrics::Halftone {
                        plates: stats.plates,
                        dots: stats.dots,
                    },
                };
                (image, stats.plates, diag)
            };
        ensure_dims("halftone", dims, &screened)?;

        Ok(Screened {
            run: self.run,
            resampled: self.resampled,
            developed: self.developed,
            veloxed: self.veloxed,
            grained: self.grained,
            screened,
            plates,
            diag_resample: self.diag_resample,
            diag_film: self.diag_film,
            diag_velox: self.diag_velox,
            diag_grain: self.diag_grain,
            diag_halftone,
        })
    }
}

// ───────────────────────── Stage 5: Screened ─────────────────────────

/// Screening done; ink bleed is next.
#[must_use = "pipeline stages are consumed by advancing — call .bleed() to continue"]
pub struct Screened {
    run: RunState,
    resampled: RgbaImage,
    developed: RgbaImage,
    veloxed: RgbaImage,
    grained: RgbaImage,
    screened: RgbaImage,
    plates: usize,
    diag_resample: StageDiagnostics,
    diag_film: Option<StageDiagnostics>,
    diag_velox: Option<StageDiagnostics>,
    diag_grain: Option<StageDiagnostics>,
    diag_halftone: StageDiagnostics,
}

impl Screened {
    /// The screened raster.
    #[must_use]
    pub const fn screened(&self) -> &RgbaImage {
        &self.screened
    }

    /// Wick wet ink into the paper, or pass through when inactive.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DimensionMismatch`] if the stage output
    /// changes size.
    pub fn bleed(self) -> Result<Bled, RenderError> {
        let dims = Dimensions::of(&self.screened);
        let (bled, diag_bleed) = if let Some(prior) = self.run.reusable(STAGE_BLEED) {
            (prior.bled.clone(), prior.diagnostics.bleed.clone())
        } else {
            match &self.run.config.bleed {
                Some(cfg) => {
                    let paper_color = self.run.config.halftone.paper_color;
                    let feed = self.run.config.press.feed;
                    let (image, diag) = timed(|| {
                        (
                            bleed_mod::bleed(&self.screened, cfg, paper_color, feed),
                            StageMetrics::Bleed { radius: cfg.radius },
                        )
                    });
                    (image, Some(diag))
                }
                None => (self.screened.clone(), None),
            }
        };
        ensure_dims("bleed", dims, &bled)?;

        Ok(Bled {
            run: self.run,
            resampled: self.resampled,
            developed: self.developed,
            veloxed: self.veloxed,
            grained: self.grained,
            screened: self.screened,
            bled,
            plates: self.plates,
            diag_resample: self.diag_resample,
            diag_film: self.diag_film,
            diag_velox: self.diag_velox,
            diag_grain: self.diag_grain,
            diag_halftone: self.diag_halftone,
            diag_bleed,
        })
    }
}

// ─────────────────────────── Stage 6: Bled ───────────────────────────

/// Ink bleed done; paper tooth is last.
#[must_use = "pipeline stages are consumed by advancing — call .tooth() to continue"]
pub struct Bled {
    run: RunState,
    resampled: RgbaImage,
    developed: RgbaImage,
    veloxed: RgbaImage,
    grained: RgbaImage,
    screened: RgbaImage,
    bled: RgbaImage,
    plates: usize,
    diag_resample: StageDiagnostics,
    diag_film: Option<StageDiagnostics>,
    diag_velox: Option<StageDiagnostics>,
    diag_grain: Option<StageDiagnostics>,
    diag_halftone: StageDiagnostics,
    diag_bleed: Option<StageDiagnostics>,
}

impl Bled {
    /// Apply the paper tooth, or pass through when inactive.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DimensionMismatch`] if the stage output
    /// changes size.
    pub fn tooth(self) -> Result<Output, RenderError> {
        let dims = Dimensions::of(&self.bled);
        let (output, diag_paper) = if let Some(prior) = self.run.reusable(STAGE_PAPER) {
            (prior.output.clone(), prior.diagnostics.paper.clone())
        } else {
            match &self.run.config.paper {
                Some(cfg) => {
                    let paper_color = self.run.config.halftone.paper_color;
                    let pressure = self.run.config.press.pressure;
                    let feed = self.run.config.press.feed;
                    let (image, diag) = timed(|| {
                        let (image, fibers) =
                            paper::tooth(&self.bled, cfg, paper_color, pressure, feed);
                        (image, StageMetrics::Paper { fibers })
                    });
                    (image, Some(diag))
                }
                None => (self.bled.clone(), None),
            }
        };
        ensure_dims("paper", dims, &output)?;

        Ok(Output {
            total_duration: self.run.started.elapsed(),
            resampled: self.resampled,
            developed: self.developed,
            veloxed: self.veloxed,
            grained: self.grained,
            screened: self.screened,
            bled: self.bled,
            output,
            plates: self.plates,
            diag_resample: self.diag_resample,
            diag_film: self.diag_film,
            diag_velox: self.diag_velox,
            diag_grain: self.diag_grain,
            diag_halftone: self.diag_halftone,
            diag_bleed: self.diag_bleed,
            diag_paper,
        })
    }
}

// ────────────────────────── Final: Output ────────────────────────────

/// The finished run, holding the full raster stack.
#[must_use = "call .into_result() to extract the StagedResult"]
#[allow(clippy::struct_field_names)]
pub struct Output {
    total_duration: std::time::Duration,
    resampled: RgbaImage,
    developed: RgbaImage,
    veloxed: RgbaImage,
    grained: RgbaImage,
    screened: RgbaImage,
    bled: RgbaImage,
    output: RgbaImage,
    plates: usize,
    diag_resample: StageDiagnostics,
    diag_film: Option<StageDiagnostics>,
    diag_velox: Option<StageDiagnostics>,
    diag_grain: Option<StageDiagnostics>,
    diag_halftone: StageDiagnostics,
    diag_bleed: Option<StageDiagnostics>,
    diag_paper: Option<StageDiagnostics>,
}

impl Output {
    /// The finished raster.
    #[must_use]
    pub const fn output(&self) -> &RgbaImage {
        &self.output
    }

    /// Output dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.output)
    }

    /// Consume the run and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        let dimensions = Dimensions::of(&self.output);
        StagedResult {
            diagnostics: PipelineDiagnostics {
                resample: self.diag_resample,
                film: self.diag_film,
                velox: self.diag_velox,
                grain: self.diag_grain,
                halftone: self.diag_halftone,
                bleed: self.diag_bleed,
                paper: self.diag_paper,
                total_duration: self.total_duration,
                summary: RunSummary {
                    dimensions,
                    pixel_count: dimensions.pixel_count(),
                    plates: self.plates,
                },
            },
            resampled: self.resampled,
            developed: self.developed,
            veloxed: self.veloxed,
            grained: self.grained,
            screened: self.screened,
            bled: self.bled,
            output: self.output,
            dimensions,
        }
    }
}

// ─────────────────────── Stage enum + Advance ────────────────────────

/// A type-erased pipeline state, for driving the run in a loop.
pub enum Stage {
    /// Before any processing.
    Pending(Pending),
    /// After the resample.
    Resampled(Resampled),
    /// After film development.
    Developed(Developed),
    /// After the velox crush.
    Veloxed(Veloxed),
    /// After grain.
    Grained(Grained),
    /// After screening.
    Screened(Screened),
    /// After ink bleed.
    Bled(Bled),
    /// Finished.
    Output(Output),
}

/// Result of advancing a [`Stage`] one step.
pub enum Advance {
    /// The run moved to the next (non-final) state.
    Next(Stage),
    /// The run finished.
    Complete(Output),
}

impl Stage {
    /// Zero-based index of this state.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Pending(_) => 0,
            Self::Resampled(_) => 1,
            Self::Developed(_) => 2,
            Self::Veloxed(_) => 3,
            Self::Grained(_) => 4,
            Self::Screened(_) => 5,
            Self::Bled(_) => 6,
            Self::Output(_) => 7,
        }
    }

    /// Human-readable name of this state.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pending(_) => "pending",
            Self::Resampled(_) => "resampled",
            Self::Developed(_) => "developed",
            Self::Veloxed(_) => "veloxed",
            Self::Grained(_) => "grained",
            Self::Screened(_) => "screened",
            Self::Bled(_) => "bled",
            Self::Output(_) => "output",
        }
    }

    /// Advance one step.
    ///
    /// # Errors
    ///
    /// Propagates the stage transition's error.
    pub fn advance(self) -> Result<Advance, RenderError> {
        Ok(match self {
            Self::Pending(s) => Advance::Next(Stage::Resampled(s.resample()?)),
            Self::Resampled(s) => Advance::Next(Stage::Developed(s.develop()?)),
            Self::Developed(s) => Advance::Next(Stage::Veloxed(s.crush()?)),
            Self::Veloxed(s) => Advance::Next(Stage::Grained(s.grain()?)),
            Self::Grained(s) => Advance::Next(Stage::Screened(s.screen()?)),
            Self::Screened(s) => Advance::Next(Stage::Bled(s.bleed()?)),
            Self::Bled(s) => Advance::Complete(s.tooth()?),
            Self::Output(s) => Advance::Complete(s),
        })
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Propagates the first failing transition.
    pub fn complete(self) -> Result<StagedResult, RenderError> {
        let mut stage = self;
        loop {
            match stage.advance()? {
                Advance::Next(next) => stage = next,
                Advance::Complete(done) => return Ok(done.into_result()),
            }
        }
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Resampled> for Stage {
    fn from(s: Resampled) -> Self {
        Self::Resampled(s)
    }
}

impl From<Developed> for Stage {
    fn from(s: Developed) -> Self {
        Self::Developed(s)
    }
}

impl From<Veloxed> for Stage {
    fn from(s: Veloxed) -> Self {
        Self::Veloxed(s)
    }
}

impl From<Grained> for Stage {
    fn from(s: Grained) -> Self {
        Self::Grained(s)
    }
}

impl From<Screened> for Stage {
    fn from(s: Screened) -> Self {
        Self::Screened(s)
    }
}

impl From<Bled> for Stage {
    fn from(s: Bled) -> Self {
        Self::Bled(s)
    }
}

impl From<Output> for Stage {
    fn from(s: Output) -> Self {
        Self::Output(s)
    }
}

// ──────────────────────────── RenderCache ────────────────────────────

/// Cache of one completed run, for restarting a re-render at the
/// earliest stage whose inputs changed.
///
/// A host re-rendering on every slider drag repeats most of the work:
/// changing the paper texture does not invalidate the screened plates,
/// and changing ink bleed does not invalidate anything before it. The
/// cache compares the new config module-by-module, reuses every
/// intermediate up to the first difference, and recomputes from there.
/// An unchanged config (and source and options) returns the cached
/// result without touching the pipeline — which also preserves the
/// unseeded grain speckle across no-op re-renders.
pub struct RenderCache {
    source: RgbaImage,
    config: RenderConfig,
    options: RenderOptions,
    result: StagedResult,
}

impl RenderCache {
    /// Run the pipeline, reusing intermediates from `prior` when it
    /// matches. Returns the result plus the cache for the next run.
    ///
    /// # Errors
    ///
    /// Propagates any [`RenderError`] from the underlying run.
    pub fn run(
        prior: Option<Self>,
        source: &RgbaImage,
        config: &RenderConfig,
        options: &RenderOptions,
    ) -> Result<(StagedResult, Self), RenderError> {
        let reuse = match prior {
            Some(cache) => {
                let earliest = cache.earliest_changed(source, config, options);
                if earliest == STAGE_NOTHING {
                    return Ok((cache.result.clone(), cache));
                }
                Some(ReusePlan {
                    prior: cache.result,
                    earliest,
                })
            }
            None => None,
        };
        let result = Pipeline::with_reuse(source.clone(), config.clone(), *options, reuse)
            .resample()?
            .develop()?
            .crush()?
            .grain()?
            .screen()?
            .bleed()?
            .tooth()?
            .into_result();

        let cache = Self {
            source: source.clone(),
            config: config.clone(),
            options: *options,
            result: result.clone(),
        };
        Ok((result, cache))
    }

    /// Index of the earliest stage whose inputs differ from the cached
    /// run, or [`STAGE_NOTHING`] when everything matches.
    fn earliest_changed(
        &self,
        source: &RgbaImage,
        config: &RenderConfig,
        options: &RenderOptions,
    ) -> usize {
        if self.source != *source || self.options != *options {
            return STAGE_RESAMPLE;
        }
        if self.config.film != config.film {
            return STAGE_FILM;
        }
        if self.config.velox != config.velox {
            return STAGE_VELOX;
        }
        if self.config.grain != config.grain {
            return STAGE_GRAIN;
        }
        // Press mechanics feed the halftone stage and everything after
        // it, so a press change restarts at screening.
        if self.config.halftone != config.halftone
            || self.config.press != config.press
            || self.config.dot_gain != config.dot_gain
            || self.config.registration != config.registration
            || self.config.ink_skip != config.ink_skip
            || self.config.hickeys != config.hickeys
        {
            return STAGE_HALFTONE;
        }
        if self.config.bleed != config.bleed {
            return STAGE_BLEED;
        }
        if self.config.paper != config.paper {
            return STAGE_PAPER;
        }
        STAGE_NOTHING
    }
}
