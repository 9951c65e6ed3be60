//! Per-plate rasterization: a rotated screen of variable-size dots.
//!
//! Each plate is an independent white raster onto which dots are drawn
//! in the plate's ink color. The screen grid lives in a coordinate
//! frame rotated by the plate angle; grid cells are walked in rotated
//! space and their centers mapped back into image space, where the
//! source is point-sampled to decide the dot size. Mechanical press
//! defects — dot gain, shadow fill, ink skip, registration error,
//! fan-out stretch, slur, hickeys — are applied per dot.
//!
//! Dots are drawn with a half-pixel soft edge: hard thresholding reads
//! as staircase aliasing at small cell sizes.

use crate::color::Rgb;
use crate::halftone::{DotShape, PlateValue};
use crate::params::{DotGainConfig, FeedDirection, HickeysConfig};
use crate::rng::Mulberry32;
use crate::types::RgbaImage;

/// Seed stride between plates for hickey placement.
const HICKEY_SEED_STRIDE: u32 = 5000;

/// Dots with a computed radius below this are not worth drawing.
const MIN_DOT_RADIUS: f64 = 0.3;

/// Everything needed to rasterize one plate.
pub struct PlateJob<'a> {
    /// Ink color for this plate's dots.
    pub ink: Rgb,
    /// Screen angle in degrees (plate angle + master angle).
    pub angle_deg: f64,
    /// How a sampled pixel converts to ink coverage.
    pub value: PlateValue,
    /// 1-based channel index *before* the laydown sort. Drives fan-out
    /// magnitude and the seeds of this plate's defect maps.
    pub plate_index: usize,
    /// Screen cell size in pixels.
    pub cell: f64,
    /// Dot shape.
    pub shape: DotShape,
    /// Paper feed axis (orients fan-out and slur).
    pub feed: FeedDirection,
    /// Dot slur along the feed axis, `[0, 0.5]`.
    pub slur: f64,
    /// Registration offset `(x, y)` in pixels.
    pub offset: (f64, f64),
    /// Fan-out stretch in pixels at the last plate.
    pub fanout: f64,
    /// Dot gain, if active.
    pub dot_gain: Option<DotGainConfig>,
    /// Ink-skip map for this plate, if active.
    pub skip_map: Option<&'a [f32]>,
    /// Hickey defects, if active.
    pub hickeys: Option<HickeysConfig>,
}

/// Rasterize one plate against the sample source.
///
/// Returns the plate raster (white background, ink dots) and the
/// number of dots drawn.
#[must_use]
pub fn rasterize(source: &RgbaImage, job: &PlateJob<'_>) -> (RgbaImage, usize) {
    let (width, height) = (source.width(), source.height());
    let (w_f, h_f) = (f64::from(width), f64::from(height));
    let mut plate = RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let mut dots = 0usize;

    let theta = job.angle_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    let max_radius = job.cell * 0.5 * 0.98;

    // Per-dot scale from slur: elongation along the feed axis.
    let (scale_x, scale_y) = match job.feed {
        FeedDirection::Horizontal => (1.0 + job.slur, 1.0),
        FeedDirection::Vertical => (1.0, 1.0 + job.slur),
    };

    // Fan-out stretch: plate 1 is registered, the last plate stretches
    // the most, always orthogonal to the feed.
    let max_stretch = job.fanout * (job.plate_index as f64 - 1.0) / 3.0;
    let (stretch_x, stretch_y) = match job.feed {
        FeedDirection::Vertical => (max_stretch / (w_f / 2.0), 0.0),
        FeedDirection::Horizontal => (0.0, max_stretch / (h_f / 2.0)),
    };

    // Walk a rotated grid large enough to cover the image regardless
    // of angle: a square of half-extent half the image diagonal.
    let half_diag = w_f.hypot(h_f) / 2.0;
    let steps = (half_diag / job.cell).ceil() as i64 + 1;

    for gy_step in -steps..=steps {
        for gx_step in -steps..=steps {
            let gcx = gx_step as f64 * job.cell + job.cell / 2.0;
            let gcy = gy_step as f64 * job.cell + job.cell / 2.0;

            // Rotate the cell center into image space.
            let img_x = w_f / 2.0 + gcx * cos - gcy * sin;
            let img_y = h_f / 2.0 + gcx * sin + gcy * cos;
            if img_x < 0.0 || img_x >= w_f || img_y < 0.0 || img_y >= h_f {
                continue;
            }

            let sx = (img_x.round() as u32).min(width - 1);
            let sy = (img_y.round() as u32).min(height - 1);
            let px = source.get_pixel(sx, sy).0;
            let mut ink = job.value.ink_fraction(px[0], px[1], px[2]);

            if let Some(gain) = &job.dot_gain {
                // Midtone-weighted gain, then shadow fill toward solid.
                ink = (ink + gain.amount * ink * (1.0 - ink) * 2.0).clamp(0.0, 1.0);
                if ink > 0.75 && gain.shadow > 0.0 {
                    ink = (ink + (1.0 - ink) * gain.shadow * (ink - 0.75) / 0.25).clamp(0.0, 1.0);
                }
            }

            if let Some(map) = job.skip_map {
                let skip = f64::from(map[(sy * width + sx) as usize]);
                ink = (ink * (1.0 - skip)).clamp(0.0, 1.0);
            }

            let radius = max_radius * ink.sqrt();
            if radius < MIN_DOT_RADIUS {
                continue;
            }

            // Registration offset plus fan-out stretch away from the
            // web center line.
            let dx = img_x + job.offset.0 + (img_x - w_f / 2.0) * stretch_x;
            let dy = img_y + job.offset.1 + (img_y - h_f / 2.0) * stretch_y;

            draw_dot(
                &mut plate,
                job.shape,
                job.ink,
                dx,
                dy,
                radius,
                scale_x,
                scale_y,
                job.cell,
                max_radius,
                sin,
                cos,
            );
            dots += 1;
        }
    }

    if let Some(hickeys) = &job.hickeys {
        stamp_hickeys(&mut plate, job, hickeys);
    }

    (plate, dots)
}

/// Draw a single dot with a half-pixel antialiased edge.
///
/// `scale_x`/`scale_y` are the slur scales along the image axes; the
/// line shape is additionally rotated to follow the screen angle.
#[allow(clippy::too_many_arguments)]
fn draw_dot(
    plate: &mut RgbaImage,
    shape: DotShape,
    ink: Rgb,
    cx: f64,
    cy: f64,
    radius: f64,
    scale_x: f64,
    scale_y: f64,
    cell: f64,
    max_radius: f64,
    sin: f64,
    cos: f64,
) {
    let (width, height) = (plate.width() as i64, plate.height() as i64);

    // One bounding box serves all shapes: the line's length can exceed
    // the dot radius, so take the larger of the two.
    let extent = radius.max(cell / 2.0) * scale_x.max(scale_y) + 1.0;
    let x0 = ((cx - extent).floor() as i64).max(0);
    let x1 = ((cx + extent).ceil() as i64).min(width - 1);
    let y0 = ((cy - extent).floor() as i64).max(0);
    let y1 = ((cy + extent).ceil() as i64).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let lx = (x as f64 - cx) / scale_x;
            let ly = (y as f64 - cy) / scale_y;

            let coverage = match shape {
                DotShape::Circle => {
                    let dist = lx.hypot(ly);
                    (radius - dist + 0.5).clamp(0.0, 1.0)
                }
                DotShape::Diamond => {
                    let manhattan = lx.abs() + ly.abs();
                    (radius - manhattan + 0.5).clamp(0.0, 1.0)
                }
                DotShape::Line => {
                    // Rotate into screen space; the bar runs along the
                    // screen's u axis.
                    let u = lx * cos + ly * sin;
                    let v = -lx * sin + ly * cos;
                    let half_len = cell / 2.0;
                    let half_thickness = (radius * 1.2).clamp(MIN_DOT_RADIUS, max_radius) / 2.0;
                    let along = (half_len - u.abs() + 0.5).clamp(0.0, 1.0);
                    let across = (half_thickness - v.abs() + 0.5).clamp(0.0, 1.0);
                    along * across
                }
            };

            if coverage > 0.0 {
                blend_pixel(plate, x as u32, y as u32, ink, coverage);
            }
        }
    }
}

/// Composite `ink` over the plate pixel at the given coverage.
fn blend_pixel(plate: &mut RgbaImage, x: u32, y: u32, ink: Rgb, coverage: f64) {
    let px = plate.get_pixel_mut(x, y);
    let ink = ink.channels();
    for c in 0..3 {
        let base = f64::from(px.0[c]);
        px.0[c] = (base + (f64::from(ink[c]) - base) * coverage)
            .clamp(0.0, 255.0)
            .round() as u8;
    }
}

/// Stamp donut defects: a darker ink ring around a paper-white void,
/// where dust on the blanket refused ink.
///
/// Seeded by `plate_index * 5000`; per hickey the draws are consumed
/// in the order x, y, outer radius, inner fraction.
fn stamp_hickeys(plate: &mut RgbaImage, job: &PlateJob<'_>, config: &HickeysConfig) {
    let (width, height) = (plate.width(), plate.height());
    let mut rng = Mulberry32::new(job.plate_index as u32 * HICKEY_SEED_STRIDE);
    let ring_ink = job.ink.scaled(0.6);

    for _ in 0..config.count {
        let cx = rng.next_f64() * f64::from(width);
        let cy = rng.next_f64() * f64::from(height);
        let outer = rng.range(2.0, f64::from(config.size_max).max(2.0));
        let inner = outer * rng.range(0.35, 0.60);

        stamp_disk(plate, cx, cy, outer, ring_ink);
        stamp_disk(plate, cx, cy, inner, Rgb::WHITE);
    }
}

/// Fill a soft-edged disk.
fn stamp_disk(plate: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgb) {
    let (width, height) = (plate.width() as i64, plate.height() as i64);
    let x0 = ((cx - radius - 1.0).floor() as i64).max(0);
    let x1 = ((cx + radius + 1.0).ceil() as i64).min(width - 1);
    let y0 = ((cy - radius - 1.0).floor() as i64).max(0);
    let y1 = ((cy + radius + 1.0).ceil() as i64).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dist = (x as f64 - cx).hypot(y as f64 - cy);
            let coverage = (radius - dist + 0.5).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend_pixel(plate, x as u32, y as u32, color, coverage);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halftone::PlateValue;

    fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, _| image::Rgba([v, v, v, 255]))
    }

    fn job(cell: f64) -> PlateJob<'static> {
        PlateJob {
            ink: Rgb::new(0, 0, 0),
            angle_deg: 0.0,
            value: PlateValue::Shadow,
            plate_index: 1,
            cell,
            shape: DotShape::Circle,
            feed: FeedDirection::Vertical,
            slur: 0.0,
            offset: (0.0, 0.0),
            fanout: 0.0,
            dot_gain: None,
            skip_map: None,
            hickeys: None,
        }
    }

    /// Mean darkness (255 - brightness) over the red channel.
    fn coverage(plate: &RgbaImage) -> f64 {
        let total: f64 = plate.pixels().map(|px| 255.0 - f64::from(px.0[0])).sum();
        total / f64::from(plate.width() * plate.height())
    }

    /// Darkness-weighted centroid x coordinate.
    fn centroid_x(plate: &RgbaImage) -> f64 {
        let mut mass = 0.0;
        let mut moment = 0.0;
        for (x, _, px) in plate.enumerate_pixels() {
            let m = 255.0 - f64::from(px.0[0]);
            mass += m;
            moment += m * f64::from(x);
        }
        moment / mass
    }

    #[test]
    fn white_source_draws_no_dots() {
        let src = solid(32, 32, 255);
        let (plate, dots) = rasterize(&src, &job(6.0));
        assert_eq!(dots, 0);
        assert!(plate.pixels().all(|px| px.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn black_source_covers_heavily() {
        let src = solid(32, 32, 0);
        let (plate, dots) = rasterize(&src, &job(6.0));
        assert!(dots > 10, "expected a dense screen, drew {dots}");
        assert!(coverage(&plate) > 100.0, "coverage {}", coverage(&plate));
    }

    #[test]
    fn darker_source_larger_coverage() {
        let (light, _) = rasterize(&solid(48, 48, 200), &job(8.0));
        let (dark, _) = rasterize(&solid(48, 48, 60), &job(8.0));
        assert!(coverage(&dark) > coverage(&light));
    }

    #[test]
    fn rotated_screen_still_covers_the_frame() {
        let src = solid(40, 40, 0);
        let (plate, _) = rasterize(
            &src,
            &PlateJob {
                angle_deg: 45.0,
                ..job(6.0)
            },
        );
        // Every quadrant should contain ink; an unrotated-extent bug
        // leaves corners empty.
        for (qx, qy) in [(0, 0), (20, 0), (0, 20), (20, 20)] {
            let mut found = false;
            for y in qy..qy + 20 {
                for x in qx..qx + 20 {
                    if plate.get_pixel(x, y).0[0] < 128 {
                        found = true;
                    }
                }
            }
            assert!(found, "no ink in quadrant at ({qx}, {qy})");
        }
    }

    #[test]
    fn registration_offset_shifts_centroid() {
        let src = solid(60, 60, 90);
        let (reference, _) = rasterize(&src, &job(6.0));
        let (shifted, _) = rasterize(
            &src,
            &PlateJob {
                offset: (5.0, 0.0),
                ..job(6.0)
            },
        );
        let delta = centroid_x(&shifted) - centroid_x(&reference);
        // Dots near the right edge fall off the plate, so the centroid
        // moves a little less than the full offset.
        assert!(
            (3.0..=5.5).contains(&delta),
            "centroid moved {delta:.2}px for a 5px offset"
        );
    }

    #[test]
    fn dot_gain_darkens_midtones() {
        let src = solid(48, 48, 128);
        let (plain, _) = rasterize(&src, &job(8.0));
        let (gained, _) = rasterize(
            &src,
            &PlateJob {
                dot_gain: Some(DotGainConfig {
                    amount: 1.0,
                    shadow: 0.0,
                }),
                ..job(8.0)
            },
        );
        assert!(coverage(&gained) > coverage(&plain));
    }

    #[test]
    fn full_skip_map_erases_dots() {
        let src = solid(32, 32, 0);
        let map = vec![1.0f32; 32 * 32];
        let (plate, dots) = rasterize(
            &src,
            &PlateJob {
                skip_map: Some(&map),
                ..job(6.0)
            },
        );
        assert_eq!(dots, 0);
        assert!(plate.pixels().all(|px| px.0[0] == 255));
    }

    #[test]
    fn slur_elongates_dots_along_feed() {
        let src = solid(48, 48, 110);
        let (round, _) = rasterize(&src, &job(10.0));
        let (slurred, _) = rasterize(
            &src,
            &PlateJob {
                slur: 0.5,
                feed: FeedDirection::Vertical,
                ..job(10.0)
            },
        );
        // Vertical slur adds coverage without adding dots.
        assert!(coverage(&slurred) > coverage(&round));
    }

    #[test]
    fn hickeys_are_deterministic_and_visible() {
        let src = solid(64, 64, 255);
        let with_hickeys = || {
            rasterize(
                &src,
                &PlateJob {
                    hickeys: Some(HickeysConfig::default()),
                    ..job(8.0)
                },
            )
            .0
        };
        let a = with_hickeys();
        let b = with_hickeys();
        assert_eq!(a, b, "hickeys must be seed-stable");
        // On a blank plate the only marks are the rings.
        assert!(a.pixels().any(|px| px.0[0] < 255));
    }

    #[test]
    fn line_shape_spans_the_cell() {
        let src = solid(40, 40, 40);
        let (lines, _) = rasterize(
            &src,
            &PlateJob {
                shape: DotShape::Line,
                ..job(8.0)
            },
        );
        let (circles, _) = rasterize(&src, &job(8.0));
        // Lines tile the cell length, so dark rows connect horizontally
        // more than circle screens do at the same tone.
        assert!(coverage(&lines) > 0.0);
        assert!((coverage(&lines) - coverage(&circles)).abs() > 1.0);
    }
}
