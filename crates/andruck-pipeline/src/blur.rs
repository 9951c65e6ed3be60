//! Separable box blur over scalar fields.
//!
//! The halation bloom (film stage) blurs a per-pixel brightness field
//! with a box filter run in two passes, which converges toward a
//! Gaussian falloff without the cost of a true Gaussian kernel. The
//! blur is separable: a horizontal sliding-window pass into a scratch
//! buffer followed by a vertical pass back, with one scratch
//! allocation shared across passes.
//!
//! Out-of-bounds samples replicate the edge value, so flat fields stay
//! flat and the field's dimensions never change.

/// Apply `passes` iterations of a separable box blur of the given
/// radius to `field` in place.
///
/// `field` is a row-major `width * height` scalar field. A radius of
/// zero (or an empty field) is a no-op.
pub fn box_blur(field: &mut [f32], width: usize, height: usize, radius: usize, passes: usize) {
    debug_assert_eq!(field.len(), width * height);
    if radius == 0 || field.is_empty() {
        return;
    }

    let mut scratch = vec![0.0f32; field.len()];
    for _ in 0..passes {
        horizontal_pass(field, &mut scratch, width, height, radius);
        vertical_pass(&scratch, field, width, height, radius);
    }
}

/// Sliding-window mean along each row, edge-replicated.
fn horizontal_pass(src: &[f32], dst: &mut [f32], width: usize, height: usize, radius: usize) {
    let window = (2 * radius + 1) as f32;
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        // Prime the window for x = 0: radius+1 copies of the left edge
        // plus the first `radius` in-bounds samples.
        let mut sum = row[0] * (radius as f32 + 1.0);
        for x in 1..=radius {
            sum += row[x.min(width - 1)];
        }
        for x in 0..width {
            dst[y * width + x] = sum / window;
            let entering = row[(x + radius + 1).min(width - 1)];
            let leaving = row[x.saturating_sub(radius)];
            sum += entering - leaving;
        }
    }
}

/// Sliding-window mean along each column, edge-replicated.
fn vertical_pass(src: &[f32], dst: &mut [f32], width: usize, height: usize, radius: usize) {
    let window = (2 * radius + 1) as f32;
    for x in 0..width {
        let mut sum = src[x] * (radius as f32 + 1.0);
        for y in 1..=radius {
            sum += src[y.min(height - 1) * width + x];
        }
        for y in 0..height {
            dst[y * width + x] = sum / window;
            let entering = src[(y + radius + 1).min(height - 1) * width + x];
            let leaving = src[y.saturating_sub(radius) * width + x];
            sum += entering - leaving;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A field with a single bright impulse at the center.
    fn impulse_field(width: usize, height: usize) -> Vec<f32> {
        let mut field = vec![0.0; width * height];
        field[(height / 2) * width + width / 2] = 1.0;
        field
    }

    #[test]
    fn zero_radius_is_noop() {
        let mut field = impulse_field(9, 9);
        let before = field.clone();
        box_blur(&mut field, 9, 9, 0, 2);
        assert_eq!(field, before);
    }

    #[test]
    fn flat_field_stays_flat() {
        let mut field = vec![0.5f32; 12 * 7];
        box_blur(&mut field, 12, 7, 3, 2);
        for &v in &field {
            assert!((v - 0.5).abs() < 1e-5, "flat field drifted to {v}");
        }
    }

    #[test]
    fn impulse_spreads_and_conserves_mass() {
        let mut field = impulse_field(15, 15);
        box_blur(&mut field, 15, 15, 2, 1);

        let center = field[7 * 15 + 7];
        let neighbor = field[7 * 15 + 8];
        assert!(center > 0.0 && neighbor > 0.0);
        assert!(center >= neighbor, "blur should peak at the impulse");

        // Away from edges, a box blur redistributes without gain.
        let total: f32 = field.iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "mass changed: {total}");
    }

    #[test]
    fn two_passes_spread_further_than_one() {
        let mut one = impulse_field(21, 21);
        let mut two = impulse_field(21, 21);
        box_blur(&mut one, 21, 21, 2, 1);
        box_blur(&mut two, 21, 21, 2, 2);
        // The double-blurred field reaches pixels a single pass cannot.
        let far = 10 * 21 + (10 + 4);
        assert_eq!(one[far], 0.0);
        assert!(two[far] > 0.0);
    }

    #[test]
    fn single_row_field_blurs_without_panicking() {
        let mut field = vec![0.0f32, 1.0, 0.0, 0.0, 0.0];
        box_blur(&mut field, 5, 1, 1, 2);
        assert!(field[1] > field[3]);
    }
}
