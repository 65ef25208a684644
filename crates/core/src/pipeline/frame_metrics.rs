use ndarray::{Array, ArrayView, Dimension, Zip};

use crate::shared::constants::INVALID_RECONSTRUCTION_ERROR;

/// Root-mean-square difference between two buffers of the same shape.
///
/// Returns `-1.0` when the shapes differ.
pub fn reconstruction_error<D: Dimension>(
    original: ArrayView<'_, f32, D>,
    reconstructed: ArrayView<'_, f32, D>,
) -> f64 {
    let mut rms = RmsAccumulator::default();
    rms.add(original, reconstructed);
    rms.value()
}

/// Running RMS over a sequence of buffer pairs.
///
/// One mismatched pair poisons the result.
#[derive(Clone, Copy, Debug, Default)]
pub struct RmsAccumulator {
    sum_squares: f64,
    count: usize,
    mismatched: bool,
}

impl RmsAccumulator {
    /// Adds one pair and returns that pair's own RMS.
    pub fn add<D: Dimension>(
        &mut self,
        original: ArrayView<'_, f32, D>,
        reconstructed: ArrayView<'_, f32, D>,
    ) -> f64 {
        if original.shape() != reconstructed.shape() {
            self.mismatched = true;
            return INVALID_RECONSTRUCTION_ERROR;
        }

        let mut pair_sum = 0.0f64;
        Zip::from(&original)
            .and(&reconstructed)
            .for_each(|&a, &b| {
                let diff = (a - b) as f64;
                pair_sum += diff * diff;
            });
        self.sum_squares += pair_sum;
        self.count += original.len();

        if original.is_empty() {
            0.0
        } else {
            (pair_sum / original.len() as f64).sqrt()
        }
    }

    pub fn value(&self) -> f64 {
        if self.mismatched {
            INVALID_RECONSTRUCTION_ERROR
        } else if self.count == 0 {
            0.0
        } else {
            (self.sum_squares / self.count as f64).sqrt()
        }
    }
}

/// Centres and scales a buffer in place.
///
/// Missing statistics are computed from the buffer, the standard deviation
/// after centring. A zero deviation leaves the buffer centred but unscaled.
/// Returns the `(mean, std)` that were applied.
pub fn normalize_frames<D: Dimension>(
    frames: &mut Array<f32, D>,
    mean: Option<f32>,
    std: Option<f32>,
) -> (f32, f32) {
    let mean = mean.unwrap_or_else(|| frames.mean().unwrap_or(0.0));
    frames.mapv_inplace(|v| v - mean);

    let std = std.unwrap_or_else(|| {
        if frames.is_empty() {
            0.0
        } else {
            frames.std(0.0)
        }
    });
    if std != 0.0 {
        frames.mapv_inplace(|v| v / std);
    }
    (mean, std)
}

/// Short human-readable duration: `"12.35"` up to a minute, then clock
/// notation without leading zero fields (`"1:30"`, `"1:02:03"`).
pub fn format_seconds(seconds: f64) -> String {
    if seconds <= 60.0 {
        return format!("{seconds:.2}");
    }
    let total = seconds.round() as u64;
    let clock = format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60);
    clock.trim_start_matches(['0', ':']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array4};
    use rstest::rstest;

    #[test]
    fn test_identical_buffers_have_zero_error() {
        let a = Array4::<f32>::from_elem((2, 3, 3, 1), 17.0);
        assert_relative_eq!(reconstruction_error(a.view(), a.view()), 0.0);
    }

    #[test]
    fn test_error_is_root_mean_square() {
        let a = array![[0.0f32, 0.0], [0.0, 0.0]];
        let b = array![[3.0f32, 3.0], [-3.0, 3.0]];
        assert_relative_eq!(reconstruction_error(a.view(), b.view()), 3.0);

        let c = array![[1.0f32, 0.0], [0.0, 1.0]];
        assert_relative_eq!(
            reconstruction_error(a.view(), c.view()),
            0.5f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_shape_mismatch_returns_sentinel() {
        let a = Array4::<f32>::zeros((2, 2, 2, 1));
        let b = Array4::<f32>::zeros((2, 2, 2, 3));
        assert_relative_eq!(reconstruction_error(a.view(), b.view()), -1.0);
    }

    #[test]
    fn test_accumulator_matches_whole_buffer_error() {
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let b = array![[1.5f32, 2.0], [2.0, 6.0]];

        let mut rms = RmsAccumulator::default();
        rms.add(a.row(0), b.row(0));
        rms.add(a.row(1), b.row(1));
        assert_relative_eq!(
            rms.value(),
            reconstruction_error(a.view(), b.view()),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_accumulator_poisoned_by_mismatch() {
        let a = array![1.0f32, 2.0];
        let b = array![1.0f32];
        let mut rms = RmsAccumulator::default();
        rms.add(a.view(), a.view());
        assert_relative_eq!(rms.add(a.view(), b.view()), -1.0);
        assert_relative_eq!(rms.value(), -1.0);
    }

    #[test]
    fn test_empty_accumulator_is_zero() {
        assert_relative_eq!(RmsAccumulator::default().value(), 0.0);
    }

    #[test]
    fn test_normalize_computes_statistics() {
        let mut frames = array![2.0f32, 4.0, 6.0, 8.0];
        let (mean, std) = normalize_frames(&mut frames, None, None);
        assert_relative_eq!(mean, 5.0);
        assert_relative_eq!(std, 5.0f32.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(frames.mean().unwrap(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(frames.std(0.0), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_uses_supplied_statistics() {
        let mut frames = array![10.0f32, 20.0];
        let (mean, std) = normalize_frames(&mut frames, Some(10.0), Some(5.0));
        assert_relative_eq!(mean, 10.0);
        assert_relative_eq!(std, 5.0);
        assert_relative_eq!(frames[0], 0.0);
        assert_relative_eq!(frames[1], 2.0);
    }

    #[test]
    fn test_normalize_constant_buffer_only_centres() {
        let mut frames = Array4::<f32>::from_elem((1, 2, 2, 1), 9.0);
        let (_, std) = normalize_frames(&mut frames, None, None);
        assert_relative_eq!(std, 0.0);
        assert!(frames.iter().all(|&v| v == 0.0));
    }

    #[rstest]
    #[case::short(12.346, "12.35")]
    #[case::whole_minute(60.0, "60.00")]
    #[case::minute_and_half(90.0, "1:30")]
    #[case::ten_minutes(600.4, "10:00")]
    #[case::hours(3723.0, "1:02:03")]
    fn test_format_seconds(#[case] seconds: f64, #[case] expected: &str) {
        assert_eq!(format_seconds(seconds), expected);
    }
}
