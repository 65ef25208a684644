use std::ops::Range;

use crate::shared::loader_error::LoaderError;
use crate::shared::source_descriptor::SourceDescriptor;
use crate::windowing::loader_config::LoaderConfig;

/// The resolved extent and stepping of every pass over a source.
///
/// Built from a [`LoaderConfig`] and the source's descriptor. Guarantees
/// `batch_size % stride == 0` and `start_frame + span_frames <= total_frames`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPlan {
    pub start_frame: usize,
    pub span_frames: usize,
    pub skip_frame: usize,
    pub stride: usize,
    pub batch_size: usize,
}

impl WindowPlan {
    /// Reconciles start and duration requests against the physical length.
    ///
    /// Time-based values are converted with the rounded native rate and
    /// snapped to batch boundaries. Frame-based values are taken as given,
    /// apart from clipping to the end of the source. A start past the end
    /// resolves to an empty window at `total_frames`.
    pub fn resolve(
        config: &LoaderConfig,
        descriptor: &SourceDescriptor,
    ) -> Result<Self, LoaderError> {
        config.validate()?;

        let batch_size = config.batch_size;
        let fps = descriptor.whole_fps();
        let total = descriptor.total_frames;

        let start_frame = match (config.start_frame, config.start_seconds) {
            (Some(frame), _) => frame,
            (None, Some(seconds)) => seconds_to_batched_frames(seconds, fps, batch_size, total),
            (None, None) => 0,
        }
        .min(total);

        let span_frames = match (config.duration_frames, config.duration_seconds) {
            (Some(frames), _) => frames,
            (None, Some(seconds)) => floor_to_multiple(total, batch_size)
                .min(seconds_to_batched_frames(seconds, fps, batch_size, total)),
            (None, None) => floor_to_multiple(total, batch_size),
        };
        let span_frames = span_frames.min(total.saturating_sub(start_frame));

        Ok(Self {
            start_frame,
            span_frames,
            skip_frame: config.skip_frame,
            stride: config.effective_stride(),
            batch_size,
        })
    }

    /// Absolute indices covered by the window.
    pub fn frame_range(&self) -> Range<usize> {
        self.start_frame..self.start_frame + self.span_frames
    }

    /// Frames carried from one batch into the next.
    pub fn retained_len(&self) -> usize {
        self.batch_size - self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.span_frames == 0
    }

    /// Same window with overlap and skipping turned off.
    pub fn non_overlapping(self) -> Self {
        Self {
            skip_frame: 0,
            stride: self.batch_size,
            ..self
        }
    }

    pub fn duration_seconds(&self, fps: usize) -> f64 {
        self.span_frames as f64 / fps.max(1) as f64
    }
}

/// Saturates at `usize::MAX` instead of overflowing.
pub fn round_up_to_multiple(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple).saturating_mul(multiple)
}

pub fn floor_to_multiple(value: usize, multiple: usize) -> usize {
    value / multiple * multiple
}

/// Frame count for a time offset, capped at `total` before snapping up to
/// a batch boundary.
fn seconds_to_batched_frames(seconds: f64, fps: usize, batch_size: usize, total: usize) -> usize {
    let frames = ((seconds * fps as f64).ceil() as usize).min(total);
    round_up_to_multiple(frames, batch_size)
}
