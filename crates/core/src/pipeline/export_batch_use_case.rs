use std::path::Path;

use ndarray::ArrayView4;

use crate::shared::frame::Frame;
use crate::shared::source_descriptor::OutputFormat;
use crate::video::domain::video_writer::VideoWriter;
use crate::windowing::domain::batch::frames_from_array;

/// Persists frames, or a float buffer of frames, as a playable video.
///
/// Geometry and colour mode come from the frames themselves; only the rate
/// is chosen by the caller.
pub struct ExportBatchUseCase {
    writer: Box<dyn VideoWriter>,
}

impl ExportBatchUseCase {
    pub fn new(writer: Box<dyn VideoWriter>) -> Self {
        Self { writer }
    }

    /// Writes `frames` to `path` and returns how many were written.
    pub fn export_frames(
        &mut self,
        frames: &[Frame],
        fps: f64,
        path: &Path,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let first = frames.first().ok_or("No frames to export")?;
        let format = OutputFormat {
            width: first.width(),
            height: first.height(),
            fps,
            grayscale: first.is_grayscale(),
        };

        self.writer.open(path, &format)?;
        let written = frames.iter().try_for_each(|frame| self.writer.write(frame));
        let closed = self.writer.close();
        written?;
        closed?;

        log::info!("Wrote {} frames to {}", frames.len(), path.display());
        Ok(frames.len())
    }

    /// Rounds and clips `buffer` (`[batch, height, width, channels]`) to
    /// 8-bit pixels, then writes it like [`Self::export_frames`].
    pub fn export_array(
        &mut self,
        buffer: ArrayView4<'_, f32>,
        fps: f64,
        path: &Path,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let frames = frames_from_array(buffer, 0);
        self.export_frames(&frames, fps, path)
    }
}
