use std::path::PathBuf;

/// Physical properties a frame source reports when it is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Channels of the frames `read` returns: 3 for RGB, 1 for grayscale.
    pub channels: u8,
    pub fps: f64,
    /// Frame count as stored in the container. Trailing segments may turn out
    /// to be unreadable, so this is an upper bound rather than a promise.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Length of the whole container in seconds; zero when the rate is unknown.
    pub fn duration_seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }
}
