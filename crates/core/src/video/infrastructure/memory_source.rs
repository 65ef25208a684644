use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// A [`FrameSource`] over frames already held in memory.
///
/// Useful for image sequences and for exercising the loader without a
/// decoder. `readable_frames` caps how many frames can actually be read,
/// emulating files whose trailing segment is missing even though the
/// container still reports the full count.
pub struct MemorySource {
    frames: Vec<Frame>,
    fps: f64,
    readable_frames: usize,
    position: usize,
    is_open: bool,
    open_count: usize,
    seek_count: usize,
    read_count: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        let readable_frames = frames.len();
        Self {
            frames,
            fps,
            readable_frames,
            position: 0,
            is_open: false,
            open_count: 0,
            seek_count: 0,
            read_count: 0,
        }
    }

    /// Frames numbered `0..count`, each filled with `index % 256` so content
    /// identifies position.
    pub fn numbered(count: usize, width: u32, height: u32, channels: u8, fps: f64) -> Self {
        let frames = (0..count)
            .map(|i| Frame::filled((i % 256) as u8, width, height, channels, i))
            .collect();
        Self::new(frames, fps)
    }

    /// Limits reads to the first `count` frames while metadata keeps
    /// reporting the full length.
    pub fn with_readable_frames(mut self, count: usize) -> Self {
        self.readable_frames = count.min(self.frames.len());
        self
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn open_count(&self) -> usize {
        self.open_count
    }

    pub fn seek_count(&self) -> usize {
        self.seek_count
    }

    pub fn read_count(&self) -> usize {
        self.read_count
    }
}

impl FrameSource for MemorySource {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let (width, height, channels) = self
            .frames
            .first()
            .map(|f| (f.width(), f.height(), f.channels()))
            .unwrap_or((0, 0, 3));
        self.position = 0;
        self.is_open = true;
        self.open_count += 1;
        Ok(VideoMetadata {
            width,
            height,
            channels,
            fps: self.fps,
            total_frames: self.frames.len(),
            codec: "raw".to_string(),
            source_path: Some(path.to_path_buf()),
        })
    }

    fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_open {
            return Err("MemorySource: not opened".into());
        }
        self.seek_count += 1;
        self.position = index;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if !self.is_open {
            return Err("MemorySource: not opened".into());
        }
        if self.position >= self.readable_frames {
            return Ok(None);
        }
        let frame = self.frames[self.position].clone();
        self.position += 1;
        self.read_count += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.is_open = false;
    }
}
