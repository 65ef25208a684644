use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// A seekable supply of decoded frames.
///
/// The loader only relies on seek-then-read: after `seek(n)` the next `read`
/// returns frame `n`, and each further `read` returns the following frame.
/// Implementations hide codec and container details.
pub trait FrameSource: Send {
    /// Opens the source and returns its metadata. Reopening an open source
    /// starts over from frame 0.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Positions the source so that the next `read` yields frame `index`.
    fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>>;

    /// Reads the frame at the current position and advances by one.
    ///
    /// `Ok(None)` marks the physical end of the stream.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases any resources held by the source. Safe to call repeatedly.
    fn close(&mut self);
}
