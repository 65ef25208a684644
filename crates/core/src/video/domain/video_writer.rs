use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::source_descriptor::OutputFormat;

/// Persists frames as a playable video so the windowing code never depends
/// on a specific codec library.
pub trait VideoWriter: Send {
    fn open(&mut self, path: &Path, format: &OutputFormat)
        -> Result<(), Box<dyn std::error::Error>>;

    /// Frames must match the geometry and channel count given to `open`.
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
