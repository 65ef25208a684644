use std::path::PathBuf;

use super::video_metadata::VideoMetadata;

/// Immutable description of a source and of the frames the loader emits from it.
///
/// Built once when a loader is constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceDescriptor {
    pub total_frames: usize,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub target_size: Option<(u32, u32)>,
    pub grayscale: bool,
    pub source_path: Option<PathBuf>,
}

impl SourceDescriptor {
    pub fn new(
        metadata: &VideoMetadata,
        target_size: Option<(u32, u32)>,
        grayscale: bool,
    ) -> Self {
        Self {
            total_frames: metadata.total_frames,
            fps: metadata.fps,
            width: metadata.width,
            height: metadata.height,
            channels: metadata.channels,
            target_size,
            grayscale,
            source_path: metadata.source_path.clone(),
        }
    }

    pub fn whole_fps(&self) -> usize {
        let rounded = self.fps.round();
        if rounded >= 1.0 {
            rounded as usize
        } else {
            1
        }
    }

    pub fn output_width(&self) -> u32 {
        self.target_size.map_or(self.width, |(w, _)| w)
    }

    pub fn output_height(&self) -> u32 {
        self.target_size.map_or(self.height, |(_, h)| h)
    }

    /// Grayscale reduction yields one channel; otherwise frames keep the
    /// channel count the source reads them with.
    pub fn output_channels(&self) -> u8 {
        if self.grayscale {
            1
        } else {
            self.channels
        }
    }

    /// Settings for persisting emitted frames at the native rate.
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat {
            width: self.output_width(),
            height: self.output_height(),
            fps: self.fps,
            grayscale: self.output_channels() == 1,
        }
    }
}

/// Geometry and rate of a video being written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub grayscale: bool,
}

impl OutputFormat {
    pub fn channels(&self) -> u8 {
        if self.grayscale {
            1
        } else {
            3
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            width: 320,
            height: 240,
            channels: 3,
            fps: 29.97,
            total_frames: 300,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/clip.mp4")),
        }
    }

    #[test]
    fn test_native_geometry_without_target() {
        let d = SourceDescriptor::new(&metadata(), None, false);
        assert_eq!(d.output_width(), 320);
        assert_eq!(d.output_height(), 240);
        assert_eq!(d.output_channels(), 3);
        assert_eq!(d.whole_fps(), 30);
    }

    #[test]
    fn test_target_size_and_grayscale_shape_output() {
        let d = SourceDescriptor::new(&metadata(), Some((64, 48)), true);
        let format = d.output_format();
        assert_eq!((format.width, format.height), (64, 48));
        assert!(format.grayscale);
        assert_eq!(format.channels(), 1);
        assert_eq!(format.fps, 29.97);
    }

    #[test]
    fn test_whole_fps_never_zero() {
        let mut meta = metadata();
        meta.fps = 0.0;
        assert_eq!(SourceDescriptor::new(&meta, None, false).whole_fps(), 1);
    }

    #[test]
    fn test_single_channel_source_stays_single_channel() {
        let mut meta = metadata();
        meta.channels = 1;
        let d = SourceDescriptor::new(&meta, Some((32, 24)), false);
        assert_eq!(d.output_channels(), 1);
        assert!(d.output_format().grayscale);
    }

    #[test]
    fn test_output_format_rate_override() {
        let d = SourceDescriptor::new(&metadata(), None, false);
        assert_eq!(d.output_format().with_fps(12.0).fps, 12.0);
    }
}
