use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::shared::constants::DEFAULT_BATCH_SIZE;
use crate::shared::loader_error::LoaderError;

/// Everything that shapes a loader's passes.
///
/// Frame-valued fields win over their time-valued counterparts when both are
/// set. `stride` falls back to `batch_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub start_seconds: Option<f64>,
    pub start_frame: Option<usize>,
    pub duration_seconds: Option<f64>,
    pub duration_frames: Option<usize>,
    pub batch_size: usize,
    pub stride: Option<usize>,
    pub skip_frame: usize,
    pub random_order: bool,
    pub grayscale: bool,
    pub target_size: Option<(u32, u32)>,
    pub predict_next_frame: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            start_seconds: None,
            start_frame: None,
            duration_seconds: None,
            duration_frames: None,
            batch_size: DEFAULT_BATCH_SIZE,
            stride: None,
            skip_frame: 0,
            random_order: false,
            grayscale: false,
            target_size: None,
            predict_next_frame: false,
        }
    }
}

impl LoaderConfig {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, LoaderError> {
        let json = fs::read_to_string(path).map_err(|source| LoaderError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, LoaderError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, LoaderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_start_seconds(mut self, seconds: f64) -> Self {
        self.start_seconds = Some(seconds);
        self
    }

    pub fn with_start_frame(mut self, frame: usize) -> Self {
        self.start_frame = Some(frame);
        self
    }

    pub fn with_duration_seconds(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_duration_frames(mut self, frames: usize) -> Self {
        self.duration_frames = Some(frames);
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub fn with_skip_frame(mut self, skip: usize) -> Self {
        self.skip_frame = skip;
        self
    }

    pub fn with_random_order(mut self, random: bool) -> Self {
        self.random_order = random;
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_size = Some((width, height));
        self
    }

    pub fn with_predict_next_frame(mut self, predict: bool) -> Self {
        self.predict_next_frame = predict;
        self
    }

    pub fn effective_stride(&self) -> usize {
        self.stride.unwrap_or(self.batch_size)
    }

    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.batch_size == 0 {
            return Err(LoaderError::ZeroBatchSize);
        }
        let stride = self.effective_stride();
        if stride == 0 {
            return Err(LoaderError::ZeroStride);
        }
        if self.batch_size % stride != 0 {
            return Err(LoaderError::StrideMismatch {
                stride,
                batch_size: self.batch_size,
            });
        }
        if let Some((width, height)) = self.target_size {
            if width == 0 || height == 0 {
                return Err(LoaderError::InvalidTargetSize { width, height });
            }
        }
        for seconds in [self.start_seconds, self.duration_seconds].into_iter().flatten() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(LoaderError::InvalidSeconds(seconds));
            }
        }
        Ok(())
    }
}
