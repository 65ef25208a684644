use thiserror::Error;

/// Failures the loader reports to its caller.
///
/// Configuration variants are raised before any frame is read. Read failures
/// in the middle of a pass are not errors: the pass simply ends early.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    #[error("stride must be greater than zero")]
    ZeroStride,
    #[error("stride {stride} does not evenly divide batch size {batch_size}")]
    StrideMismatch { stride: usize, batch_size: usize },
    #[error("sample ratio must be in (0, 1], got {0}")]
    InvalidSampleRatio(f64),
    #[error("target size must be non-zero, got {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },
    #[error("time offsets must be finite and non-negative, got {0}")]
    InvalidSeconds(f64),
    #[error("failed to open frame source: {0}")]
    Source(#[source] Box<dyn std::error::Error>),
    #[error("model failed on batch {batch}: {source}")]
    Model {
        batch: usize,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("buffer shape {actual:?} does not match batch shape {expected:?}")]
    BufferShape {
        expected: [usize; 4],
        actual: Vec<usize>,
    },
    #[error("failed to read config from {path}: {source}")]
    ConfigRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid loader config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl LoaderError {
    /// True for errors caused by an invalid combination of settings.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LoaderError::ZeroBatchSize
                | LoaderError::ZeroStride
                | LoaderError::StrideMismatch { .. }
                | LoaderError::InvalidSampleRatio(_)
                | LoaderError::InvalidTargetSize { .. }
                | LoaderError::InvalidSeconds(_)
                | LoaderError::ConfigParse(_)
        )
    }
}
