pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Seed used by random-subset sampling when the caller does not pick one.
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

/// Frame rate assumed when writing a video whose source reported none.
pub const FALLBACK_FPS: i32 = 30;

/// Returned by reconstruction comparisons when the two buffers disagree in shape.
pub const INVALID_RECONSTRUCTION_ERROR: f64 = -1.0;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "webm", "m4v"];
