pub mod constants;
pub mod frame;
pub mod loader_error;
pub mod source_descriptor;
pub mod video_metadata;
