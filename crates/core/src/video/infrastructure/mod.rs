pub mod ffmpeg_source;
pub mod ffmpeg_writer;
pub mod memory_source;
