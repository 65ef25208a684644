pub mod domain;
pub mod loader_config;
pub mod pass;
pub mod video_loader;
