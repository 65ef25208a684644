pub mod encode_video_use_case;
pub mod export_batch_use_case;
pub mod frame_metrics;
pub mod pass_logger;
pub mod reconstruct_video_use_case;
