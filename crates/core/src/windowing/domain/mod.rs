pub mod batch;
pub mod batch_cursor;
pub mod frame_order;
pub mod frame_transform;
pub mod window_plan;
