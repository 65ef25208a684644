pub mod model;
pub mod pipeline;
pub mod shared;
pub mod video;
pub mod windowing;
