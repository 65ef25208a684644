pub mod batch_model;
