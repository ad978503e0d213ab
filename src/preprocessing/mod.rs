//! Page binarization and text blob detection
//!
//! Turns an uploaded, pre-cleaned table image into the bounding boxes the grid
//! reconstruction consumes.

pub mod boxes;
pub mod pipeline;
pub mod steps;

pub use boxes::detect_boxes;
pub use pipeline::{BinarizeConfig, BinarizePipeline, StepTiming};
pub use steps::threshold::Thresholder;
