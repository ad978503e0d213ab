//! Table grid reconstruction
//!
//! Turns the unordered text boxes found on a page into rows of cells: noise
//! filtering, column clustering and trimming, column ordering, per-column row
//! clustering and row alignment across columns.

pub mod geometry;
pub mod pipeline;
pub mod stages;

pub use geometry::BoundingBox;
pub use pipeline::{GridConfig, GridOutcome, GridPipeline};
pub use stages::assemble::Grid;
