//! Individual grid reconstruction stages, in pipeline order

pub mod noise;
pub mod columns;
pub mod normalize;
pub mod order;
pub mod rows;
pub mod assemble;
