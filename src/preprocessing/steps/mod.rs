//! Individual binarization steps

pub mod denoise;
pub mod dilate;
pub mod grayscale;
pub mod invert;
pub mod threshold;
