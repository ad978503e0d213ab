use image::GrayImage;
use imageproc::filter::median_filter;

/// Remove salt-and-pepper specks before thresholding
/// Isolated specks would otherwise dilate into small blobs
pub fn apply(image: &GrayImage) -> GrayImage {
    // 3x3 median (radius 1) keeps glyph edges sharp
    median_filter(image, 1, 1)
}
