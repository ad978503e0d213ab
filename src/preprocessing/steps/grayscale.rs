use image::{DynamicImage, GrayImage};

/// Convert the page to single-channel luminance
/// Photos arrive as RGB even when the page is black and white
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}
