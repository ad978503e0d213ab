use image::{imageops, GrayImage};

/// Flip a binary page so text is foreground (white on black)
pub fn apply(mut image: GrayImage) -> GrayImage {
    imageops::invert(&mut image);
    image
}
