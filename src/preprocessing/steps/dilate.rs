use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, grayscale_dilate, Mask};

/// Wide, short kernel that bridges the gaps between words on one line
const WORD_KERNEL: (u8, u8) = (10, 2);
const WORD_ITERATIONS: usize = 5;

/// Square 5x5 kernel (radius 2) that swallows accents and punctuation
const BLOB_RADIUS: u8 = 2;
const BLOB_ITERATIONS: usize = 2;

/// Grow white text into one blob per line of a cell
///
/// Expects white text on black. Horizontal growth is much larger than vertical
/// growth so neighbouring text lines stay separate.
pub fn apply(image: &GrayImage) -> GrayImage {
    let word = rect_mask(WORD_KERNEL.0, WORD_KERNEL.1);

    let mut img = image.clone();
    for _ in 0..WORD_ITERATIONS {
        img = grayscale_dilate(&img, &word);
    }
    for _ in 0..BLOB_ITERATIONS {
        img = dilate(&img, Norm::LInf, BLOB_RADIUS);
    }
    img
}

/// Full `width` x `height` rectangle anchored at (`width / 2`, `height / 2`),
/// so even-sized kernels reach one pixel further back than forward
pub fn rect_mask(width: u8, height: u8) -> Mask {
    let shape = GrayImage::from_pixel(u32::from(width), u32::from(height), Luma([255]));
    Mask::from_image(&shape, width / 2, height / 2)
}
