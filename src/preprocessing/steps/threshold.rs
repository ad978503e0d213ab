use crate::error::TableError;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use serde::Serialize;
use std::str::FromStr;

/// Default level for the fixed global threshold
pub const GLOBAL_LEVEL: u8 = 127;

/// Sauvola defaults
pub const ADAPTIVE_WINDOW: u32 = 15;
pub const ADAPTIVE_K: f32 = 0.2;
const R: f32 = 128.0; // Dynamic range / 2

/// Binarization strategy
///
/// Every variant maps a grayscale page to pixels that are strictly 0 or 255,
/// with 255 wherever the source pixel is brighter than the local or global level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Thresholder {
    /// Fixed level for evenly lit, pre-cleaned scans
    Global { level: u8 },
    /// Level chosen from the page histogram
    Otsu,
    /// Sauvola thresholding, tolerant of uneven lighting
    Adaptive { window: u32, k: f32 },
}

impl Default for Thresholder {
    fn default() -> Self {
        Self::Global {
            level: GLOBAL_LEVEL,
        }
    }
}

impl FromStr for Thresholder {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(Self::Global {
                level: GLOBAL_LEVEL,
            }),
            "otsu" => Ok(Self::Otsu),
            "adaptive" => Ok(Self::Adaptive {
                window: ADAPTIVE_WINDOW,
                k: ADAPTIVE_K,
            }),
            other => Err(TableError::InvalidConfig(format!(
                "Unknown threshold method '{}' (expected global, otsu or adaptive)",
                other
            ))),
        }
    }
}

impl Thresholder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global { .. } => "global",
            Self::Otsu => "otsu",
            Self::Adaptive { .. } => "adaptive",
        }
    }

    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        match *self {
            Self::Global { level } => binarize(image, level),
            Self::Otsu => binarize(image, otsu_level(image)),
            Self::Adaptive { window, k } => sauvola_threshold(image, window, k),
        }
    }
}

fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y).0[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Sauvola adaptive thresholding
///
/// For each pixel, threshold = mean * (1 + k * (std_dev / R - 1))
/// where R is max standard deviation (128 for 8-bit images)
fn sauvola_threshold(img: &GrayImage, window_size: u32, k: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    let half_window = window_size.max(1) as i32 / 2;

    let (integral, integral_sq) = compute_integral_images(img);

    GrayImage::from_fn(width, height, |x, y| {
        let x1 = (x as i32 - half_window).max(0) as u32;
        let y1 = (y as i32 - half_window).max(0) as u32;
        let x2 = (x as i32 + half_window).min(width as i32 - 1) as u32;
        let y2 = (y as i32 + half_window).min(height as i32 - 1) as u32;

        let (mean, std_dev) = window_stats(&integral, &integral_sq, (x1, y1), (x2, y2));
        let threshold = mean * (1.0 + k * (std_dev / R - 1.0));

        let pixel = img.get_pixel(x, y).0[0] as f32;
        if pixel > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Integral image and integral of squared values, one row/column of zero padding
fn compute_integral_images(img: &GrayImage) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let (width, height) = img.dimensions();
    let mut integral = vec![vec![0.0f64; width as usize + 1]; height as usize + 1];
    let mut integral_sq = vec![vec![0.0f64; width as usize + 1]; height as usize + 1];

    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let val = pixel.0[0] as f64;
        integral[y + 1][x + 1] = val + integral[y][x + 1] + integral[y + 1][x] - integral[y][x];
        integral_sq[y + 1][x + 1] =
            val * val + integral_sq[y][x + 1] + integral_sq[y + 1][x] - integral_sq[y][x];
    }

    (integral, integral_sq)
}

fn window_stats(
    integral: &[Vec<f64>],
    integral_sq: &[Vec<f64>],
    top_left: (u32, u32),
    bottom_right: (u32, u32),
) -> (f32, f32) {
    let (x1, y1) = (top_left.0 as usize, top_left.1 as usize);
    let (x2, y2) = (bottom_right.0 as usize + 1, bottom_right.1 as usize + 1);
    let area = ((x2 - x1) * (y2 - y1)) as f64;

    let sum = integral[y2][x2] - integral[y1][x2] - integral[y2][x1] + integral[y1][x1];
    let sum_sq =
        integral_sq[y2][x2] - integral_sq[y1][x2] - integral_sq[y2][x1] + integral_sq[y1][x1];

    let mean = sum / area;
    let variance = (sum_sq / area) - (mean * mean);

    (mean as f32, variance.max(0.0).sqrt() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_line() -> GrayImage {
        let mut img = GrayImage::from_pixel(50, 20, Luma([240]));
        for x in 10..40 {
            img.put_pixel(x, 10, Luma([20]));
        }
        img
    }

    fn assert_binary(img: &GrayImage) {
        for pixel in img.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_every_method_outputs_binary_pixels() {
        let gradient = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        for method in ["global", "otsu", "adaptive"] {
            let thresholder: Thresholder = method.parse().unwrap();
            assert_binary(&thresholder.apply(&gradient));
        }
    }

    #[test]
    fn test_every_method_separates_text_from_background() {
        for method in ["global", "otsu", "adaptive"] {
            let thresholder: Thresholder = method.parse().unwrap();
            let result = thresholder.apply(&text_line());

            assert_eq!(result.get_pixel(25, 10).0[0], 0, "{} text", method);
            assert_eq!(result.get_pixel(25, 5).0[0], 255, "{} background", method);
        }
    }

    #[test]
    fn test_global_level_is_strictly_greater() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([126 + x as u8]));

        let result = Thresholder::default().apply(&img);

        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 0);
        assert_eq!(result.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "Adaptive".parse::<Thresholder>().unwrap(),
            Thresholder::Adaptive {
                window: 15,
                k: 0.2
            }
        );
        assert_eq!("otsu".parse::<Thresholder>().unwrap().as_str(), "otsu");
        assert!(matches!(
            "median".parse::<Thresholder>(),
            Err(TableError::InvalidConfig(_))
        ));
    }
}
