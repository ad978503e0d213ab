//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine, statically linked through tesseract-static.
//! Downloads tessdata (training data) automatically on first use.

use super::{cache_dir, fetch_cached};
use crate::config::Config;
use crate::engine::{fold_lines, OcrEngine};
use crate::error::TableError;
use image::DynamicImage;
use tesseract_static::tesseract::Tesseract;

/// Page segmentation: treat the image as a single text line
const PSM_SINGLE_LINE: &str = "7";
/// Page segmentation: assume a single uniform block of text
const PSM_SINGLE_BLOCK: &str = "6";

/// Tesseract OCR Engine
pub struct LeptessEngine {
    /// Path to tessdata directory
    tessdata_path: String,
    language: String,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, TableError> {
        let language = config.default_language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language)?,
        };

        // Fail at startup rather than on the first request
        Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            TableError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }

    fn run(&self, bmp_data: &[u8], page_seg_mode: &str) -> Result<String, TableError> {
        let tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| TableError::ProcessingError(format!("Failed to create Tesseract: {}", e)))?
            .set_variable("tessedit_pageseg_mode", page_seg_mode)
            .map_err(|e| {
                TableError::ProcessingError(format!("Failed to set page segmentation: {}", e))
            })?;

        let mut tess = tess
            .set_image_from_mem(bmp_data)
            .map_err(|e| TableError::ProcessingError(format!("Failed to set image: {}", e)))?
            .recognize()
            .map_err(|e| TableError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        tess.get_text()
            .map_err(|e| TableError::ProcessingError(format!("Failed to get text: {}", e)))
    }
}

impl OcrEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, TableError> {
        // BMP is always supported by leptonica
        let rgb_img = image.to_rgb8();
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(
                &mut std::io::Cursor::new(&mut bmp_data),
                image::ImageFormat::Bmp,
            )
            .map_err(|e| TableError::ProcessingError(format!("Failed to convert to BMP: {}", e)))?;

        let text = fold_lines(&self.run(&bmp_data, PSM_SINGLE_LINE)?);
        if !text.is_empty() {
            return Ok(text);
        }

        tracing::debug!(
            width = rgb_img.width(),
            height = rgb_img.height(),
            "Single-line pass found nothing, retrying as a text block"
        );
        Ok(fold_lines(&self.run(&bmp_data, PSM_SINGLE_BLOCK)?))
    }

    fn supported_languages(&self) -> Vec<String> {
        // Only the configured language is loaded
        vec![self.language.clone()]
    }
}

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, TableError> {
    let dir = cache_dir("tessdata")?;
    let traineddata_path = dir.join(format!("{}.traineddata", language));

    fetch_cached(&tessdata_url(language), &traineddata_path)?;

    // Tesseract expects the directory, not the file
    dir.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| TableError::InitializationError("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
