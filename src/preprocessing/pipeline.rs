use crate::error::TableError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;
use super::steps::threshold::Thresholder;

/// Binarization settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BinarizeConfig {
    pub thresholder: Thresholder,
    /// Page already shows light text on a dark background, skip inversion
    pub light_text: bool,
    /// Run a median filter before thresholding
    pub denoise: bool,
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Binary text mask plus timing stats
#[derive(Debug, Clone, Serialize)]
pub struct BinarizeResult {
    /// White text blobs on black (not serialized)
    #[serde(skip)]
    pub mask: GrayImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Threshold method used
    pub threshold: String,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Turns a page photo into a dilated text mask ready for blob detection
pub struct BinarizePipeline {
    config: BinarizeConfig,
}

impl BinarizePipeline {
    pub fn new(config: BinarizeConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, image: &DynamicImage) -> Result<BinarizeResult, TableError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TableError::PreprocessingError(
                "Image has no pixels".to_string(),
            ));
        }

        let start = Instant::now();
        let mut timings = Vec::new();

        let mut img = run_step("grayscale", &mut timings, || {
            steps::grayscale::apply(image)
        });

        if self.config.denoise {
            img = run_step("denoise", &mut timings, || steps::denoise::apply(&img));
        }

        let thresholder = self.config.thresholder;
        img = run_step("threshold", &mut timings, || thresholder.apply(&img));

        // Dark text must become foreground for dilation and contour tracing
        if !self.config.light_text {
            img = run_step("invert", &mut timings, || steps::invert::apply(img));
        }

        img = run_step("dilate", &mut timings, || steps::dilate::apply(&img));

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            threshold = thresholder.as_str(),
            steps = timings.len(),
            total_time_ms,
            "Binarized page"
        );

        Ok(BinarizeResult {
            mask: img,
            total_time_ms,
            threshold: thresholder.as_str().to_string(),
            steps: timings,
        })
    }
}

fn run_step<F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> GrayImage
where
    F: FnOnce() -> GrayImage,
{
    let step_start = Instant::now();
    let result = step_fn();
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    result
}
