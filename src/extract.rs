//! Page to table orchestration
//!
//! decode -> binarize -> detect boxes -> reconstruct grid -> OCR each cell -> export

use crate::engines::EngineRegistry;
use crate::error::TableError;
use crate::export::{self, ExportConfig};
use crate::grid::{BoundingBox, GridConfig, GridOutcome, GridPipeline};
use crate::preprocessing::{detect_boxes, BinarizeConfig, BinarizePipeline, StepTiming, Thresholder};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Grid and binarization settings for one page
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageSettings {
    pub grid: GridConfig,
    pub binarize: BinarizeConfig,
}

/// Binarization keys accepted in a request's `config` object
#[derive(Debug, Default, Deserialize)]
struct BinarizeOverrides {
    threshold: Option<String>,
    level: Option<u8>,
    light_text: Option<bool>,
    denoise: Option<bool>,
}

impl PageSettings {
    /// Settings for one request
    ///
    /// `overrides` is a flat JSON object; any `GridConfig` field plus
    /// `threshold`, `level`, `light_text` and `denoise` may be set, every
    /// other field keeps the server value.
    pub fn with_overrides(&self, overrides: Option<&Value>) -> Result<Self, TableError> {
        let Some(overrides) = overrides else {
            return Ok(*self);
        };
        let Value::Object(fields) = overrides else {
            return Err(TableError::InvalidConfig(
                "config must be a JSON object".to_string(),
            ));
        };

        let mut grid = serde_json::to_value(self.grid)
            .map_err(|e| TableError::Internal(format!("Failed to encode grid config: {}", e)))?;
        if let Value::Object(base) = &mut grid {
            for (key, value) in fields {
                if base.contains_key(key) {
                    base.insert(key.clone(), value.clone());
                }
            }
        }
        let grid: GridConfig = serde_json::from_value(grid)
            .map_err(|e| TableError::InvalidConfig(format!("Invalid grid config: {}", e)))?;
        grid.validate()?;

        let extra: BinarizeOverrides = serde_json::from_value(overrides.clone())
            .map_err(|e| TableError::InvalidConfig(format!("Invalid binarize config: {}", e)))?;

        let mut binarize = self.binarize;
        if let Some(method) = extra.threshold {
            binarize.thresholder = method.parse()?;
        }
        if let Some(level) = extra.level {
            binarize.thresholder = Thresholder::Global { level };
        }
        if let Some(light_text) = extra.light_text {
            binarize.light_text = light_text;
        }
        if let Some(denoise) = extra.denoise {
            binarize.denoise = denoise;
        }

        Ok(Self { grid, binarize })
    }
}

/// Counts a caller needs to judge a reconstruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub rows: usize,
    pub columns: usize,
    pub dropped_rows: Vec<usize>,
    pub height_outliers: usize,
    pub spurious_columns: usize,
    pub mean_box_height: f64,
}

impl From<&GridOutcome> for GridSummary {
    fn from(outcome: &GridOutcome) -> Self {
        Self {
            rows: outcome.grid.row_count(),
            columns: outcome.grid.column_count(),
            dropped_rows: outcome.dropped_rows.clone(),
            height_outliers: outcome.noise.height_outliers.len(),
            spurious_columns: outcome.noise.spurious_columns.len(),
            mean_box_height: outcome.mean_box_height,
        }
    }
}

/// Boxes found on a page and the grid built from them, no OCR
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub boxes: Vec<BoundingBox>,
    pub outcome: GridOutcome,
    pub threshold: String,
    pub preprocessing: Vec<StepTiming>,
    pub preprocessing_time_ms: u64,
    pub processing_time_ms: u64,
}

/// A fully recognized table
#[derive(Debug, Clone, Serialize)]
pub struct TableExtraction {
    pub engine: String,
    pub rows: Vec<Vec<String>>,
    pub text: String,
    pub summary: GridSummary,
    pub boxes_detected: usize,
    pub preprocessing: Vec<StepTiming>,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Runs whole pages through detection, reconstruction and recognition
pub struct TableExtractor {
    registry: Arc<EngineRegistry>,
    settings: PageSettings,
    export: ExportConfig,
}

impl TableExtractor {
    pub fn new(registry: Arc<EngineRegistry>, settings: PageSettings, export: ExportConfig) -> Self {
        Self {
            registry,
            settings,
            export,
        }
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Detect boxes and rebuild the grid without recognizing any text
    pub async fn detect(
        &self,
        image: DynamicImage,
        overrides: Option<&Value>,
        trace: bool,
    ) -> Result<Detection, TableError> {
        let settings = self.settings.with_overrides(overrides)?;

        tokio::task::spawn_blocking(move || detect_page(&image, &settings, trace))
            .await
            .map_err(|e| TableError::Internal(format!("Detection task failed: {}", e)))?
    }

    /// Recognize a page into delimited rows
    ///
    /// `name` is the upload's file name, used as the stem of the persisted export.
    pub async fn extract(
        &self,
        image: DynamicImage,
        name: &str,
        engine: Option<&str>,
        overrides: Option<&Value>,
    ) -> Result<TableExtraction, TableError> {
        let engine = self.registry.resolve(engine)?;
        let engine_name = engine.name().to_string();
        let settings = self.settings.with_overrides(overrides)?;
        let header = self.export.header(settings.grid.expected_columns)?;
        let delimiter = self.export.delimiter;

        let start = Instant::now();
        let (detection, rows) = tokio::task::spawn_blocking(move || {
            let detection = detect_page(&image, &settings, false)?;
            let rows = export::recognize_grid(engine.as_ref(), &image, &detection.outcome.grid)?;
            Ok::<_, TableError>((detection, rows))
        })
        .await
        .map_err(|e| TableError::Internal(format!("Extraction task failed: {}", e)))??;

        let text = export::to_delimited(&rows, header, delimiter)?;

        let output_path = match &self.export.output_dir {
            Some(dir) => Some(export::persist(dir, name, &text)?.display().to_string()),
            None => None,
        };

        let summary = GridSummary::from(&detection.outcome);
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            name,
            engine = %engine_name,
            rows = summary.rows,
            columns = summary.columns,
            dropped_rows = detection.outcome.dropped_row_total(),
            processing_time_ms,
            "Extracted table"
        );

        Ok(TableExtraction {
            engine: engine_name,
            rows,
            text,
            summary,
            boxes_detected: detection.boxes.len(),
            preprocessing: detection.preprocessing,
            processing_time_ms,
            output_path,
        })
    }
}

fn detect_page(
    image: &DynamicImage,
    settings: &PageSettings,
    trace: bool,
) -> Result<Detection, TableError> {
    let start = Instant::now();

    let binarized = BinarizePipeline::new(settings.binarize).process(image)?;
    let boxes = detect_boxes(&binarized.mask);
    if boxes.is_empty() {
        return Err(TableError::InvalidBoundingBox(
            "no text blobs found on the page".to_string(),
        ));
    }

    let outcome = GridPipeline::new(settings.grid)
        .with_trace(trace)
        .run(&boxes)?;

    Ok(Detection {
        boxes,
        outcome,
        threshold: binarized.threshold,
        preprocessing: binarized.steps,
        preprocessing_time_ms: binarized.total_time_ms,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}
