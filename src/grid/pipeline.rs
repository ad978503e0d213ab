use crate::error::TableError;
use crate::grid::geometry::{
    count_coordinate_duplicates, mean_height, subtract_by_coordinates, validate_boxes,
    BoundingBox,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::stages::{self, assemble::Grid};

/// Tunables of the grid reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of columns the table is known to have
    pub expected_columns: usize,
    /// Half width, in pixels, of the window a box's left edge must fall in to
    /// join a column
    pub column_tolerance: i64,
    /// A box shorter than `mean height / noise_height_divisor` is noise
    pub noise_height_divisor: f64,
    /// Lines closer than `mean height / row_gap_divisor` share a cell
    pub row_gap_divisor: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            expected_columns: 3,
            column_tolerance: 30,
            noise_height_divisor: 1.5,
            row_gap_divisor: 2.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), TableError> {
        if self.expected_columns == 0 {
            return Err(TableError::InvalidConfig(
                "expected_columns must be at least 1".to_string(),
            ));
        }
        if self.column_tolerance <= 0 {
            return Err(TableError::InvalidConfig(format!(
                "column_tolerance must be positive, got {}",
                self.column_tolerance
            )));
        }
        for (name, value) in [
            ("noise_height_divisor", self.noise_height_divisor),
            ("row_gap_divisor", self.row_gap_divisor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TableError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Pipeline stage identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NoiseFilter,
    ColumnClustering,
    ColumnNormalization,
    ColumnOrdering,
    RowClustering,
    GridAssembly,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoiseFilter => "noise_filter",
            Self::ColumnClustering => "column_clustering",
            Self::ColumnNormalization => "column_normalization",
            Self::ColumnOrdering => "column_ordering",
            Self::RowClustering => "row_clustering",
            Self::GridAssembly => "grid_assembly",
        }
    }
}

/// What one stage left behind, recorded when tracing is on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSnapshot {
    pub stage: Stage,
    /// Boxes carried to the next stage
    pub boxes: usize,
    /// Columns or rows produced, 0 for stages that do not group
    pub groups: usize,
    pub elapsed_us: u64,
}

/// Boxes discarded as noise, by the stage that discarded them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoiseReport {
    /// Too short to be text
    pub height_outliers: Vec<BoundingBox>,
    /// Members of columns beyond the expected count
    pub spurious_columns: Vec<BoundingBox>,
}

impl NoiseReport {
    pub fn total(&self) -> usize {
        self.height_outliers.len() + self.spurious_columns.len()
    }
}

/// Result of one reconstruction run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridOutcome {
    pub grid: Grid,
    /// Clean boxes minus every discarded box, compared by coordinates
    pub text_boxes: Vec<BoundingBox>,
    pub noise: NoiseReport,
    /// For each column, left to right, how many of its rows were dropped
    pub dropped_rows: Vec<usize>,
    /// Page-wide mean height of the clean, collapsed boxes, the row gap reference
    pub mean_box_height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<StageSnapshot>>,
}

impl GridOutcome {
    pub fn dropped_row_total(&self) -> usize {
        self.dropped_rows.iter().sum()
    }
}

/// Grid reconstruction over a fixed configuration
#[derive(Debug, Clone)]
pub struct GridPipeline {
    config: GridConfig,
    trace: bool,
}

impl GridPipeline {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            trace: false,
        }
    }

    /// Record a snapshot after each stage
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Rebuild the table grid from raw detected boxes
    pub fn run(&self, boxes: &[BoundingBox]) -> Result<GridOutcome, TableError> {
        self.config.validate()?;
        validate_boxes(boxes)?;

        let duplicates = count_coordinate_duplicates(boxes);
        if duplicates > 0 {
            tracing::warn!(
                "{} boxes share coordinates with another box and will collapse into one",
                duplicates
            );
        }

        let mut trace = self.trace.then(Vec::new);
        let cfg = &self.config;

        let split = self.run_stage(
            Stage::NoiseFilter,
            &mut trace,
            || stages::noise::apply(boxes, cfg.noise_height_divisor),
            |split| (split.clean.len(), 0),
        )?;
        // coordinate twins are one box from here on
        let clean = subtract_by_coordinates(&split.clean, &[]);
        let mean_box_height = mean_height(&clean).ok_or(TableError::EmptyInput)?;

        let columns = self.run_stage(
            Stage::ColumnClustering,
            &mut trace,
            || Ok(stages::columns::apply(&clean, cfg.column_tolerance)),
            |columns| (columns.iter().map(Vec::len).sum(), columns.len()),
        )?;

        let normalized = self.run_stage(
            Stage::ColumnNormalization,
            &mut trace,
            || stages::normalize::apply(columns, cfg.expected_columns),
            |n| (n.columns.iter().map(Vec::len).sum(), n.columns.len()),
        )?;

        let text_boxes = subtract_by_coordinates(&clean, &normalized.discarded);
        let ordered = self.run_stage(
            Stage::ColumnOrdering,
            &mut trace,
            || Ok(stages::order::apply(normalized.columns)),
            |columns| (columns.iter().map(Vec::len).sum(), columns.len()),
        )?;

        let rows = self.run_stage(
            Stage::RowClustering,
            &mut trace,
            || {
                Ok(stages::rows::apply_all(
                    &ordered,
                    mean_box_height,
                    cfg.row_gap_divisor,
                ))
            },
            |rows| {
                let boxes: usize = rows.iter().flat_map(|r| r.values()).map(Vec::len).sum();
                (boxes, rows.iter().map(|r| r.len()).sum())
            },
        )?;

        let assembly = self.run_stage(
            Stage::GridAssembly,
            &mut trace,
            || Ok(stages::assemble::apply(&rows)),
            |a| {
                let boxes: usize = a
                    .grid
                    .rows
                    .iter()
                    .flat_map(|r| r.cells.iter())
                    .map(Vec::len)
                    .sum();
                (boxes, a.grid.row_count())
            },
        )?;

        let noise = NoiseReport {
            height_outliers: split.noise,
            spurious_columns: normalized.discarded,
        };

        tracing::info!(
            "Grid reconstructed: {} rows x {} columns from {} boxes ({} noise, {} rows dropped)",
            assembly.grid.row_count(),
            cfg.expected_columns,
            boxes.len(),
            noise.total(),
            assembly.dropped_rows.iter().sum::<usize>()
        );

        Ok(GridOutcome {
            grid: assembly.grid,
            text_boxes,
            noise,
            dropped_rows: assembly.dropped_rows,
            mean_box_height,
            trace,
        })
    }

    fn run_stage<T, F, C>(
        &self,
        stage: Stage,
        trace: &mut Option<Vec<StageSnapshot>>,
        stage_fn: F,
        counts: C,
    ) -> Result<T, TableError>
    where
        F: FnOnce() -> Result<T, TableError>,
        C: FnOnce(&T) -> (usize, usize),
    {
        let start = Instant::now();
        let result = stage_fn()?;
        if let Some(snapshots) = trace.as_mut() {
            let (boxes, groups) = counts(&result);
            tracing::debug!(
                "Stage {}: {} boxes, {} groups",
                stage.as_str(),
                boxes,
                groups
            );
            snapshots.push(StageSnapshot {
                stage,
                boxes,
                groups,
                elapsed_us: start.elapsed().as_micros() as u64,
            });
        }
        Ok(result)
    }
}
