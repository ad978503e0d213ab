use super::rows::RowMap;
use crate::grid::geometry::BoundingBox;
use serde::Serialize;
use std::collections::BTreeSet;

/// One table row: exactly one cell per column, left to right
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    /// Row index shared by every column
    pub index: usize,
    /// Each cell lists its text line boxes top to bottom
    pub cells: Vec<Vec<BoundingBox>>,
}

/// The reconstructed table, rows top to bottom
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub rows: Vec<GridRow>,
}

impl Grid {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, |row| row.cells.len())
    }
}

/// Grid plus what had to be left out to build it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub grid: Grid,
    /// Rows of each column that were not in every column
    pub dropped_rows: Vec<usize>,
}

/// Align the columns' rows into one grid.
///
/// Only row indices present in every column are kept; a row missing from any
/// column is dropped from all of them rather than reconstructed. The number of
/// rows each column lost is reported alongside the grid.
pub fn apply(columns: &[RowMap]) -> Assembly {
    let Some((first, rest)) = columns.split_first() else {
        return Assembly {
            grid: Grid::default(),
            dropped_rows: Vec::new(),
        };
    };

    let mut common: BTreeSet<usize> = first.keys().copied().collect();
    for rows in rest {
        common.retain(|index| rows.contains_key(index));
    }

    let rows = common
        .iter()
        .map(|&index| GridRow {
            index,
            cells: columns
                .iter()
                .map(|rows| rows.get(&index).cloned().unwrap_or_default())
                .collect(),
        })
        .collect();

    let dropped_rows: Vec<usize> = columns
        .iter()
        .map(|rows| rows.len() - common.len())
        .collect();

    if dropped_rows.iter().any(|&count| count > 0) {
        tracing::warn!(
            "Dropped rows not present in every column (per column: {:?}), kept {}",
            dropped_rows,
            common.len()
        );
    }

    Assembly {
        grid: Grid { rows },
        dropped_rows,
    }
}
