use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Axis-aligned box around one detected blob of ink.
///
/// Pixel units, origin at the top-left corner of the page. Equality is by the
/// full coordinate tuple, so two distinct detections with identical geometry
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self, TableError> {
        let bbox = Self {
            x,
            y,
            width,
            height,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<(), TableError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(TableError::InvalidBoundingBox(format!(
                "({}, {}, {}, {}) must have a positive width and height",
                self.x, self.y, self.width, self.height
            )));
        }
        Ok(())
    }

    /// y coordinate of the bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// x coordinate of the right edge
    pub fn right(&self) -> i32 {
        self.x + self.width
    }
}

impl TryFrom<[i32; 4]> for BoundingBox {
    type Error = TableError;

    fn try_from([x, y, width, height]: [i32; 4]) -> Result<Self, Self::Error> {
        Self::new(x, y, width, height)
    }
}

/// Check an ingested box list before any clustering runs.
pub fn validate_boxes(boxes: &[BoundingBox]) -> Result<(), TableError> {
    if boxes.is_empty() {
        return Err(TableError::InvalidBoundingBox(
            "no bounding boxes supplied".to_string(),
        ));
    }
    boxes.iter().try_for_each(BoundingBox::validate)
}

/// Arithmetic mean of the box heights, `None` for an empty slice.
pub fn mean_height(boxes: &[BoundingBox]) -> Option<f64> {
    if boxes.is_empty() {
        return None;
    }
    let total: f64 = boxes.iter().map(|b| f64::from(b.height)).sum();
    Some(total / boxes.len() as f64)
}

/// Remove every box whose coordinates match a removed box.
///
/// Works on coordinate sets: boxes sharing the same `(x, y, width, height)`
/// collapse into a single entry, and a removed box takes out all of its
/// coordinate twins. First-occurrence order is kept.
pub fn subtract_by_coordinates(
    boxes: &[BoundingBox],
    removed: &[BoundingBox],
) -> Vec<BoundingBox> {
    let removed: HashSet<&BoundingBox> = removed.iter().collect();
    let mut seen = HashSet::with_capacity(boxes.len());
    boxes
        .iter()
        .filter(|b| !removed.contains(b) && seen.insert(**b))
        .copied()
        .collect()
}

/// Number of boxes that share their coordinates with an earlier box.
pub fn count_coordinate_duplicates(boxes: &[BoundingBox]) -> usize {
    let mut seen = HashSet::with_capacity(boxes.len());
    boxes.iter().filter(|b| !seen.insert(**b)).count()
}
