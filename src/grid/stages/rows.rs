use crate::grid::geometry::BoundingBox;
use std::collections::BTreeMap;

/// Row index (from 1) to the boxes of that row, top to bottom
pub type RowMap = BTreeMap<usize, Vec<BoundingBox>>;

/// Split one y-sorted column into rows.
///
/// Consecutive boxes whose vertical gap (next top minus previous bottom, in
/// absolute value) is below `mean_height / divisor` are lines of the same
/// cell. `mean_height` is the page-wide mean over all clean boxes, not the
/// column's own.
pub fn apply(column: &[BoundingBox], mean_height: f64, divisor: f64) -> RowMap {
    let threshold = mean_height / divisor;
    let mut rows = RowMap::new();
    let Some((first, rest)) = column.split_first() else {
        return rows;
    };

    let mut index = 1;
    rows.insert(index, vec![*first]);
    let mut previous = first;

    for bbox in rest {
        let gap = (i64::from(bbox.y) - i64::from(previous.bottom())).abs();
        if (gap as f64) >= threshold {
            index += 1;
        }
        rows.entry(index).or_default().push(*bbox);
        previous = bbox;
    }

    rows
}

/// Row maps for every ordered column
pub fn apply_all(columns: &[Vec<BoundingBox>], mean_height: f64, divisor: f64) -> Vec<RowMap> {
    columns
        .iter()
        .map(|column| apply(column, mean_height, divisor))
        .collect()
}
