use crate::grid::geometry::BoundingBox;

/// Put columns in left-to-right order and each column's boxes top to bottom.
///
/// Discovery order follows seed restarts, not page position, so columns are
/// re-sorted on their leftmost `x`. Both sorts are stable.
pub fn apply(mut columns: Vec<Vec<BoundingBox>>) -> Vec<Vec<BoundingBox>> {
    columns.sort_by_key(|column| column.iter().map(|b| b.x).min().unwrap_or(i32::MAX));
    for column in &mut columns {
        column.sort_by_key(|b| b.y);
    }
    columns
}
