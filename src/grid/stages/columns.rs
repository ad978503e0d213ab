use crate::grid::geometry::BoundingBox;

/// Group boxes into columns by their left edge.
///
/// Boxes are visited left to right (stable sort on `x`, so boxes sharing an
/// `x` keep their input order). A box joins the open column when its `x` lies
/// in `[centroid - tolerance, centroid + tolerance)`, after which the centroid
/// becomes the floored mean `x` of the column's boxes. Any other box closes the
/// column and seeds a new one. Columns are returned in discovery order.
///
/// The running mean lets a column follow the slow rightward drift that
/// perspective gives to tall columns.
pub fn apply(boxes: &[BoundingBox], tolerance: i64) -> Vec<Vec<BoundingBox>> {
    let mut sorted = boxes.to_vec();
    sorted.sort_by_key(|b| b.x);

    let mut columns: Vec<Vec<BoundingBox>> = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return columns;
    };

    let mut current = vec![first];
    let mut x_sum = i64::from(first.x);
    let mut centroid = i64::from(first.x);

    for bbox in iter {
        let x = i64::from(bbox.x);
        if (centroid - tolerance..centroid + tolerance).contains(&x) {
            current.push(bbox);
            x_sum += x;
            centroid = x_sum.div_euclid(current.len() as i64);
        } else {
            tracing::trace!(
                "Closing column at centroid {} with {} boxes",
                centroid,
                current.len()
            );
            columns.push(std::mem::replace(&mut current, vec![bbox]));
            x_sum = x;
            centroid = x;
        }
    }
    columns.push(current);

    tracing::debug!("Column clustering found {} columns", columns.len());
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bbox(x: i32, y: i32) -> BoundingBox {
        BoundingBox::new(x, y, 100, 40).unwrap()
    }

    #[test]
    fn test_separates_distant_columns() {
        let boxes = [bbox(900, 0), bbox(10, 0), bbox(500, 0), bbox(12, 60)];
        let columns = apply(&boxes, 30);
        assert_eq!(
            columns,
            vec![
                vec![bbox(10, 0), bbox(12, 60)],
                vec![bbox(500, 0)],
                vec![bbox(900, 0)],
            ]
        );
    }

    #[test]
    fn test_window_is_half_open() {
        // centroid 100: 129 joins, 130 starts a new column
        let joined = apply(&[bbox(100, 0), bbox(129, 50)], 30);
        assert_eq!(joined.len(), 1);

        let split = apply(&[bbox(100, 0), bbox(130, 50)], 30);
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn test_centroid_follows_drift() {
        // the third box is 35px right of the seed but inside the window
        // around the running mean (110)
        let boxes = [bbox(100, 0), bbox(120, 50), bbox(135, 100)];
        let columns = apply(&boxes, 30);
        assert_eq!(columns.len(), 1);

        // the same box measured against the seed alone would have been rejected
        let seed_only = apply(&[bbox(100, 0), bbox(135, 100)], 30);
        assert_eq!(seed_only.len(), 2);
    }

    #[test]
    fn test_centroid_is_floored_mean() {
        // mean of 100 and 101 is 100.5, floored to 100: 130 is outside [70, 130)
        let columns = apply(&[bbox(100, 0), bbox(101, 50), bbox(130, 100)], 30);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1], vec![bbox(130, 100)]);
    }

    #[test]
    fn test_equal_x_keeps_input_order() {
        let a = bbox(50, 300);
        let b = bbox(50, 10);
        assert_eq!(apply(&[a, b], 30), vec![vec![a, b]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(apply(&[], 30).is_empty());
    }
}
