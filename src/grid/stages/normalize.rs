use crate::error::TableError;
use crate::grid::geometry::BoundingBox;

/// Columns trimmed to the expected count
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedColumns {
    /// Exactly the expected number of columns, still in discovery order
    pub columns: Vec<Vec<BoundingBox>>,
    /// Boxes of the discarded columns, in the order they were discarded
    pub discarded: Vec<BoundingBox>,
}

/// Drop spurious columns until `expected` remain.
///
/// Long ruling-line fragments that survive erosion tend to form thin extra
/// columns between the real ones. The column with the fewest boxes is dropped
/// first; among equally small columns the earliest discovered one goes.
/// Finding fewer columns than expected is an error, never padded.
pub fn apply(
    mut columns: Vec<Vec<BoundingBox>>,
    expected: usize,
) -> Result<NormalizedColumns, TableError> {
    if columns.len() < expected {
        return Err(TableError::InsufficientColumns {
            found: columns.len(),
            expected,
        });
    }

    let mut discarded = Vec::new();
    while columns.len() > expected {
        let Some(smallest) = columns
            .iter()
            .enumerate()
            .min_by_key(|(_, column)| column.len())
            .map(|(index, _)| index)
        else {
            break;
        };
        let column = columns.remove(smallest);
        tracing::debug!(
            "Discarding column {} ({} boxes) as noise",
            smallest + 1,
            column.len()
        );
        discarded.extend(column);
    }

    Ok(NormalizedColumns { columns, discarded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column(x: i32, count: i32) -> Vec<BoundingBox> {
        (0..count)
            .map(|i| BoundingBox::new(x, i * 60, 100, 40).unwrap())
            .collect()
    }

    #[test]
    fn test_smallest_extra_column_becomes_noise() {
        let columns = vec![column(10, 5), column(300, 2), column(500, 5), column(900, 5)];
        let result = apply(columns, 3).unwrap();

        assert_eq!(
            result.columns,
            vec![column(10, 5), column(500, 5), column(900, 5)]
        );
        assert_eq!(result.discarded, column(300, 2));
    }

    #[test]
    fn test_ties_drop_first_discovered() {
        let columns = vec![
            column(10, 4),
            column(200, 1),
            column(400, 4),
            column(600, 1),
            column(800, 4),
        ];
        let result = apply(columns, 3).unwrap();

        assert_eq!(
            result.columns,
            vec![column(10, 4), column(400, 4), column(800, 4)]
        );
        let mut expected_noise = column(200, 1);
        expected_noise.extend(column(600, 1));
        assert_eq!(result.discarded, expected_noise);
    }

    #[test]
    fn test_exact_count_passes_through() {
        let columns = vec![column(10, 3), column(400, 1), column(800, 2)];
        let result = apply(columns.clone(), 3).unwrap();
        assert_eq!(result.columns, columns);
        assert!(result.discarded.is_empty());
    }

    #[test]
    fn test_too_few_columns_fails() {
        let err = apply(vec![column(10, 3), column(400, 3)], 3).unwrap_err();
        assert!(matches!(
            err,
            TableError::InsufficientColumns {
                found: 2,
                expected: 3
            }
        ));
    }
}
