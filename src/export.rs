//! Delimited text export of a recognized grid

use crate::engine::OcrEngine;
use crate::error::TableError;
use crate::grid::{BoundingBox, Grid};
use csv::{QuoteStyle, WriterBuilder};
use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_DELIMITER: u8 = b'|';

/// Where and how finished tables are written
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub delimiter: u8,
    /// Persist `<stem>.csv` here when set
    pub output_dir: Option<PathBuf>,
    /// Header record, one name per column
    pub column_names: Option<Vec<String>>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            output_dir: None,
            column_names: None,
        }
    }
}

impl ExportConfig {
    /// Header for a table of `columns` columns, if one is configured
    pub fn header(&self, columns: usize) -> Result<Option<&[String]>, TableError> {
        match &self.column_names {
            Some(names) if names.len() != columns => Err(TableError::InvalidConfig(format!(
                "{} column names configured for a {}-column table",
                names.len(),
                columns
            ))),
            Some(names) => Ok(Some(names.as_slice())),
            None => Ok(None),
        }
    }
}

/// Cut one box out of the page, clamped to the image bounds
///
/// Returns `None` when nothing of the box lies inside the image.
pub fn crop_box(image: &DynamicImage, bbox: &BoundingBox) -> Option<DynamicImage> {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));

    let x0 = i64::from(bbox.x).clamp(0, width);
    let y0 = i64::from(bbox.y).clamp(0, height);
    let x1 = i64::from(bbox.right()).clamp(0, width);
    let y1 = i64::from(bbox.bottom()).clamp(0, height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(image.crop_imm(
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    ))
}

/// Recognize every box of a cell on its own and join the fragments
pub fn recognize_cell(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    cell: &[BoundingBox],
) -> Result<String, TableError> {
    let mut fragments = Vec::with_capacity(cell.len());
    for bbox in cell {
        match crop_box(image, bbox) {
            Some(crop) => fragments.push(engine.recognize(&crop)?),
            None => tracing::warn!(?bbox, "Box lies outside the image, skipping"),
        }
    }
    Ok(join_fragments(&fragments))
}

/// Join a cell's text fragments in box order with single spaces
///
/// Fragments the engine returned empty are left out so they never leave
/// doubled spaces behind.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Recognize every cell of the grid, one `Vec` of fields per row
pub fn recognize_grid(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    grid: &Grid,
) -> Result<Vec<Vec<String>>, TableError> {
    grid.rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| recognize_cell(engine, image, cell))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

/// Render rows as delimited text, one line per row, after an optional header
///
/// Fields are quoted only when they contain the delimiter, a quote or a line break.
pub fn to_delimited(
    rows: &[Vec<String>],
    header: Option<&[String]>,
    delimiter: u8,
) -> Result<String, TableError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::<u8>::new());

    if let Some(names) = header {
        writer
            .write_record(names)
            .map_err(|e| TableError::ExportError(format!("Failed to write header: {}", e)))?;
    }
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| TableError::ExportError(format!("Failed to write row: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| TableError::ExportError(format!("Failed to flush rows: {}", e)))?;

    let bytes = writer
        .into_inner()
        .map_err(|e| TableError::ExportError(format!("Failed to finish export: {}", e.error())))?;
    String::from_utf8(bytes)
        .map_err(|e| TableError::ExportError(format!("Export is not valid UTF-8: {}", e)))
}

/// Atomically write `contents` to `<dir>/<stem>.csv`
pub fn persist(dir: &Path, stem: &str, contents: &str) -> Result<PathBuf, TableError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        TableError::ExportError(format!("Failed to create output directory {:?}: {}", dir, e))
    })?;

    let target = dir.join(format!("{}.csv", sanitize_stem(stem)));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| TableError::ExportError(format!("Failed to create temp file: {}", e)))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| TableError::ExportError(format!("Failed to write export: {}", e)))?;
    tmp.persist(&target)
        .map_err(|e| TableError::ExportError(format!("Failed to store {:?}: {}", target, e)))?;

    tracing::info!(path = ?target, bytes = contents.len(), "Table exported");
    Ok(target)
}

/// File stem of an upload, with path separators and dots stripped
pub fn sanitize_stem(name: &str) -> String {
    let base = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "table".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::stages::assemble::GridRow;
    use image::{GrayImage, Luma};
    use pretty_assertions::assert_eq;

    /// Reports the crop size so tests can see what the engine was given
    struct SizeEngine;

    impl OcrEngine for SizeEngine {
        fn name(&self) -> &'static str {
            "size"
        }

        fn description(&self) -> &'static str {
            "reports crop sizes"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<String, TableError> {
            Ok(format!("{}x{}", image.width(), image.height()))
        }

        fn supported_languages(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 50, Luma([255])))
    }

    fn bbox(x: i32, y: i32, width: i32, height: i32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_crop_inside_image() {
        let crop = crop_box(&page(), &bbox(10, 5, 30, 20)).unwrap();
        assert_eq!((crop.width(), crop.height()), (30, 20));
    }

    #[test]
    fn test_crop_is_clamped_to_image() {
        let crop = crop_box(&page(), &bbox(-5, 40, 200, 30)).unwrap();
        assert_eq!((crop.width(), crop.height()), (100, 10));
    }

    #[test]
    fn test_crop_outside_image() {
        assert!(crop_box(&page(), &bbox(150, 10, 20, 20)).is_none());
    }

    #[test]
    fn test_cell_fragments_joined_in_box_order() {
        let cell = [bbox(0, 0, 10, 5), bbox(0, 10, 20, 6), bbox(500, 0, 5, 5)];

        let text = recognize_cell(&SizeEngine, &page(), &cell).unwrap();

        assert_eq!(text, "10x5 20x6");
    }

    #[test]
    fn test_recognize_grid_keeps_shape() {
        let grid = Grid {
            rows: vec![GridRow {
                index: 1,
                cells: vec![vec![bbox(0, 0, 4, 4)], vec![bbox(50, 0, 8, 4)]],
            }],
        };

        let result = recognize_grid(&SizeEngine, &page(), &grid).unwrap();

        assert_eq!(result, rows(&[&["4x4", "8x4"]]));
    }

    #[test]
    fn test_join_skips_empty_fragments() {
        assert_eq!(join_fragments(&["Net", "", "amount"]), "Net amount");
        assert_eq!(join_fragments::<&str>(&[]), "");
    }

    #[test]
    fn test_pipe_delimited_rows() {
        let text = to_delimited(&rows(&[&["a", "b", "c"], &["1", "", "3"]]), None, b'|').unwrap();
        assert_eq!(text, "a|b|c\n1||3\n");
    }

    #[test]
    fn test_header_written_first() {
        let header = ["Item".to_string(), "Qty".to_string(), "Price".to_string()];
        let text = to_delimited(&rows(&[&["nails", "40", "2.10"]]), Some(&header[..]), b'|').unwrap();
        assert_eq!(text, "Item|Qty|Price\nnails|40|2.10\n");
    }

    #[test]
    fn test_header_must_match_column_count() {
        let export = ExportConfig {
            column_names: Some(vec!["Item".to_string(), "Qty".to_string()]),
            ..Default::default()
        };

        assert_eq!(export.header(2).unwrap().map(<[String]>::len), Some(2));
        assert!(matches!(export.header(3), Err(TableError::InvalidConfig(_))));
        assert_eq!(ExportConfig::default().header(3).unwrap(), None);
    }

    #[test]
    fn test_quotes_only_when_needed() {
        let text = to_delimited(&rows(&[&["x|y", "say \"hi\"", "plain"]]), None, b'|').unwrap();
        assert_eq!(text, "\"x|y\"|\"say \"\"hi\"\"\"|plain\n");
    }

    #[test]
    fn test_other_delimiter() {
        let text = to_delimited(&rows(&[&["a|b", "c"]]), None, b';').unwrap();
        assert_eq!(text, "a|b;c\n");
    }

    #[test]
    fn test_persist_writes_csv_named_after_upload() {
        let dir = tempfile::tempdir().unwrap();

        let path = persist(dir.path(), "scans/page 1.png", "a|b\n").unwrap();

        assert_eq!(path, dir.path().join("page_1.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a|b\n");
    }

    #[test]
    fn test_persist_replaces_previous_export() {
        let dir = tempfile::tempdir().unwrap();

        persist(dir.path(), "page", "old\n").unwrap();
        let path = persist(dir.path(), "page", "new\n").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "new\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("invoice.jpg"), "invoice");
        assert_eq!(sanitize_stem("../etc/passwd"), "passwd");
        assert_eq!(sanitize_stem(""), "table");
    }
}
