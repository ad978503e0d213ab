use crate::error::TableError;
use image::DynamicImage;

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Read the text of one cropped box (a single physical text line)
    ///
    /// Implementations return the text already passed through [`fold_lines`].
    fn recognize(&self, image: &DynamicImage) -> Result<String, TableError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}

/// Collapse recognized text onto one line
///
/// Line breaks become single spaces, blank lines vanish and the result is trimmed,
/// so a cell never spills over several rows of the export.
pub fn fold_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_lines_joins_with_single_space() {
        assert_eq!(fold_lines("Total\namount\n"), "Total amount");
    }

    #[test]
    fn test_fold_lines_drops_blank_lines_and_padding() {
        assert_eq!(fold_lines("  12.50 \r\n\n\n EUR  "), "12.50 EUR");
    }

    #[test]
    fn test_fold_lines_keeps_inner_spacing() {
        assert_eq!(fold_lines("a  b"), "a  b");
    }

    #[test]
    fn test_fold_lines_empty() {
        assert_eq!(fold_lines(""), "");
        assert_eq!(fold_lines("\n \n"), "");
    }
}
