use crate::export::ExportConfig;
use crate::extract::PageSettings;
use crate::grid::GridConfig;
use crate::preprocessing::{BinarizeConfig, Thresholder};
use crate::Args;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub default_language: String,
    pub max_file_size: usize,
    /// Tessdata directory, downloaded into the cache when unset
    #[cfg_attr(not(feature = "engine-leptess"), allow(dead_code))]
    pub tessdata_path: Option<String>,
    pub disable_ocr: bool,
    pub page: PageSettings,
    pub export: ExportConfig,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let thresholder = match args.threshold {
            Thresholder::Global { .. } => Thresholder::Global {
                level: args.threshold_level,
            },
            other => other,
        };

        Self {
            host: args.host,
            port: args.port,
            default_language: args.default_language,
            max_file_size: args.max_file_size,
            tessdata_path: args.tessdata_path,
            disable_ocr: args.disable_ocr,
            page: PageSettings {
                grid: GridConfig {
                    expected_columns: args.columns,
                    column_tolerance: args.column_tolerance,
                    noise_height_divisor: args.noise_height_divisor,
                    row_gap_divisor: args.row_gap_divisor,
                },
                binarize: BinarizeConfig {
                    thresholder,
                    light_text: args.light_text,
                    denoise: args.denoise,
                },
            },
            export: ExportConfig {
                delimiter: args.delimiter as u8,
                output_dir: args.output_dir.map(PathBuf::from),
                column_names: args
                    .column_names
                    .map(|names| names.iter().map(|n| n.trim().to_string()).collect()),
            },
        }
    }
}

/// Parse a single-byte field delimiter such as `|` or `;`
pub fn parse_delimiter(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => Ok(c),
        _ => Err(format!(
            "delimiter must be one ASCII character other than a quote or line break, got {:?}",
            s
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = Config::from(Args::parse_from(["table-grid-server"]));

        assert_eq!(config.port, 9292);
        assert_eq!(config.page.grid, GridConfig::default());
        assert_eq!(config.page.binarize, BinarizeConfig::default());
        assert_eq!(config.export.delimiter, b'|');
        assert!(config.export.output_dir.is_none());
        assert!(config.export.column_names.is_none());
        assert!(!config.disable_ocr);
    }

    #[test]
    fn test_grid_and_binarize_flags() {
        let config = Config::from(Args::parse_from([
            "table-grid-server",
            "--columns",
            "5",
            "--column-tolerance",
            "45",
            "--threshold",
            "global",
            "--threshold-level",
            "100",
            "--light-text",
            "--delimiter",
            ";",
            "--output-dir",
            "/tmp/tables",
        ]));

        assert_eq!(config.page.grid.expected_columns, 5);
        assert_eq!(config.page.grid.column_tolerance, 45);
        assert_eq!(
            config.page.binarize.thresholder,
            Thresholder::Global { level: 100 }
        );
        assert!(config.page.binarize.light_text);
        assert_eq!(config.export.delimiter, b';');
        assert_eq!(config.export.output_dir, Some(PathBuf::from("/tmp/tables")));
    }

    #[test]
    fn test_column_names_flag() {
        let config = Config::from(Args::parse_from([
            "table-grid-server",
            "--column-names",
            "Item, Qty,Price",
        ]));

        assert_eq!(
            config.export.column_names,
            Some(vec!["Item".to_string(), "Qty".to_string(), "Price".to_string()])
        );
        assert!(config.export.header(3).is_ok());
    }

    #[test]
    fn test_threshold_level_ignored_for_adaptive() {
        let config = Config::from(Args::parse_from([
            "table-grid-server",
            "--threshold",
            "adaptive",
            "--threshold-level",
            "100",
        ]));

        assert_eq!(config.page.binarize.thresholder.as_str(), "adaptive");
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("|"), Ok('|'));
        assert_eq!(parse_delimiter("\t"), Ok('\t'));
        assert!(parse_delimiter("||").is_err());
        assert!(parse_delimiter("\"").is_err());
        assert!(parse_delimiter("é").is_err());
    }
}
