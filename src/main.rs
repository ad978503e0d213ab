use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod engine;
mod engines;
mod error;
mod export;
mod extract;
mod grid;
mod preprocessing;
mod server;

use preprocessing::Thresholder;

#[derive(Parser, Debug)]
#[command(name = "table-grid-server")]
#[command(about = "Reconstructs table grids from photographed pages and exports them as delimited text")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "TABLE_GRID_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "TABLE_GRID_PORT", default_value = "9292")]
    pub port: u16,

    /// Default language for OCR (e.g., "eng", "deu", "fra")
    #[arg(long, env = "TABLE_GRID_DEFAULT_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "TABLE_GRID_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Run without OCR engines; only /grid and /detect will work
    #[arg(long, env = "TABLE_GRID_DISABLE_OCR")]
    pub disable_ocr: bool,

    /// Number of columns the table has
    #[arg(long, env = "TABLE_GRID_COLUMNS", default_value = "3")]
    pub columns: usize,

    /// Half width in pixels of a column's left-edge window
    #[arg(long, env = "TABLE_GRID_COLUMN_TOLERANCE", default_value = "30")]
    pub column_tolerance: i64,

    /// Boxes shorter than mean height / this value are noise
    #[arg(long, env = "TABLE_GRID_NOISE_HEIGHT_DIVISOR", default_value = "1.5")]
    pub noise_height_divisor: f64,

    /// Lines closer than mean height / this value share a cell
    #[arg(long, env = "TABLE_GRID_ROW_GAP_DIVISOR", default_value = "2.0")]
    pub row_gap_divisor: f64,

    /// Binarization method (global, otsu, adaptive)
    #[arg(long, env = "TABLE_GRID_THRESHOLD", default_value = "global")]
    pub threshold: Thresholder,

    /// Level for the global threshold
    #[arg(long, env = "TABLE_GRID_THRESHOLD_LEVEL", default_value = "127")]
    pub threshold_level: u8,

    /// Pages show light text on a dark background
    #[arg(long, env = "TABLE_GRID_LIGHT_TEXT")]
    pub light_text: bool,

    /// Median-filter pages before thresholding
    #[arg(long, env = "TABLE_GRID_DENOISE")]
    pub denoise: bool,

    /// Directory to write `<upload stem>.csv` exports into
    #[arg(long, env = "TABLE_GRID_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Header names for the export, one per column (comma separated)
    #[arg(long, env = "TABLE_GRID_COLUMN_NAMES", value_delimiter = ',')]
    pub column_names: Option<Vec<String>>,

    /// Field delimiter of the export
    #[arg(long, env = "TABLE_GRID_DELIMITER", default_value = "|", value_parser = config::parse_delimiter)]
    pub delimiter: char,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting table-grid-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        columns = config.page.grid.expected_columns,
        threshold = config.page.binarize.thresholder.as_str(),
        ocr = !config.disable_ocr,
        "Binding to {}:{}",
        config.host,
        config.port
    );

    server::run(config).await
}
