//! OCR engine implementations
//!
//! Engines are conditionally compiled based on feature flags. The registry can
//! also be built empty, which turns every recognition request into
//! `OcrUnavailable` while box detection and grid reconstruction keep working.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::TableError;
use serde::Serialize;
use std::sync::Arc;

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a registry with every compiled-in engine initialized,
    /// or an empty one when OCR is disabled
    pub fn new(config: &Config) -> Result<Self, TableError> {
        if config.disable_ocr {
            tracing::warn!("OCR disabled, only box detection and grid endpoints will work");
            return Ok(Self::disabled());
        }

        #[allow(unused_mut)]
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            engines.push(Arc::new(ocrs::OcrsEngine::new()?));
        }

        #[cfg(feature = "engine-leptess")]
        {
            tracing::info!("Initializing leptess engine...");
            engines.push(Arc::new(leptess::LeptessEngine::new(config)?));
        }

        if engines.is_empty() {
            return Err(TableError::InitializationError(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess, or pass --disable-ocr".to_string()
            ));
        }

        Ok(Self::from_engines(engines))
    }

    /// Registry without any engine
    pub fn disabled() -> Self {
        Self {
            engines: Vec::new(),
            default_engine: String::new(),
        }
    }

    /// Registry over already built engines, the first one is the default
    pub fn from_engines(engines: Vec<Arc<dyn OcrEngine>>) -> Self {
        let default_engine = engines
            .first()
            .map(|e| e.name().to_string())
            .unwrap_or_default();
        Self {
            engines,
            default_engine,
        }
    }

    /// Resolve an engine by name, or the default one when no name is given
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn OcrEngine>, TableError> {
        if self.engines.is_empty() {
            return Err(TableError::OcrUnavailable(
                "OCR is disabled on this server".to_string(),
            ));
        }

        let wanted = name.unwrap_or(&self.default_engine);
        self.get(wanted).ok_or_else(|| {
            TableError::InvalidRequest(format!(
                "Unknown engine '{}'. Available engines: {:?}",
                wanted,
                self.list()
            ))
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine name, `None` when OCR is disabled
    pub fn default_name(&self) -> Option<&str> {
        if self.default_engine.is_empty() {
            None
        } else {
            Some(&self.default_engine)
        }
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_languages: e.supported_languages(),
            })
            .collect()
    }
}

/// Directory holding downloaded models and training data
#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
pub(crate) fn cache_dir(subdir: &str) -> Result<PathBuf, TableError> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("table-grid-server")
        .join(subdir);

    std::fs::create_dir_all(&dir).map_err(|e| {
        TableError::InitializationError(format!("Failed to create cache directory {:?}: {}", dir, e))
    })?;

    Ok(dir)
}

/// Download `url` into `path` unless it is already cached
///
/// The body lands in a temp file next to `path` first, so an interrupted
/// download never leaves a truncated model behind.
#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
pub(crate) fn fetch_cached(url: &str, path: &Path) -> Result<(), TableError> {
    if path.exists() {
        tracing::info!("Using cached {:?}", path);
        return Ok(());
    }

    tracing::info!("Downloading {} (this may take a moment)...", url);

    let response = ureq::get(url)
        .call()
        .map_err(|e| TableError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        TableError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        TableError::InitializationError(format!("Failed to create download file: {}", e))
    })?;
    tmp.write_all(&buffer).map_err(|e| {
        TableError::InitializationError(format!("Failed to write download file: {}", e))
    })?;
    tmp.persist(path).map_err(|e| {
        TableError::InitializationError(format!("Failed to store {:?}: {}", path, e))
    })?;

    tracing::info!("Downloaded {} bytes to {:?}", buffer.len(), path);
    Ok(())
}
