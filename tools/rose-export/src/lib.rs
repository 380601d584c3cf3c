//! rose-export library
//!
//! Loads ROSE asset files by extension and turns them into JSON-ready
//! reports in a configured coordinate convention. The binary is a thin
//! clap front end over these functions.

pub mod config;
pub mod inspect;
pub mod report;

pub use config::{DEFAULT_CONFIG_FILE, ExportConfig};
pub use inspect::summarize;
pub use report::{BindPoseReport, HeightReport, SampleReport};

use anyhow::{Context, Result};
use rose_formats::{AnyDocument, AssetFormat, BinaryDocument, parse_any};
use serde::Serialize;
use std::path::Path;

/// Reads `path` and decodes it with the codec its extension names.
pub fn load_document(path: &Path) -> Result<AnyDocument> {
    let format = AssetFormat::from_path(path)
        .with_context(|| format!("Unrecognized asset extension: {}", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::debug!("Read {} bytes from {:?} as {}", bytes.len(), path, format);
    parse_any(format, &bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Reads `path` as one specific document type, whatever its extension.
pub fn load<T: BinaryDocument>(path: &Path) -> Result<T> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    T::parse(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize JSON")
}
