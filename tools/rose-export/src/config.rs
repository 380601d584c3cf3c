//! rose-export.toml parsing
//!
//! ```toml
//! [convention]
//! preset = "y-up-meters"        # or explicit axes / scale_divisor
//! # axes = ["+x", "+z", "-y"]
//! # scale_divisor = 100.0
//!
//! [output]
//! pretty = true
//! ```

use anyhow::{Context, Result, bail};
use rose_shared::{CoordinateConvention, SignedAxis};
use serde::Deserialize;
use std::path::Path;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rose-export.toml";

#[derive(Debug, Default, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub convention: ConventionSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// Target coordinate convention. A preset is the starting point; explicit
/// `axes` or `scale_divisor` override its fields.
#[derive(Debug, Default, Deserialize)]
pub struct ConventionSection {
    pub preset: Option<String>,
    pub axes: Option<[SignedAxis; 3]>,
    pub scale_divisor: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct OutputSection {
    /// Indented JSON. Default: true
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
        }
    }
}

fn default_pretty() -> bool {
    true
}

impl ConventionSection {
    pub fn resolve(&self) -> Result<CoordinateConvention> {
        let mut convention = match &self.preset {
            Some(name) => CoordinateConvention::preset(name)
                .with_context(|| format!("Unknown convention preset: {name}"))?,
            None => CoordinateConvention::SOURCE,
        };
        if let Some(axes) = self.axes {
            convention.axes = axes;
        }
        if let Some(divisor) = self.scale_divisor {
            convention.scale_divisor = divisor;
        }
        if !convention.is_valid() {
            bail!(
                "Invalid convention: axes {:?} with scale divisor {}",
                convention.axes,
                convention.scale_divisor
            );
        }
        Ok(convention)
    }
}

impl ExportConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse config from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse rose-export.toml")
    }

    /// An explicit path must exist. Without one the default file is used
    /// when present, otherwise defaults apply.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(path)
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }
}
