//! Asset format identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The binary asset families understood by the codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetFormat {
    Mesh,
    Skeleton,
    Animation,
    Zone,
    SceneComposition,
    Placement,
    Heightmap,
    TileIndex,
    CharacterDefinition,
}

impl AssetFormat {
    pub const ALL: [AssetFormat; 9] = [
        Self::Mesh,
        Self::Skeleton,
        Self::Animation,
        Self::Zone,
        Self::SceneComposition,
        Self::Placement,
        Self::Heightmap,
        Self::TileIndex,
        Self::CharacterDefinition,
    ];

    /// File extension used by the game client (lowercase, no dot)
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mesh => "zms",
            Self::Skeleton => "zmd",
            Self::Animation => "zmo",
            Self::Zone => "zon",
            Self::SceneComposition => "zsc",
            Self::Placement => "ifo",
            Self::Heightmap => "him",
            Self::TileIndex => "til",
            Self::CharacterDefinition => "chr",
        }
    }

    /// Human readable name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::Skeleton => "skeleton",
            Self::Animation => "animation",
            Self::Zone => "zone",
            Self::SceneComposition => "scene composition",
            Self::Placement => "placement",
            Self::Heightmap => "heightmap",
            Self::TileIndex => "tile index",
            Self::CharacterDefinition => "character definition",
        }
    }

    /// Case-insensitive lookup by extension, with or without a leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.name(),
            self.extension().to_ascii_uppercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(AssetFormat::from_extension("ZMS"), Some(AssetFormat::Mesh));
        assert_eq!(AssetFormat::from_extension(".ifo"), Some(AssetFormat::Placement));
        assert_eq!(AssetFormat::from_extension("png"), None);
    }

    #[test]
    fn test_from_path() {
        let path = Path::new("3DDATA/JUNON/JDT01/31_30.HIM");
        assert_eq!(AssetFormat::from_path(path), Some(AssetFormat::Heightmap));
        assert_eq!(AssetFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_extensions_are_unique() {
        for a in AssetFormat::ALL {
            for b in AssetFormat::ALL {
                if a != b {
                    assert_ne!(a.extension(), b.extension());
                }
            }
        }
    }
}
