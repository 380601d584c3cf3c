//! Decode/encode traits shared by every format module.
//!
//! Each document type implements [`BinaryDocument`] so generic code (the
//! exporter, tests) can parse any format through one entry point. Formats
//! with an encoder also implement [`BinaryEncode`].
//!
//! # Example
//!
//! ```
//! use rose_formats::{BinaryDocument, BinaryEncode, HeightmapDocument};
//!
//! let map = HeightmapDocument::new(2, 2, vec![0.0, 10.0, 20.0, 30.0]).unwrap();
//! let bytes = map.to_bytes().unwrap();
//! let parsed = HeightmapDocument::parse(&bytes).unwrap();
//! assert_eq!(parsed, map);
//! ```

use rose_shared::{AssetFormat, AssetResult, ByteReader, ParseError};
use serde::Serialize;
use std::io::{self, Write};

use crate::{
    AnimationDocument, CharacterDefinitionDocument, HeightmapDocument, MeshDocument,
    PlacementDocument, SceneCompositionDocument, SkeletonDocument, TileIndexDocument,
    ZoneDocument,
};

/// A document decoded from one complete file buffer.
pub trait BinaryDocument: Sized {
    /// Format reported in errors.
    const FORMAT: AssetFormat;

    /// Decode from a reader positioned at the start of the file.
    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self>;

    /// Decode a whole buffer, tagging any failure with [`Self::FORMAT`].
    fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(bytes);
        Self::read(&mut reader).map_err(|source| ParseError::new(Self::FORMAT, source))
    }
}

/// A document that can be written back to its binary layout.
pub trait BinaryEncode {
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()>;

    fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }
}

/// Any parsed document, for callers that dispatch on file extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", content = "document", rename_all = "kebab-case")]
pub enum AnyDocument {
    Mesh(MeshDocument),
    Skeleton(SkeletonDocument),
    Animation(AnimationDocument),
    Zone(ZoneDocument),
    SceneComposition(SceneCompositionDocument),
    Placement(PlacementDocument),
    Heightmap(HeightmapDocument),
    TileIndex(TileIndexDocument),
    CharacterDefinition(CharacterDefinitionDocument),
}

impl AnyDocument {
    pub fn format(&self) -> AssetFormat {
        match self {
            Self::Mesh(_) => AssetFormat::Mesh,
            Self::Skeleton(_) => AssetFormat::Skeleton,
            Self::Animation(_) => AssetFormat::Animation,
            Self::Zone(_) => AssetFormat::Zone,
            Self::SceneComposition(_) => AssetFormat::SceneComposition,
            Self::Placement(_) => AssetFormat::Placement,
            Self::Heightmap(_) => AssetFormat::Heightmap,
            Self::TileIndex(_) => AssetFormat::TileIndex,
            Self::CharacterDefinition(_) => AssetFormat::CharacterDefinition,
        }
    }
}

/// Parse `bytes` with the codec for `format`.
pub fn parse_any(format: AssetFormat, bytes: &[u8]) -> Result<AnyDocument, ParseError> {
    Ok(match format {
        AssetFormat::Mesh => AnyDocument::Mesh(MeshDocument::parse(bytes)?),
        AssetFormat::Skeleton => AnyDocument::Skeleton(SkeletonDocument::parse(bytes)?),
        AssetFormat::Animation => AnyDocument::Animation(AnimationDocument::parse(bytes)?),
        AssetFormat::Zone => AnyDocument::Zone(ZoneDocument::parse(bytes)?),
        AssetFormat::SceneComposition => {
            AnyDocument::SceneComposition(SceneCompositionDocument::parse(bytes)?)
        }
        AssetFormat::Placement => AnyDocument::Placement(PlacementDocument::parse(bytes)?),
        AssetFormat::Heightmap => AnyDocument::Heightmap(HeightmapDocument::parse(bytes)?),
        AssetFormat::TileIndex => AnyDocument::TileIndex(TileIndexDocument::parse(bytes)?),
        AssetFormat::CharacterDefinition => {
            AnyDocument::CharacterDefinition(CharacterDefinitionDocument::parse(bytes)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rose_shared::AssetError;

    #[test]
    fn test_parse_tags_errors_with_format() {
        let err = SkeletonDocument::parse(b"ZMD9999").unwrap_err();
        assert_eq!(err.format, AssetFormat::Skeleton);
        assert!(matches!(err.source, AssetError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_parse_any_dispatches() {
        let map = HeightmapDocument::new(1, 1, vec![4.0]).unwrap();
        let bytes = map.to_bytes().unwrap();
        let doc = parse_any(AssetFormat::Heightmap, &bytes).unwrap();
        assert_eq!(doc.format(), AssetFormat::Heightmap);
        assert_eq!(doc, AnyDocument::Heightmap(map));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let map = HeightmapDocument::new(2, 1, vec![1.5, -2.0]).unwrap();
        let bytes = map.to_bytes().unwrap();
        assert_eq!(
            HeightmapDocument::parse(&bytes).unwrap(),
            HeightmapDocument::parse(&bytes).unwrap()
        );
    }
}
