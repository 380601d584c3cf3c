//! Codecs for the ROSE Online binary asset family
//!
//! Each module owns one file format: it resolves the version tag once into a
//! closed variant, decodes through [`rose_shared::ByteReader`], and returns a
//! typed document or a [`ParseError`] naming the format and byte offset.
//!
//! | Module | Extension | Encoder |
//! |---|---|---|
//! | [`mesh`] | `.zms` | yes |
//! | [`skeleton`] | `.zmd` | yes |
//! | [`animation`] | `.zmo` | yes |
//! | [`zone`] | `.zon` | no |
//! | [`composition`] | `.zsc` | no |
//! | [`placement`] | `.ifo` | no |
//! | [`heightmap`] | `.him` | yes |
//! | [`tile_index`] | `.til` | yes |
//! | [`character`] | `.chr` | no |
//!
//! Documents hold source-convention values. Convert them with
//! [`rose_shared::CoordinateConvention`] at the point of use.

pub mod animation;
pub mod character;
pub mod composition;
pub mod heightmap;
pub mod mesh;
pub mod placement;
pub mod serialization;
pub mod skeleton;
pub mod tile_index;
pub mod zone;

mod blocks;

pub use animation::{AnimationDocument, Channel, ChannelKind, ChannelValues};
pub use character::{CharacterDefinition, CharacterDefinitionDocument};
pub use composition::SceneCompositionDocument;
pub use heightmap::HeightmapDocument;
pub use mesh::{MeshDocument, MeshVersion, VertexFormat};
pub use placement::PlacementDocument;
pub use serialization::{AnyDocument, BinaryDocument, BinaryEncode, parse_any};
pub use skeleton::{SkeletonDocument, SkeletonNode};
pub use tile_index::TileIndexDocument;
pub use zone::{ZoneDocument, ZoneTile};

pub use rose_shared::{AssetError, AssetFormat, ParseError};
