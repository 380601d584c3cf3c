//! Shared building blocks for the ROSE asset crates
//!
//! Everything here is format-agnostic: the little-endian [`ByteReader`] every
//! codec decodes with, the matching write helpers, the error taxonomy, the
//! asset-format identifiers, and the single coordinate transform family that
//! all consumers use to leave the source convention.

pub mod coords;
pub mod error;
pub mod format;
pub mod math;
pub mod reader;
pub mod writer;

pub use coords::{CoordinateConvention, SignedAxis};
pub use error::{AssetError, AssetResult, ParseError};
pub use format::AssetFormat;
pub use math::{BoneMatrix3x4, write_palette};
pub use reader::{ByteReader, decode_string};
pub use writer::WriteAssetExt;
