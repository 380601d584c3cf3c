//! TIL tile index format (.til)
//!
//! `width i32, height i32`, then `width × height` entries of three unused
//! bytes and a `u32` tile id, row-major. The tile id indexes
//! [`ZoneDocument::tiles`](crate::ZoneDocument::tiles).

use byteorder::{LittleEndian, WriteBytesExt};
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader};
use serde::Serialize;
use std::io::{self, Write};

use crate::serialization::{BinaryDocument, BinaryEncode};

const ENTRY_PREFIX: usize = 3;
const ENTRY_SIZE: usize = ENTRY_PREFIX + 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileIndexDocument {
    pub width: u32,
    pub height: u32,
    /// Zone tile ids, row-major
    pub tiles: Vec<u32>,
}

impl TileIndexDocument {
    pub fn new(width: u32, height: u32, tiles: Vec<u32>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?;
        (tiles.len() == expected).then_some(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

impl BinaryDocument for TileIndexDocument {
    const FORMAT: AssetFormat = AssetFormat::TileIndex;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let mut dimension = |what: &str| -> AssetResult<u32> {
            let offset = reader.offset();
            let value = reader.read_i32()?;
            u32::try_from(value)
                .map_err(|_| AssetError::malformed(offset, format!("negative {what} {value}")))
        };
        let width = dimension("width")?;
        let height = dimension("height")?;

        let count = (width as usize).saturating_mul(height as usize);
        reader.ensure_available("tile entries", count, ENTRY_SIZE)?;
        let mut tiles = Vec::with_capacity(count);
        for _ in 0..count {
            reader.skip(ENTRY_PREFIX)?;
            tiles.push(reader.read_u32()?);
        }

        Ok(TileIndexDocument {
            width,
            height,
            tiles,
        })
    }
}

impl BinaryEncode for TileIndexDocument {
    /// The unused entry prefix is written as zeros.
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.tiles.len() != self.width as usize * self.height as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "tile count does not match dimensions",
            ));
        }
        w.write_i32::<LittleEndian>(self.width as i32)?;
        w.write_i32::<LittleEndian>(self.height as i32)?;
        for &tile in &self.tiles {
            w.write_all(&[0; ENTRY_PREFIX])?;
            w.write_u32::<LittleEndian>(tile)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_ignored() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&[7, 8, 9]);
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        bytes.extend_from_slice(&6u32.to_le_bytes());
        let til = TileIndexDocument::parse(&bytes).unwrap();
        assert_eq!(til.tiles, vec![5, 6]);
        assert_eq!(til.tile_at(1, 0), Some(6));
        assert_eq!(til.tile_at(0, 1), None);
    }

    #[test]
    fn test_encode_matches_layout() {
        let til = TileIndexDocument::new(1, 2, vec![3, 4]).unwrap();
        let bytes = til.to_bytes().unwrap();
        assert_eq!(bytes.len(), 8 + 2 * ENTRY_SIZE);
        assert_eq!(&bytes[8..15], &[0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(TileIndexDocument::parse(&bytes).unwrap(), til);
    }

    #[test]
    fn test_entries_past_end() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&16i32.to_le_bytes());
        bytes.extend_from_slice(&16i32.to_le_bytes());
        let err = TileIndexDocument::parse(&bytes).unwrap_err();
        assert!(matches!(err.source, AssetError::TruncatedData { .. }));
    }
}
