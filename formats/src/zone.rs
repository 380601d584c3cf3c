//! ZON zone format (.zon)
//!
//! A block table (see `blocks`) followed by independently located blocks:
//!
//! | Type | Block | Contents |
//! |---|---|---|
//! | 0 | info | zone type, size, grid_per_patch, grid_size f32, start position |
//! | 1 | event positions | count u32 × (position vec3, name bstr) |
//! | 2 | textures | count u32 × path bstr |
//! | 3 | tiles | count u32 × 7 u32 |
//! | 4 | economy | ignored |
//!
//! Tile record: `layer1, layer2, offset1, offset2, blend, rotation, tile_type`.
//! A layer's texture is `textures[layer + offset]`.

use glam::{UVec2, Vec3};
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader};
use serde::Serialize;

use crate::blocks::read_block_table;
use crate::serialization::BinaryDocument;

const BLOCK_INFO: u32 = 0;
const BLOCK_EVENT_POSITIONS: u32 = 1;
const BLOCK_TEXTURES: u32 = 2;
const BLOCK_TILES: u32 = 3;
const BLOCK_ECONOMY: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneInfo {
    pub zone_type: u32,
    pub width: u32,
    pub height: u32,
    pub grid_per_patch: u32,
    /// Spacing between height samples, in source units
    pub grid_size: f32,
    pub start_position: UVec2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPosition {
    pub position: Vec3,
    pub name: String,
}

/// Orientation applied to a tile's texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TileRotation {
    None,
    FlipHorizontal,
    FlipVertical,
    Flip,
    Clockwise90,
    CounterClockwise90,
    Unknown(u32),
}

impl TileRotation {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::None,
            2 => Self::FlipHorizontal,
            3 => Self::FlipVertical,
            4 => Self::Flip,
            5 => Self::Clockwise90,
            6 => Self::CounterClockwise90,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneTile {
    pub layer1: u32,
    pub offset1: u32,
    pub layer2: u32,
    pub offset2: u32,
    pub blend: bool,
    pub rotation: TileRotation,
}

impl ZoneTile {
    /// Index into [`ZoneDocument::textures`] for the base layer.
    pub fn texture_index1(&self) -> usize {
        self.layer1 as usize + self.offset1 as usize
    }

    /// Index into [`ZoneDocument::textures`] for the blended layer.
    pub fn texture_index2(&self) -> usize {
        self.layer2 as usize + self.offset2 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneDocument {
    pub info: ZoneInfo,
    pub event_positions: Vec<EventPosition>,
    pub textures: Vec<String>,
    pub tiles: Vec<ZoneTile>,
}

impl ZoneDocument {
    pub fn event_position(&self, name: &str) -> Option<Vec3> {
        self.event_positions
            .iter()
            .find(|event| event.name == name)
            .map(|event| event.position)
    }
}

fn read_info(reader: &mut ByteReader<'_>) -> AssetResult<ZoneInfo> {
    Ok(ZoneInfo {
        zone_type: reader.read_u32()?,
        width: reader.read_u32()?,
        height: reader.read_u32()?,
        grid_per_patch: reader.read_u32()?,
        grid_size: reader.read_f32()?,
        start_position: UVec2::new(reader.read_u32()?, reader.read_u32()?),
    })
}

impl BinaryDocument for ZoneDocument {
    const FORMAT: AssetFormat = AssetFormat::Zone;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let blocks = read_block_table(reader)?;

        let mut info = None;
        let mut event_positions = Vec::new();
        let mut textures = Vec::new();
        let mut tiles = Vec::new();

        for block in blocks {
            reader.seek(block.offset)?;
            match block.kind {
                BLOCK_INFO => info = Some(read_info(reader)?),
                BLOCK_EVENT_POSITIONS => {
                    let count = reader.read_u32()? as usize;
                    reader.ensure_available("event positions", count, 13)?;
                    for _ in 0..count {
                        let position = reader.read_vec3()?;
                        let name = reader.read_u8_prefixed_string()?;
                        event_positions.push(EventPosition { position, name });
                    }
                }
                BLOCK_TEXTURES => {
                    let count = reader.read_u32()? as usize;
                    reader.ensure_available("textures", count, 1)?;
                    for _ in 0..count {
                        textures.push(reader.read_u8_prefixed_string()?);
                    }
                }
                BLOCK_TILES => {
                    let count = reader.read_u32()? as usize;
                    reader.ensure_available("tiles", count, 28)?;
                    for _ in 0..count {
                        let layer1 = reader.read_u32()?;
                        let layer2 = reader.read_u32()?;
                        let offset1 = reader.read_u32()?;
                        let offset2 = reader.read_u32()?;
                        let blend = reader.read_u32()? != 0;
                        let rotation = TileRotation::from_u32(reader.read_u32()?);
                        let _tile_type = reader.read_u32()?;
                        tiles.push(ZoneTile {
                            layer1,
                            offset1,
                            layer2,
                            offset2,
                            blend,
                            rotation,
                        });
                    }
                }
                BLOCK_ECONOMY => {}
                other => {
                    tracing::warn!(block_type = other, offset = block.offset, "skipping unknown zone block");
                }
            }
        }

        let info = info.ok_or_else(|| AssetError::malformed(0, "zone has no info block"))?;

        tracing::debug!(
            width = info.width,
            height = info.height,
            textures = textures.len(),
            tiles = tiles.len(),
            "parsed zone"
        );

        Ok(ZoneDocument {
            info,
            event_positions,
            textures,
            tiles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bstr(out: &mut Vec<u8>, s: &str) {
        out.push(s.len() as u8);
        out.extend_from_slice(s.as_bytes());
    }

    fn u32s(out: &mut Vec<u8>, values: &[u32]) {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// Blocks stored in reverse type order to exercise seeking.
    pub(crate) fn sample_zone() -> Vec<u8> {
        let mut tiles = Vec::new();
        u32s(&mut tiles, &[2]);
        u32s(&mut tiles, &[0, 1, 0, 1, 1, 5, 0]);
        u32s(&mut tiles, &[1, 0, 0, 0, 0, 1, 0]);

        let mut textures = Vec::new();
        u32s(&mut textures, &[3]);
        bstr(&mut textures, "grass.dds");
        bstr(&mut textures, "rock.dds");
        bstr(&mut textures, "sand.dds");

        let mut events = Vec::new();
        u32s(&mut events, &[1]);
        for v in [520000.0f32, 520000.0, 0.0] {
            events.extend_from_slice(&v.to_le_bytes());
        }
        bstr(&mut events, "start");

        let mut info = Vec::new();
        u32s(&mut info, &[1, 64, 64, 4]);
        info.extend_from_slice(&250.0f32.to_le_bytes());
        u32s(&mut info, &[32, 33]);

        let table_len = 4 + 5 * 8;
        let economy_at = table_len;
        let tiles_at = economy_at + 4;
        let textures_at = tiles_at + tiles.len();
        let events_at = textures_at + textures.len();
        let info_at = events_at + events.len();

        let mut out = Vec::new();
        u32s(
            &mut out,
            &[
                5,
                BLOCK_TILES,
                tiles_at as u32,
                BLOCK_ECONOMY,
                economy_at as u32,
                BLOCK_TEXTURES,
                textures_at as u32,
                BLOCK_EVENT_POSITIONS,
                events_at as u32,
                BLOCK_INFO,
                info_at as u32,
            ],
        );
        u32s(&mut out, &[0]);
        out.extend(tiles);
        out.extend(textures);
        out.extend(events);
        out.extend(info);
        out
    }

    #[test]
    fn test_parse_blocks_by_offset() {
        let zone = ZoneDocument::parse(&sample_zone()).unwrap();
        assert_eq!(zone.info.width, 64);
        assert_eq!(zone.info.grid_size, 250.0);
        assert_eq!(zone.info.start_position, UVec2::new(32, 33));
        assert_eq!(zone.textures, vec!["grass.dds", "rock.dds", "sand.dds"]);
        assert_eq!(zone.tiles.len(), 2);
        assert_eq!(zone.event_position("start"), Some(Vec3::new(520000.0, 520000.0, 0.0)));
    }

    #[test]
    fn test_tile_fields() {
        let zone = ZoneDocument::parse(&sample_zone()).unwrap();
        let tile = zone.tiles[0];
        assert_eq!(tile.texture_index1(), 0);
        assert_eq!(tile.texture_index2(), 2);
        assert!(tile.blend);
        assert_eq!(tile.rotation, TileRotation::Clockwise90);
        assert_eq!(zone.tiles[1].rotation, TileRotation::None);
        assert_eq!(zone.tiles[1].texture_index1(), 1);
    }

    #[test]
    fn test_missing_info_block() {
        let mut bytes = Vec::new();
        u32s(&mut bytes, &[1, BLOCK_TEXTURES, 12, 0]);
        let err = ZoneDocument::parse(&bytes).unwrap_err();
        assert!(matches!(err.source, AssetError::MalformedStructure { .. }));
    }

    #[test]
    fn test_block_offset_past_end() {
        let mut bytes = Vec::new();
        u32s(&mut bytes, &[1, BLOCK_INFO, 500]);
        let err = ZoneDocument::parse(&bytes).unwrap_err();
        assert!(matches!(err.source, AssetError::OutOfBounds { .. }));
    }
}
