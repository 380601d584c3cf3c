//! IFO object placement format (.ifo)
//!
//! Same block table as ZON. Every object block is `count u32` followed by
//! records that share a common prefix ([`PlacedObject`]) and append
//! block-specific fields. The water block is the exception: a plane size and
//! a list of plane extents.
//!
//! Rotations here are stored `x, y, z, w`, unlike ZMD and ZSC.

use glam::{Quat, UVec2, Vec3};
use rose_shared::{AssetFormat, AssetResult, ByteReader};
use serde::Serialize;

use crate::blocks::read_block_table;
use crate::serialization::BinaryDocument;

/// Smallest possible common record: empty name and every fixed field.
const MIN_OBJECT_SIZE: usize = 1 + 2 + 2 + 4 + 4 + 4 + 4 + 16 + 12 + 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum PlacementBlock {
    Deprecated = 0,
    Decoration = 1,
    Npc = 2,
    Construction = 3,
    Sound = 4,
    Effect = 5,
    Animated = 6,
    DeprecatedWater = 7,
    MonsterSpawn = 8,
    Water = 9,
    Warp = 10,
    Collision = 11,
    Event = 12,
}

impl PlacementBlock {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Deprecated,
            1 => Self::Decoration,
            2 => Self::Npc,
            3 => Self::Construction,
            4 => Self::Sound,
            5 => Self::Effect,
            6 => Self::Animated,
            7 => Self::DeprecatedWater,
            8 => Self::MonsterSpawn,
            9 => Self::Water,
            10 => Self::Warp,
            11 => Self::Collision,
            12 => Self::Event,
            _ => return None,
        })
    }
}

/// Fields shared by every placed object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedObject {
    pub name: String,
    pub warp_id: u16,
    pub event_id: u16,
    pub object_type: u32,
    /// Index into the zone's scene composition or character table
    pub object_id: u32,
    pub minimap_position: UVec2,
    pub rotation: Quat,
    pub position: Vec3,
    pub scale: Vec3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnEntry {
    pub name: String,
    pub monster_id: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonsterSpawn {
    pub spawn_name: String,
    pub basic: Vec<SpawnEntry>,
    pub tactic: Vec<SpawnEntry>,
    pub interval: u32,
    pub limit_count: u32,
    pub range: u32,
    pub tactic_points: u32,
}

/// Block-specific data appended to a [`PlacedObject`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PlacementKind {
    Decoration,
    Npc { ai_id: u32, quest_file: String },
    Construction,
    Sound { path: String, range: u32, interval: u32 },
    Effect { path: String },
    Animated,
    MonsterSpawn(Box<MonsterSpawn>),
    Warp,
    Collision,
    Event { quest_trigger: String, script_function: String },
}

impl PlacementKind {
    pub fn block(&self) -> PlacementBlock {
        match self {
            Self::Decoration => PlacementBlock::Decoration,
            Self::Npc { .. } => PlacementBlock::Npc,
            Self::Construction => PlacementBlock::Construction,
            Self::Sound { .. } => PlacementBlock::Sound,
            Self::Effect { .. } => PlacementBlock::Effect,
            Self::Animated => PlacementBlock::Animated,
            Self::MonsterSpawn(_) => PlacementBlock::MonsterSpawn,
            Self::Warp => PlacementBlock::Warp,
            Self::Collision => PlacementBlock::Collision,
            Self::Event { .. } => PlacementBlock::Event,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub object: PlacedObject,
    pub kind: PlacementKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterPlane {
    pub start: Vec3,
    pub end: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementDocument {
    /// All object records in file order
    pub objects: Vec<Placement>,
    pub water_size: f32,
    pub water_planes: Vec<WaterPlane>,
}

impl PlacementDocument {
    pub fn objects_in(&self, block: PlacementBlock) -> impl Iterator<Item = &Placement> {
        self.objects
            .iter()
            .filter(move |placement| placement.kind.block() == block)
    }

    pub fn monster_spawns(&self) -> impl Iterator<Item = (&PlacedObject, &MonsterSpawn)> {
        self.objects.iter().filter_map(|placement| match &placement.kind {
            PlacementKind::MonsterSpawn(spawn) => Some((&placement.object, spawn.as_ref())),
            _ => None,
        })
    }
}

fn read_object(reader: &mut ByteReader<'_>) -> AssetResult<PlacedObject> {
    Ok(PlacedObject {
        name: reader.read_u8_prefixed_string()?,
        warp_id: reader.read_u16()?,
        event_id: reader.read_u16()?,
        object_type: reader.read_u32()?,
        object_id: reader.read_u32()?,
        minimap_position: UVec2::new(reader.read_u32()?, reader.read_u32()?),
        rotation: reader.read_quat_xyzw()?,
        position: reader.read_vec3()?,
        scale: reader.read_vec3()?,
    })
}

fn read_spawn_entries(reader: &mut ByteReader<'_>) -> AssetResult<Vec<SpawnEntry>> {
    let count = reader.read_u32()? as usize;
    reader.ensure_available("spawn entries", count, 1 + 4 + 4)?;
    (0..count)
        .map(|_| {
            Ok(SpawnEntry {
                name: reader.read_u8_prefixed_string()?,
                monster_id: reader.read_u32()?,
                count: reader.read_u32()?,
            })
        })
        .collect()
}

/// Blocks whose records are placed objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectBlock {
    Decoration,
    Npc,
    Construction,
    Sound,
    Effect,
    Animated,
    MonsterSpawn,
    Warp,
    Collision,
    Event,
}

/// How a known block's payload is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockLayout {
    Skipped,
    Water,
    Objects(ObjectBlock),
}

impl From<PlacementBlock> for BlockLayout {
    fn from(block: PlacementBlock) -> Self {
        match block {
            PlacementBlock::Deprecated | PlacementBlock::DeprecatedWater => Self::Skipped,
            PlacementBlock::Water => Self::Water,
            PlacementBlock::Decoration => Self::Objects(ObjectBlock::Decoration),
            PlacementBlock::Npc => Self::Objects(ObjectBlock::Npc),
            PlacementBlock::Construction => Self::Objects(ObjectBlock::Construction),
            PlacementBlock::Sound => Self::Objects(ObjectBlock::Sound),
            PlacementBlock::Effect => Self::Objects(ObjectBlock::Effect),
            PlacementBlock::Animated => Self::Objects(ObjectBlock::Animated),
            PlacementBlock::MonsterSpawn => Self::Objects(ObjectBlock::MonsterSpawn),
            PlacementBlock::Warp => Self::Objects(ObjectBlock::Warp),
            PlacementBlock::Collision => Self::Objects(ObjectBlock::Collision),
            PlacementBlock::Event => Self::Objects(ObjectBlock::Event),
        }
    }
}

fn read_kind(block: ObjectBlock, reader: &mut ByteReader<'_>) -> AssetResult<PlacementKind> {
    Ok(match block {
        ObjectBlock::Npc => PlacementKind::Npc {
            ai_id: reader.read_u32()?,
            quest_file: reader.read_u8_prefixed_string()?,
        },
        ObjectBlock::Sound => PlacementKind::Sound {
            path: reader.read_u8_prefixed_string()?,
            range: reader.read_u32()?,
            interval: reader.read_u32()?,
        },
        ObjectBlock::Effect => PlacementKind::Effect {
            path: reader.read_u8_prefixed_string()?,
        },
        ObjectBlock::MonsterSpawn => PlacementKind::MonsterSpawn(Box::new(MonsterSpawn {
            spawn_name: reader.read_u8_prefixed_string()?,
            basic: read_spawn_entries(reader)?,
            tactic: read_spawn_entries(reader)?,
            interval: reader.read_u32()?,
            limit_count: reader.read_u32()?,
            range: reader.read_u32()?,
            tactic_points: reader.read_u32()?,
        })),
        ObjectBlock::Event => PlacementKind::Event {
            quest_trigger: reader.read_u8_prefixed_string()?,
            script_function: reader.read_u8_prefixed_string()?,
        },
        ObjectBlock::Construction => PlacementKind::Construction,
        ObjectBlock::Animated => PlacementKind::Animated,
        ObjectBlock::Warp => PlacementKind::Warp,
        ObjectBlock::Collision => PlacementKind::Collision,
        ObjectBlock::Decoration => PlacementKind::Decoration,
    })
}

impl BinaryDocument for PlacementDocument {
    const FORMAT: AssetFormat = AssetFormat::Placement;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let blocks = read_block_table(reader)?;
        let mut document = PlacementDocument::default();

        for entry in blocks {
            let Some(block) = PlacementBlock::from_u32(entry.kind) else {
                tracing::warn!(
                    block_type = entry.kind,
                    offset = entry.offset,
                    "skipping unknown placement block"
                );
                continue;
            };

            let block = match BlockLayout::from(block) {
                BlockLayout::Skipped => {
                    tracing::debug!(block_type = entry.kind, "skipping deprecated placement block");
                    continue;
                }
                BlockLayout::Water => {
                    reader.seek(entry.offset)?;
                    document.water_size = reader.read_f32()?;
                    let count = reader.read_u32()? as usize;
                    reader.ensure_available("water planes", count, 24)?;
                    for _ in 0..count {
                        let start = reader.read_vec3()?;
                        let end = reader.read_vec3()?;
                        document.water_planes.push(WaterPlane { start, end });
                    }
                    continue;
                }
                BlockLayout::Objects(block) => block,
            };

            reader.seek(entry.offset)?;
            let count = reader.read_u32()? as usize;
            reader.ensure_available("placed objects", count, MIN_OBJECT_SIZE)?;
            document.objects.reserve(count);
            for _ in 0..count {
                let object = read_object(reader)?;
                let kind = read_kind(block, reader)?;
                document.objects.push(Placement { object, kind });
            }
        }

        tracing::debug!(
            objects = document.objects.len(),
            water_planes = document.water_planes.len(),
            "parsed placement"
        );

        Ok(document)
    }
}
