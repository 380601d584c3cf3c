//! ZMD skeleton format (.zmd)
//!
//! ```text
//! 0x00: tag [u8; 7]        "ZMD0002" or "ZMD0003"
//! 0x07: bone_count u32
//!       bone_count × { parent u32, name cstr, position vec3, rotation quat(wxyz) }
//!       dummy_count u32    (absent when the file ends after the bones)
//!       dummy_count × { name cstr, parent u32, position vec3, [rotation quat(wxyz)] }
//! ```
//!
//! Dummy rotations exist only in version 3; version 2 dummies use identity.
//! Bones occupy node indices `0..bone_count`, dummy `i` is node
//! `bone_count + i`.

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec3};
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader, WriteAssetExt};
use serde::Serialize;
use std::io::{self, Write};

use crate::serialization::{BinaryDocument, BinaryEncode};

const TAG_LEN: usize = 7;

/// Minimum encoded bone size: parent, empty name, position, rotation.
const MIN_BONE_SIZE: usize = 4 + 1 + 12 + 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SkeletonVersion {
    V2,
    V3,
}

impl SkeletonVersion {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ZMD0002" => Some(Self::V2),
            "ZMD0003" => Some(Self::V3),
            _ => None,
        }
    }

    pub const fn tag(self) -> &'static [u8; TAG_LEN] {
        match self {
            Self::V2 => b"ZMD0002",
            Self::V3 => b"ZMD0003",
        }
    }

    const fn dummy_has_rotation(self) -> bool {
        matches!(self, Self::V3)
    }
}

/// A bone or dummy with its parent-relative transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkeletonNode {
    pub name: String,
    /// Node index of the parent; equal to the node's own index for roots
    pub parent: u32,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkeletonDocument {
    pub version: SkeletonVersion,
    pub bones: Vec<SkeletonNode>,
    pub dummies: Vec<SkeletonNode>,
}

impl SkeletonDocument {
    /// Bones plus dummies.
    pub fn node_count(&self) -> usize {
        self.bones.len() + self.dummies.len()
    }

    /// Node by combined index (bones first, then dummies).
    pub fn node(&self, index: usize) -> Option<&SkeletonNode> {
        if index < self.bones.len() {
            self.bones.get(index)
        } else {
            self.dummies.get(index - self.bones.len())
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SkeletonNode> {
        self.bones.iter().chain(self.dummies.iter())
    }

    /// A node is a root when it names itself as parent, at any index.
    pub fn is_root(&self, index: usize) -> bool {
        self.node(index)
            .is_some_and(|node| node.parent as usize == index)
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub fn find_dummy(&self, name: &str) -> Option<usize> {
        self.dummies
            .iter()
            .position(|dummy| dummy.name == name)
            .map(|i| self.bones.len() + i)
    }
}

impl BinaryDocument for SkeletonDocument {
    const FORMAT: AssetFormat = AssetFormat::Skeleton;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let tag = reader.read_fixed_string(TAG_LEN)?;
        let version =
            SkeletonVersion::from_tag(&tag).ok_or(AssetError::UnsupportedVersion { tag })?;

        let bone_count = reader.read_u32()? as usize;
        reader.ensure_available("bones", bone_count, MIN_BONE_SIZE)?;
        let mut bones = Vec::with_capacity(bone_count);
        let mut parent_offsets = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            parent_offsets.push(reader.offset());
            let parent = reader.read_u32()?;
            let name = reader.read_cstring()?;
            let position = reader.read_vec3()?;
            let rotation = reader.read_quat_wxyz()?;
            bones.push(SkeletonNode {
                name,
                parent,
                position,
                rotation,
            });
        }

        let mut dummies = Vec::new();
        if !reader.is_at_end() {
            let dummy_count = reader.read_u32()? as usize;
            let dummy_size = if version.dummy_has_rotation() { 33 } else { 17 };
            reader.ensure_available("dummies", dummy_count, dummy_size)?;
            dummies.reserve(dummy_count);
            for _ in 0..dummy_count {
                let name = reader.read_cstring()?;
                parent_offsets.push(reader.offset());
                let parent = reader.read_u32()?;
                let position = reader.read_vec3()?;
                let rotation = if version.dummy_has_rotation() {
                    reader.read_quat_wxyz()?
                } else {
                    Quat::IDENTITY
                };
                dummies.push(SkeletonNode {
                    name,
                    parent,
                    position,
                    rotation,
                });
            }
        }

        let skeleton = SkeletonDocument {
            version,
            bones,
            dummies,
        };

        let node_count = skeleton.node_count();
        for (node, offset) in skeleton.nodes().zip(parent_offsets) {
            if node.parent as usize >= node_count {
                return Err(AssetError::malformed(
                    offset,
                    format!(
                        "'{}' has parent {} but skeleton has {node_count} nodes",
                        node.name, node.parent
                    ),
                ));
            }
        }

        tracing::debug!(
            version = ?version,
            bones = skeleton.bones.len(),
            dummies = skeleton.dummies.len(),
            "parsed skeleton"
        );

        Ok(skeleton)
    }
}

impl BinaryEncode for SkeletonDocument {
    /// Version 2 drops dummy rotations; always writes the dummy section.
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self.version.tag())?;

        w.write_u32::<LittleEndian>(self.bones.len() as u32)?;
        for bone in &self.bones {
            w.write_u32::<LittleEndian>(bone.parent)?;
            w.write_cstring(&bone.name)?;
            w.write_vec3(bone.position)?;
            w.write_quat_wxyz(bone.rotation)?;
        }

        w.write_u32::<LittleEndian>(self.dummies.len() as u32)?;
        for dummy in &self.dummies {
            w.write_cstring(&dummy.name)?;
            w.write_u32::<LittleEndian>(dummy.parent)?;
            w.write_vec3(dummy.position)?;
            if self.version.dummy_has_rotation() {
                w.write_quat_wxyz(dummy.rotation)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, parent: u32, x: f32) -> SkeletonNode {
        SkeletonNode {
            name: name.into(),
            parent,
            position: Vec3::new(x, 0.0, 0.0),
            rotation: Quat::IDENTITY,
        }
    }

    fn chain(version: SkeletonVersion) -> SkeletonDocument {
        SkeletonDocument {
            version,
            bones: vec![node("b0", 0, 0.0), node("b1", 0, 1.0), node("b2", 1, 2.0)],
            dummies: vec![SkeletonNode {
                rotation: Quat::from_rotation_z(0.5),
                ..node("p_00", 2, 0.5)
            }],
        }
    }

    #[test]
    fn test_roundtrip_v3() {
        let skeleton = chain(SkeletonVersion::V3);
        let bytes = skeleton.to_bytes().unwrap();
        let parsed = SkeletonDocument::parse(&bytes).unwrap();
        assert_eq!(parsed, skeleton);
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_v2_dummies_have_identity_rotation() {
        let skeleton = chain(SkeletonVersion::V2);
        let bytes = skeleton.to_bytes().unwrap();
        let parsed = SkeletonDocument::parse(&bytes).unwrap();
        assert_eq!(parsed.dummies[0].rotation, Quat::IDENTITY);
        assert_eq!(parsed.dummies[0].position, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(parsed.dummies[0].parent, 2);
    }

    #[test]
    fn test_missing_dummy_section() {
        let mut skeleton = chain(SkeletonVersion::V3);
        skeleton.dummies.clear();
        let bytes = skeleton.to_bytes().unwrap();
        // Strip the zero dummy count
        let parsed = SkeletonDocument::parse(&bytes[..bytes.len() - 4]).unwrap();
        assert!(parsed.dummies.is_empty());
        assert_eq!(parsed.bones.len(), 3);
    }

    #[test]
    fn test_roots_by_self_reference() {
        let mut skeleton = chain(SkeletonVersion::V3);
        skeleton.bones[2].parent = 2;
        assert!(skeleton.is_root(0));
        assert!(!skeleton.is_root(1));
        assert!(skeleton.is_root(2));
        assert!(!skeleton.is_root(3));
    }

    #[test]
    fn test_parent_out_of_range() {
        let mut skeleton = chain(SkeletonVersion::V3);
        skeleton.bones[1].parent = 9;
        let bytes = skeleton.to_bytes().unwrap();
        let err = SkeletonDocument::parse(&bytes).unwrap_err();
        assert_eq!(err.format, AssetFormat::Skeleton);
        assert!(matches!(
            err.source,
            AssetError::MalformedStructure { offset, .. } if offset == 7 + 4 + 35
        ));
    }

    #[test]
    fn test_bone_count_exceeds_buffer() {
        let mut bytes = b"ZMD0003".to_vec();
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        let err = SkeletonDocument::parse(&bytes).unwrap_err();
        assert!(matches!(err.source, AssetError::TruncatedData { what: "bones", .. }));
    }

    #[test]
    fn test_lookup() {
        let skeleton = chain(SkeletonVersion::V3);
        assert_eq!(skeleton.find_bone("b2"), Some(2));
        assert_eq!(skeleton.find_dummy("p_00"), Some(3));
        assert_eq!(skeleton.node(3).unwrap().name, "p_00");
        assert!(skeleton.node(4).is_none());
    }
}
