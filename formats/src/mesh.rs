//! ZMS mesh format (.zms)
//!
//! Two layout families share one header:
//!
//! ```text
//! 0x00: tag [u8; 8]        "ZMS0005".."ZMS0008", NUL padded
//! 0x08: format u32         VertexFormat bits
//! 0x0C: bbox_min vec3
//! 0x18: bbox_max vec3
//! ```
//!
//! Legacy (5, 6): 32-bit counts and indices, every vertex/triangle/material
//! record prefixed by a discarded u32 id, bone table entries are
//! (discarded u32, u32 id) pairs, positions stored at 100x scale.
//!
//! Compact (7, 8): 16-bit counts and indices, no record ids, plain u16 bone
//! table, triangle strips, and (8 only) a trailing pool type.
//!
//! Vertex attributes are stored as one block per attribute, in the fixed
//! order position, normal, color, bones, tangent, uv1..uv4. Bone weights and
//! bone indices form a single block that is present only when both flags are
//! set.

use bitflags::bitflags;
use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Vec2, Vec3, Vec4};
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader, WriteAssetExt};
use serde::Serialize;
use std::io::{self, Write};

use crate::serialization::{BinaryDocument, BinaryEncode};

/// Legacy meshes store positions in centimeters at this scale.
pub const LEGACY_POSITION_SCALE: f32 = 100.0;

bitflags! {
    /// Per-vertex attributes present in a mesh.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct VertexFormat: u32 {
        const POSITION = 1 << 1;
        const NORMAL = 1 << 2;
        const COLOR = 1 << 3;
        const BONE_WEIGHT = 1 << 4;
        const BONE_INDEX = 1 << 5;
        const TANGENT = 1 << 6;
        const UV1 = 1 << 7;
        const UV2 = 1 << 8;
        const UV3 = 1 << 9;
        const UV4 = 1 << 10;
    }
}

impl VertexFormat {
    pub const UV_CHANNELS: [VertexFormat; 4] = [Self::UV1, Self::UV2, Self::UV3, Self::UV4];
    pub const BONES: VertexFormat = Self::BONE_WEIGHT.union(Self::BONE_INDEX);

    /// Bone weights and indices are only stored together.
    pub fn has_bones(self) -> bool {
        self.contains(Self::BONES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MeshVersion {
    V5,
    V6,
    V7,
    V8,
}

/// Binary layout family selected by the version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFamily {
    Legacy,
    Compact,
}

impl MeshVersion {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ZMS0005" => Some(Self::V5),
            "ZMS0006" => Some(Self::V6),
            "ZMS0007" => Some(Self::V7),
            "ZMS0008" => Some(Self::V8),
            _ => None,
        }
    }

    pub const fn tag(self) -> &'static [u8; 8] {
        match self {
            Self::V5 => b"ZMS0005\0",
            Self::V6 => b"ZMS0006\0",
            Self::V7 => b"ZMS0007\0",
            Self::V8 => b"ZMS0008\0",
        }
    }

    pub const fn family(self) -> MeshFamily {
        match self {
            Self::V5 | Self::V6 => MeshFamily::Legacy,
            Self::V7 | Self::V8 => MeshFamily::Compact,
        }
    }

    const fn has_materials(self) -> bool {
        !matches!(self, Self::V5)
    }

    const fn has_pool(self) -> bool {
        matches!(self, Self::V8)
    }
}

impl MeshFamily {
    /// Bytes of discarded id in front of each vertex, triangle and material
    /// record.
    const fn record_prefix(self) -> usize {
        match self {
            Self::Legacy => 4,
            Self::Compact => 0,
        }
    }

    const fn index_size(self) -> usize {
        match self {
            Self::Legacy => 4,
            Self::Compact => 2,
        }
    }

    fn read_count(self, reader: &mut ByteReader<'_>) -> AssetResult<usize> {
        Ok(self.read_index(reader)? as usize)
    }

    fn read_index(self, reader: &mut ByteReader<'_>) -> AssetResult<u32> {
        match self {
            Self::Legacy => reader.read_u32(),
            Self::Compact => reader.read_u16().map(u32::from),
        }
    }

    fn skip_record_id(self, reader: &mut ByteReader<'_>) -> AssetResult<()> {
        reader.skip(self.record_prefix())
    }

    fn write_index<W: Write + ?Sized>(self, w: &mut W, value: u32) -> io::Result<()> {
        match self {
            Self::Legacy => w.write_u32::<LittleEndian>(value),
            Self::Compact => {
                let value = u16::try_from(value)
                    .map_err(|_| invalid(format!("value {value} exceeds 16-bit layout")))?;
                w.write_u16::<LittleEndian>(value)
            }
        }
    }

    fn write_count<W: Write + ?Sized>(self, w: &mut W, count: usize) -> io::Result<()> {
        let count =
            u32::try_from(count).map_err(|_| invalid(format!("count {count} exceeds u32")))?;
        self.write_index(w, count)
    }

    fn write_record_id<W: Write + ?Sized>(self, w: &mut W, id: usize) -> io::Result<()> {
        match self {
            Self::Legacy => w.write_u32::<LittleEndian>(id as u32),
            Self::Compact => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// A parsed ZMS mesh.
///
/// Attribute arrays are `Some` exactly when their flag is set in `format`
/// and then hold `vertex_count` entries. Bone indices are slots into
/// `bone_table`, not skeleton ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshDocument {
    pub version: MeshVersion,
    pub format: VertexFormat,
    pub bounding_box: BoundingBox,
    /// Mesh bone slot -> skeleton node id
    pub bone_table: Vec<u32>,
    pub vertex_count: usize,
    pub positions: Option<Vec<Vec3>>,
    pub normals: Option<Vec<Vec3>>,
    /// RGBA
    pub colors: Option<Vec<Vec4>>,
    pub bone_weights: Option<Vec<Vec4>>,
    pub bone_indices: Option<Vec<[u32; 4]>>,
    pub tangents: Option<Vec<Vec3>>,
    pub uvs: [Option<Vec<Vec2>>; 4],
    /// Flat triangle list, three entries per triangle
    pub indices: Vec<u32>,
    /// Faces per material, in draw order. Empty for version 5.
    pub material_face_counts: Vec<u32>,
    pub strip_indices: Vec<u32>,
    pub pool_type: Option<u16>,
}

impl MeshDocument {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
    }

    pub fn uv(&self, channel: usize) -> Option<&[Vec2]> {
        self.uvs.get(channel)?.as_deref()
    }

    pub fn is_skinned(&self) -> bool {
        self.bone_weights.is_some() && self.bone_indices.is_some()
    }

    /// Checks that the arrays agree with `format`, `vertex_count` and each
    /// other. Parsed documents always pass; hand-built ones are checked
    /// before encoding.
    pub fn check_layout(&self) -> Result<(), String> {
        fn check<T>(
            name: &str,
            enabled: bool,
            values: &Option<Vec<T>>,
            vertex_count: usize,
        ) -> Result<(), String> {
            match (enabled, values) {
                (true, Some(v)) if v.len() == vertex_count => Ok(()),
                (true, Some(v)) => Err(format!(
                    "{name} has {} entries for {vertex_count} vertices",
                    v.len()
                )),
                (true, None) => Err(format!("{name} flagged but missing")),
                (false, Some(_)) => Err(format!("{name} present but not flagged")),
                (false, None) => Ok(()),
            }
        }

        let n = self.vertex_count;
        let f = self.format;
        check("positions", f.contains(VertexFormat::POSITION), &self.positions, n)?;
        check("normals", f.contains(VertexFormat::NORMAL), &self.normals, n)?;
        check("colors", f.contains(VertexFormat::COLOR), &self.colors, n)?;
        check("bone weights", f.has_bones(), &self.bone_weights, n)?;
        check("bone indices", f.has_bones(), &self.bone_indices, n)?;
        check("tangents", f.contains(VertexFormat::TANGENT), &self.tangents, n)?;
        for (i, flag) in VertexFormat::UV_CHANNELS.into_iter().enumerate() {
            check(&format!("uv{}", i + 1), f.contains(flag), &self.uvs[i], n)?;
        }

        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "index list length {} is not a multiple of 3",
                self.indices.len()
            ));
        }
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(format!("triangle index {bad} >= vertex count {n}"));
        }
        if let Some(bad) = self.strip_indices.iter().find(|&&i| i as usize >= n) {
            return Err(format!("strip index {bad} >= vertex count {n}"));
        }
        if !self.material_face_counts.is_empty() {
            let sum: u64 = self.material_face_counts.iter().map(|&c| u64::from(c)).sum();
            if sum != self.triangle_count() as u64 {
                return Err(format!(
                    "material face counts sum to {sum}, mesh has {} triangles",
                    self.triangle_count()
                ));
            }
        }
        if let (Some(weights), Some(bones)) = (&self.bone_weights, &self.bone_indices) {
            let table_len = self.bone_table.len();
            for (vertex, (w, slots)) in weights.iter().zip(bones).enumerate() {
                for (k, &slot) in slots.iter().enumerate() {
                    if w[k] != 0.0 && slot as usize >= table_len {
                        return Err(format!(
                            "vertex {vertex} bone slot {slot} >= bone table length {table_len}"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

/// Reads one attribute block: `count` records of `payload` bytes, each with
/// the family's record prefix.
fn read_vertex_block<'a, T>(
    reader: &mut ByteReader<'a>,
    family: MeshFamily,
    what: &'static str,
    count: usize,
    payload: usize,
    mut read: impl FnMut(&mut ByteReader<'a>) -> AssetResult<T>,
) -> AssetResult<Vec<T>> {
    reader.ensure_available(what, count, family.record_prefix() + payload)?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        family.skip_record_id(reader)?;
        values.push(read(reader)?);
    }
    Ok(values)
}

impl BinaryDocument for MeshDocument {
    const FORMAT: AssetFormat = AssetFormat::Mesh;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let tag = reader.read_fixed_string(8)?;
        let version = MeshVersion::from_tag(&tag).ok_or(AssetError::UnsupportedVersion { tag })?;
        let family = version.family();

        let format = VertexFormat::from_bits_retain(reader.read_u32()?);
        let bounding_box = BoundingBox {
            min: reader.read_vec3()?,
            max: reader.read_vec3()?,
        };

        // Bone table
        let bone_count = family.read_count(reader)?;
        reader.ensure_available("bone table", bone_count, family.record_prefix() + family.index_size())?;
        let mut bone_table = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            family.skip_record_id(reader)?;
            bone_table.push(family.read_index(reader)?);
        }

        let vertex_count = family.read_count(reader)?;

        let positions = if format.contains(VertexFormat::POSITION) {
            Some(read_vertex_block(reader, family, "positions", vertex_count, 12, |r| {
                let p = r.read_vec3()?;
                Ok(match family {
                    MeshFamily::Legacy => p / LEGACY_POSITION_SCALE,
                    MeshFamily::Compact => p,
                })
            })?)
        } else {
            None
        };

        let normals = if format.contains(VertexFormat::NORMAL) {
            Some(read_vertex_block(reader, family, "normals", vertex_count, 12, |r| {
                r.read_vec3()
            })?)
        } else {
            None
        };

        let colors = if format.contains(VertexFormat::COLOR) {
            Some(read_vertex_block(reader, family, "colors", vertex_count, 16, |r| {
                r.read_vec4()
            })?)
        } else {
            None
        };

        let bones_offset = reader.offset();
        let (bone_weights, bone_indices) = if format.has_bones() {
            let block = read_vertex_block(
                reader,
                family,
                "bone weights",
                vertex_count,
                16 + 4 * family.index_size(),
                |r| {
                    let weights = r.read_vec4()?;
                    let mut slots = [0u32; 4];
                    for slot in &mut slots {
                        *slot = family.read_index(r)?;
                    }
                    Ok((weights, slots))
                },
            )?;
            let (weights, slots): (Vec<_>, Vec<_>) = block.into_iter().unzip();
            (Some(weights), Some(slots))
        } else {
            (None, None)
        };

        let tangents = if format.contains(VertexFormat::TANGENT) {
            Some(read_vertex_block(reader, family, "tangents", vertex_count, 12, |r| {
                r.read_vec3()
            })?)
        } else {
            None
        };

        let mut uvs: [Option<Vec<Vec2>>; 4] = Default::default();
        for (slot, flag) in uvs.iter_mut().zip(VertexFormat::UV_CHANNELS) {
            if format.contains(flag) {
                *slot = Some(read_vertex_block(reader, family, "uvs", vertex_count, 8, |r| {
                    r.read_vec2()
                })?);
            }
        }

        // Triangles
        let triangles_offset = reader.offset();
        let triangle_count = family.read_count(reader)?;
        reader.ensure_available(
            "triangles",
            triangle_count,
            family.record_prefix() + 3 * family.index_size(),
        )?;
        let mut indices = Vec::with_capacity(triangle_count * 3);
        for _ in 0..triangle_count {
            family.skip_record_id(reader)?;
            for _ in 0..3 {
                indices.push(family.read_index(reader)?);
            }
        }

        let materials_offset = reader.offset();
        let material_face_counts = if version.has_materials() {
            let count = family.read_count(reader)?;
            reader.ensure_available(
                "material face counts",
                count,
                family.record_prefix() + family.index_size(),
            )?;
            let mut counts = Vec::with_capacity(count);
            for _ in 0..count {
                family.skip_record_id(reader)?;
                counts.push(family.read_index(reader)?);
            }
            counts
        } else {
            Vec::new()
        };

        let strips_offset = reader.offset();
        let strip_indices = match family {
            MeshFamily::Legacy => Vec::new(),
            MeshFamily::Compact => {
                let count = reader.read_u16()? as usize;
                reader.ensure_available("strip indices", count, 2)?;
                let mut strips = Vec::with_capacity(count);
                for _ in 0..count {
                    strips.push(u32::from(reader.read_u16()?));
                }
                strips
            }
        };

        let pool_type = if version.has_pool() {
            Some(reader.read_u16()?)
        } else {
            None
        };

        let mesh = MeshDocument {
            version,
            format,
            bounding_box,
            bone_table,
            vertex_count,
            positions,
            normals,
            colors,
            bone_weights,
            bone_indices,
            tangents,
            uvs,
            indices,
            material_face_counts,
            strip_indices,
            pool_type,
        };

        // Attribute arrays are consistent by construction; check the
        // cross-references against the counts read above.
        if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(AssetError::malformed(
                triangles_offset,
                format!("triangle index {bad} >= vertex count {vertex_count}"),
            ));
        }
        if let Some(bad) = mesh.strip_indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(AssetError::malformed(
                strips_offset,
                format!("strip index {bad} >= vertex count {vertex_count}"),
            ));
        }
        if !mesh.material_face_counts.is_empty() {
            let sum: u64 = mesh.material_face_counts.iter().map(|&c| u64::from(c)).sum();
            if sum != triangle_count as u64 {
                return Err(AssetError::malformed(
                    materials_offset,
                    format!("material face counts sum to {sum}, mesh has {triangle_count} triangles"),
                ));
            }
        }
        if let Err(reason) = mesh.check_layout() {
            return Err(AssetError::malformed(bones_offset, reason));
        }

        tracing::debug!(
            version = ?version,
            vertices = vertex_count,
            triangles = triangle_count,
            bones = mesh.bone_table.len(),
            format = ?format,
            "parsed mesh"
        );

        Ok(mesh)
    }
}

fn write_vertex_block<W: Write, T: Copy>(
    w: &mut W,
    family: MeshFamily,
    values: &Option<Vec<T>>,
    mut write: impl FnMut(&mut W, T) -> io::Result<()>,
) -> io::Result<()> {
    if let Some(values) = values {
        for (id, &value) in values.iter().enumerate() {
            family.write_record_id(w, id)?;
            write(w, value)?;
        }
    }
    Ok(())
}

impl BinaryEncode for MeshDocument {
    /// Writes the mesh in its version's layout. Discarded legacy ids are
    /// written as the record's index.
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.check_layout().map_err(invalid)?;
        let family = self.version.family();

        w.write_all(self.version.tag())?;
        w.write_u32::<LittleEndian>(self.format.bits())?;
        w.write_vec3(self.bounding_box.min)?;
        w.write_vec3(self.bounding_box.max)?;

        family.write_count(w, self.bone_table.len())?;
        for (slot, &bone) in self.bone_table.iter().enumerate() {
            family.write_record_id(w, slot)?;
            family.write_index(w, bone)?;
        }

        family.write_count(w, self.vertex_count)?;
        write_vertex_block(w, family, &self.positions, |w, p: Vec3| match family {
            MeshFamily::Legacy => w.write_vec3(p * LEGACY_POSITION_SCALE),
            MeshFamily::Compact => w.write_vec3(p),
        })?;
        write_vertex_block(w, family, &self.normals, |w, n| w.write_vec3(n))?;
        write_vertex_block(w, family, &self.colors, |w, c| w.write_vec4(c))?;
        if let (Some(weights), Some(slots)) = (&self.bone_weights, &self.bone_indices) {
            for (id, (&weight, bones)) in weights.iter().zip(slots).enumerate() {
                family.write_record_id(w, id)?;
                w.write_vec4(weight)?;
                for &bone in bones {
                    family.write_index(w, bone)?;
                }
            }
        }
        write_vertex_block(w, family, &self.tangents, |w, t| w.write_vec3(t))?;
        for uv in &self.uvs {
            write_vertex_block(w, family, uv, |w, t| w.write_vec2(t))?;
        }

        family.write_count(w, self.triangle_count())?;
        for (id, tri) in self.triangles().enumerate() {
            family.write_record_id(w, id)?;
            for index in tri {
                family.write_index(w, index)?;
            }
        }

        if self.version.has_materials() {
            family.write_count(w, self.material_face_counts.len())?;
            for (id, &count) in self.material_face_counts.iter().enumerate() {
                family.write_record_id(w, id)?;
                family.write_index(w, count)?;
            }
        }

        if family == MeshFamily::Compact {
            family.write_count(w, self.strip_indices.len())?;
            for &index in &self.strip_indices {
                family.write_index(w, index)?;
            }
        }

        if self.version.has_pool() {
            w.write_u16::<LittleEndian>(self.pool_type.unwrap_or(0))?;
        }

        Ok(())
    }
}
