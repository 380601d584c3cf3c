//! ZSC scene composition format (.zsc)
//!
//! ```text
//! mesh_count u16,     mesh_count × path cstr
//! material_count u16, material_count × Material
//! effect_count u16,   effect_count × path cstr
//! object_count u16,   object_count × Object
//! ```
//!
//! Object: 12 skipped bytes, `part_count u16` (zero ends the object), parts,
//! `effect_count u16`, effects, 24 skipped bytes.
//!
//! Parts and effects carry their transform and bindings in a property list:
//! `(id u8, size u8, payload[size])` repeated until id 0. Payloads are read
//! from a window of exactly `size` bytes, so unknown ids are skipped without
//! understanding them.

use glam::{Quat, Vec3};
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader};
use serde::Serialize;

use crate::serialization::BinaryDocument;

const OBJECT_HEADER_SKIP: usize = 12;
const OBJECT_TRAILER_SKIP: usize = 24;

const PROP_END: u8 = 0;
const PROP_POSITION: u8 = 1;
const PROP_ROTATION: u8 = 2;
const PROP_SCALE: u8 = 3;
const PROP_AXIS_ROTATION: u8 = 4;
const PROP_BONE_INDEX: u8 = 5;
const PROP_DUMMY_INDEX: u8 = 6;
const PROP_PARENT: u8 = 7;
const PROP_COLLISION: u8 = 29;
const PROP_ANIMATION_PATH: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlendMode {
    Normal,
    Lighten,
    Custom(u16),
}

impl BlendMode {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Normal,
            1 => Self::Lighten,
            other => Self::Custom(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GlowKind {
    None,
    NotSet,
    Simple,
    Light,
    Texture,
    TextureLight,
    Alpha,
}

impl GlowKind {
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => Self::None,
            1 => Self::NotSet,
            2 => Self::Simple,
            3 => Self::Light,
            4 => Self::Texture,
            5 => Self::TextureLight,
            6 => Self::Alpha,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub path: String,
    pub is_skin: bool,
    pub alpha_enabled: bool,
    pub two_sided: bool,
    /// Alpha test reference in 0..1, when alpha testing is enabled
    pub alpha_test: Option<f32>,
    pub z_test: bool,
    pub z_write: bool,
    pub blend_mode: BlendMode,
    pub specular: bool,
    pub alpha: f32,
    /// `None` when the stored value is outside the known range
    pub glow: Option<GlowKind>,
    pub glow_color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollisionShape {
    Sphere,
    AxisAlignedBox,
    OrientedBox,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// Low three bits; `None` when not 1..=4
    pub shape: Option<CollisionShape>,
    /// Remaining bits, shifted down
    pub flags: u16,
}

impl Collision {
    pub fn from_bits(bits: u16) -> Self {
        let shape = match bits & 0b111 {
            1 => Some(CollisionShape::Sphere),
            2 => Some(CollisionShape::AxisAlignedBox),
            3 => Some(CollisionShape::OrientedBox),
            4 => Some(CollisionShape::Polygon),
            _ => None,
        };
        Self {
            shape,
            flags: bits >> 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectPart {
    pub mesh_id: u16,
    pub material_id: u16,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub bone_index: Option<u16>,
    pub dummy_index: Option<u16>,
    /// Index of the parent part within the same object
    pub parent: Option<u16>,
    pub collision: Option<Collision>,
    pub animation_path: Option<String>,
}

impl ObjectPart {
    fn new(mesh_id: u16, material_id: u16) -> Self {
        Self {
            mesh_id,
            material_id,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            bone_index: None,
            dummy_index: None,
            parent: None,
            collision: None,
            animation_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectKind {
    Normal,
    DayNight,
    LightContainer,
    Unknown(u16),
}

impl EffectKind {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Normal,
            1 => Self::DayNight,
            2 => Self::LightContainer,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEffect {
    pub effect_id: u16,
    pub kind: EffectKind,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Index of the part the effect is attached to
    pub parent: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneObject {
    pub parts: Vec<ObjectPart>,
    pub effects: Vec<ObjectEffect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneCompositionDocument {
    pub meshes: Vec<String>,
    pub materials: Vec<Material>,
    pub effects: Vec<String>,
    pub objects: Vec<SceneObject>,
}

impl SceneCompositionDocument {
    pub fn mesh_path(&self, part: &ObjectPart) -> Option<&str> {
        self.meshes.get(part.mesh_id as usize).map(String::as_str)
    }

    pub fn material(&self, part: &ObjectPart) -> Option<&Material> {
        self.materials.get(part.material_id as usize)
    }
}

/// Runs the `(id, size, payload)` loop until the terminator. `apply` reads a
/// known payload from its window and returns `false` for unknown ids.
fn read_properties<'a>(
    reader: &mut ByteReader<'a>,
    mut apply: impl FnMut(u8, &mut ByteReader<'a>) -> AssetResult<bool>,
) -> AssetResult<()> {
    loop {
        let id = reader.read_u8()?;
        if id == PROP_END {
            return Ok(());
        }
        let size = reader.read_u8()? as usize;
        let start = reader.offset();
        let mut window = reader.window(size)?;
        match apply(id, &mut window) {
            Ok(true) => {}
            Ok(false) => tracing::warn!(id, size, offset = start, "skipping unknown property"),
            Err(AssetError::OutOfBounds { .. }) => {
                return Err(AssetError::malformed(
                    start,
                    format!("property {id} payload of {size} bytes is too short"),
                ));
            }
            Err(err) => return Err(err),
        }
    }
}

fn parent_from_one_based(value: u16) -> Option<u16> {
    value.checked_sub(1)
}

fn read_part<'a>(reader: &mut ByteReader<'a>) -> AssetResult<ObjectPart> {
    let mesh_id = reader.read_u16()?;
    let material_id = reader.read_u16()?;
    let mut part = ObjectPart::new(mesh_id, material_id);

    read_properties(reader, |id, payload| {
        match id {
            PROP_POSITION => part.position = payload.read_vec3()?,
            PROP_ROTATION => part.rotation = payload.read_quat_wxyz()?,
            PROP_SCALE => part.scale = payload.read_vec3()?,
            PROP_AXIS_ROTATION => {}
            PROP_BONE_INDEX => part.bone_index = Some(payload.read_u16()?),
            PROP_DUMMY_INDEX => part.dummy_index = Some(payload.read_u16()?),
            PROP_PARENT => part.parent = parent_from_one_based(payload.read_u16()?),
            PROP_COLLISION => part.collision = Some(Collision::from_bits(payload.read_u16()?)),
            PROP_ANIMATION_PATH => {
                let len = payload.remaining();
                let path = payload.read_fixed_string(len)?;
                part.animation_path = (!path.is_empty()).then_some(path);
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(part)
}

fn read_effect<'a>(reader: &mut ByteReader<'a>) -> AssetResult<ObjectEffect> {
    let effect_id = reader.read_u16()?;
    let kind = EffectKind::from_u16(reader.read_u16()?);
    let mut effect = ObjectEffect {
        effect_id,
        kind,
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        parent: None,
    };

    read_properties(reader, |id, payload| {
        match id {
            PROP_POSITION => effect.position = payload.read_vec3()?,
            PROP_ROTATION => effect.rotation = payload.read_quat_wxyz()?,
            PROP_SCALE => effect.scale = payload.read_vec3()?,
            PROP_PARENT => effect.parent = parent_from_one_based(payload.read_u16()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(effect)
}

fn read_material(reader: &mut ByteReader<'_>) -> AssetResult<Material> {
    let path = reader.read_cstring()?;
    let is_skin = reader.read_u16()? != 0;
    let alpha_enabled = reader.read_u16()? != 0;
    let two_sided = reader.read_u16()? != 0;
    let alpha_test_enabled = reader.read_u16()? != 0;
    let alpha_ref = f32::from(reader.read_u16()?) / 256.0;
    let z_test = reader.read_u16()? != 0;
    let z_write = reader.read_u16()? != 0;
    let blend_mode = BlendMode::from_u16(reader.read_u16()?);
    let specular = reader.read_u16()? != 0;
    let alpha = reader.read_f32()?;
    let glow = GlowKind::from_u16(reader.read_u16()?);
    let glow_color = reader.read_vec3()?;

    Ok(Material {
        path,
        is_skin,
        alpha_enabled,
        two_sided,
        alpha_test: alpha_test_enabled.then_some(alpha_ref),
        z_test,
        z_write,
        blend_mode,
        specular,
        alpha,
        glow,
        glow_color,
    })
}

fn read_paths(reader: &mut ByteReader<'_>, what: &'static str) -> AssetResult<Vec<String>> {
    let count = reader.read_u16()? as usize;
    reader.ensure_available(what, count, 1)?;
    (0..count).map(|_| reader.read_cstring()).collect()
}

impl BinaryDocument for SceneCompositionDocument {
    const FORMAT: AssetFormat = AssetFormat::SceneComposition;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let meshes = read_paths(reader, "mesh paths")?;

        let material_count = reader.read_u16()? as usize;
        // path terminator + 9 u16 + alpha + glow type + glow color
        reader.ensure_available("materials", material_count, 1 + 18 + 4 + 2 + 12)?;
        let materials = (0..material_count)
            .map(|_| read_material(reader))
            .collect::<AssetResult<Vec<_>>>()?;

        let effects = read_paths(reader, "effect paths")?;

        let object_count = reader.read_u16()? as usize;
        reader.ensure_available("objects", object_count, OBJECT_HEADER_SKIP + 2)?;
        let mut objects = Vec::with_capacity(object_count);
        for object_index in 0..object_count {
            reader.skip(OBJECT_HEADER_SKIP)?;
            let part_count = reader.read_u16()? as usize;
            if part_count == 0 {
                objects.push(SceneObject::default());
                continue;
            }

            let mut object = SceneObject::default();
            for _ in 0..part_count {
                let offset = reader.offset();
                let part = read_part(reader)?;
                if part.mesh_id as usize >= meshes.len() {
                    return Err(AssetError::malformed(
                        offset,
                        format!(
                            "object {object_index} part uses mesh {} of {}",
                            part.mesh_id,
                            meshes.len()
                        ),
                    ));
                }
                if part.material_id as usize >= materials.len() {
                    return Err(AssetError::malformed(
                        offset,
                        format!(
                            "object {object_index} part uses material {} of {}",
                            part.material_id,
                            materials.len()
                        ),
                    ));
                }
                if part.parent.is_some_and(|p| p as usize >= part_count) {
                    return Err(AssetError::malformed(
                        offset,
                        format!("object {object_index} part parent outside {part_count} parts"),
                    ));
                }
                object.parts.push(part);
            }

            let effect_count = reader.read_u16()? as usize;
            for _ in 0..effect_count {
                let offset = reader.offset();
                let effect = read_effect(reader)?;
                if effect.effect_id as usize >= effects.len() {
                    return Err(AssetError::malformed(
                        offset,
                        format!(
                            "object {object_index} uses effect {} of {}",
                            effect.effect_id,
                            effects.len()
                        ),
                    ));
                }
                if effect.parent.is_some_and(|p| p as usize >= part_count) {
                    return Err(AssetError::malformed(
                        offset,
                        format!("object {object_index} effect parent outside {part_count} parts"),
                    ));
                }
                object.effects.push(effect);
            }

            reader.skip(OBJECT_TRAILER_SKIP)?;
            objects.push(object);
        }

        tracing::debug!(
            meshes = meshes.len(),
            materials = materials.len(),
            effects = effects.len(),
            objects = objects.len(),
            "parsed scene composition"
        );

        Ok(SceneCompositionDocument {
            meshes,
            materials,
            effects,
            objects,
        })
    }
}
