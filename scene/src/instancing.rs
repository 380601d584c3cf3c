//! Zone placements resolved against a scene composition
//!
//! A placement names a composition object by `object_id`. Each part of that
//! object chains through its parent part, and the whole object sits under the
//! placement transform:
//!
//! ```text
//! object[part]  = object[parent] * local[part]    (local[part] when unparented)
//! world[part]   = placement * object[part]
//! world[effect] = world[parent part] * local[effect]
//! ```
//!
//! Placements whose `object_id` is past the composition's object list are
//! skipped with a warning.

use glam::{Mat4, Quat, Vec3};
use rose_formats::SceneCompositionDocument;
use rose_formats::composition::{ObjectEffect, ObjectPart, SceneObject};
use rose_formats::placement::{PlacedObject, Placement};
use rose_shared::AssetResult;
use serde::Serialize;

use crate::pose::resolve_hierarchy;

fn scale_rotation_translation(scale: Vec3, rotation: Quat, position: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

pub fn placement_transform(object: &PlacedObject) -> Mat4 {
    scale_rotation_translation(object.scale, object.rotation, object.position)
}

pub fn part_transform(part: &ObjectPart) -> Mat4 {
    scale_rotation_translation(part.scale, part.rotation, part.position)
}

pub fn effect_transform(effect: &ObjectEffect) -> Mat4 {
    scale_rotation_translation(effect.scale, effect.rotation, effect.position)
}

/// Object-space transform of every part of `object`.
///
/// Fails with [`CyclicHierarchy`](rose_shared::AssetError::CyclicHierarchy)
/// when parent links loop.
pub fn resolve_parts(object: &SceneObject) -> AssetResult<Vec<Mat4>> {
    let parents: Vec<u32> = object
        .parts
        .iter()
        .enumerate()
        .map(|(index, part)| part.parent.map_or(index as u32, u32::from))
        .collect();
    let locals: Vec<Mat4> = object.parts.iter().map(part_transform).collect();
    resolve_hierarchy(&parents, &locals)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartInstance {
    /// Index within the composition object
    pub part: usize,
    pub mesh_id: u16,
    pub material_id: u16,
    pub world: Mat4,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectInstance {
    pub effect: usize,
    pub effect_id: u16,
    pub world: Mat4,
}

/// One placed composition object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInstance {
    /// Position of the placement in the sequence given to [`instantiate`]
    pub placement: usize,
    pub object_id: u32,
    pub parts: Vec<PartInstance>,
    pub effects: Vec<EffectInstance>,
}

impl ObjectInstance {
    pub fn new(placement: usize, placed: &PlacedObject, object: &SceneObject) -> AssetResult<Self> {
        let root = placement_transform(placed);
        let worlds: Vec<Mat4> = resolve_parts(object)?
            .into_iter()
            .map(|part_object| root * part_object)
            .collect();

        let parts = object
            .parts
            .iter()
            .zip(&worlds)
            .enumerate()
            .map(|(index, (part, &world))| PartInstance {
                part: index,
                mesh_id: part.mesh_id,
                material_id: part.material_id,
                world,
            })
            .collect();

        let effects = object
            .effects
            .iter()
            .enumerate()
            .map(|(index, effect)| {
                let parent = effect
                    .parent
                    .and_then(|p| worlds.get(p as usize).copied())
                    .unwrap_or(root);
                EffectInstance {
                    effect: index,
                    effect_id: effect.effect_id,
                    world: parent * effect_transform(effect),
                }
            })
            .collect();

        Ok(Self {
            placement,
            object_id: placed.object_id,
            parts,
            effects,
        })
    }
}

/// Resolves every placement that names an object in `composition`.
///
/// Placements usually come from one block of a placement document, since
/// each block refers to its own composition file.
pub fn instantiate<'p>(
    placements: impl IntoIterator<Item = &'p Placement>,
    composition: &SceneCompositionDocument,
) -> AssetResult<Vec<ObjectInstance>> {
    let mut instances = Vec::new();
    for (index, placement) in placements.into_iter().enumerate() {
        let object_id = placement.object.object_id;
        let Some(object) = composition.objects.get(object_id as usize) else {
            tracing::warn!(
                placement = index,
                object_id,
                objects = composition.objects.len(),
                "skipping placement of unknown object"
            );
            continue;
        };
        instances.push(ObjectInstance::new(index, &placement.object, object)?);
    }

    tracing::debug!(instances = instances.len(), "instantiated placements");
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec2;
    use rose_formats::composition::EffectKind;
    use rose_formats::placement::PlacementKind;
    use rose_shared::AssetError;
    use std::f32::consts::FRAC_PI_2;

    fn part(mesh_id: u16, position: Vec3, parent: Option<u16>) -> ObjectPart {
        ObjectPart {
            mesh_id,
            material_id: 0,
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            bone_index: None,
            dummy_index: None,
            parent,
            collision: None,
            animation_path: None,
        }
    }

    fn placement(object_id: u32, position: Vec3, rotation: Quat, scale: Vec3) -> Placement {
        Placement {
            object: PlacedObject {
                name: String::new(),
                warp_id: 0,
                event_id: 0,
                object_type: 1,
                object_id,
                minimap_position: UVec2::ZERO,
                rotation,
                position,
                scale,
            },
            kind: PlacementKind::Decoration,
        }
    }

    /// Trunk at the origin, a branch on the trunk and a leaf on the branch.
    fn composition() -> SceneCompositionDocument {
        let mut branch = part(1, Vec3::new(0.0, 0.0, 100.0), Some(0));
        branch.rotation = Quat::from_rotation_z(FRAC_PI_2);
        SceneCompositionDocument {
            meshes: vec!["trunk.zms".into(), "branch.zms".into(), "leaf.zms".into()],
            materials: Vec::new(),
            effects: vec!["sparkle.eft".into()],
            objects: vec![SceneObject {
                // leaf listed before its parent
                parts: vec![
                    part(0, Vec3::ZERO, None),
                    part(2, Vec3::new(10.0, 0.0, 0.0), Some(2)),
                    branch,
                ],
                effects: vec![ObjectEffect {
                    effect_id: 0,
                    kind: EffectKind::Normal,
                    position: Vec3::new(0.0, 0.0, 5.0),
                    rotation: Quat::IDENTITY,
                    scale: Vec3::ONE,
                    parent: Some(1),
                }],
            }],
        }
    }

    fn origin(world: Mat4) -> Vec3 {
        world.transform_point3(Vec3::ZERO)
    }

    #[test]
    fn test_parented_part_chain() {
        let placements = [placement(
            0,
            Vec3::new(1000.0, 2000.0, 0.0),
            Quat::IDENTITY,
            Vec3::splat(2.0),
        )];
        let instances = instantiate(&placements, &composition()).unwrap();
        assert_eq!(instances.len(), 1);
        let parts = &instances[0].parts;
        assert_eq!(parts.len(), 3);

        assert!((origin(parts[0].world) - Vec3::new(1000.0, 2000.0, 0.0)).length() < 1e-3);
        // branch: 100 up, doubled by the placement scale
        assert!((origin(parts[2].world) - Vec3::new(1000.0, 2000.0, 200.0)).length() < 1e-3);
        // leaf: 10 along the branch's rotated x axis, which points along +y
        let leaf = origin(parts[1].world);
        assert!((leaf - Vec3::new(1000.0, 2020.0, 200.0)).length() < 1e-3, "{leaf}");
        assert_eq!(parts[1].mesh_id, 2);

        let effect = origin(instances[0].effects[0].world);
        assert!((effect - Vec3::new(1000.0, 2020.0, 210.0)).length() < 1e-3, "{effect}");
    }

    #[test]
    fn test_placement_rotation_applies_to_parts() {
        let placements = [placement(
            0,
            Vec3::ZERO,
            Quat::from_rotation_z(FRAC_PI_2),
            Vec3::ONE,
        )];
        let instances = instantiate(&placements, &composition()).unwrap();
        // leaf offset (0, 10) in object space turns to (-10, 0)
        let leaf = origin(instances[0].parts[1].world);
        assert!((leaf - Vec3::new(-10.0, 0.0, 100.0)).length() < 1e-3, "{leaf}");
    }

    #[test]
    fn test_out_of_range_object_is_skipped() {
        let placements = [
            placement(7, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
            placement(0, Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE),
        ];
        let instances = instantiate(&placements, &composition()).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].placement, 1);
        assert_eq!(instances[0].object_id, 0);
    }

    #[test]
    fn test_part_cycle_is_an_error() {
        let object = SceneObject {
            parts: vec![
                part(0, Vec3::ZERO, Some(1)),
                part(0, Vec3::ZERO, Some(0)),
            ],
            effects: Vec::new(),
        };
        let err = resolve_parts(&object).unwrap_err();
        assert!(matches!(err, AssetError::CyclicHierarchy { .. }));
    }
}
