//! Skeleton hierarchy resolution
//!
//! Nodes (bones, then dummies) carry parent-relative transforms. Object-space
//! transforms are resolved from the roots outward:
//!
//! ```text
//! object[root]  = local[root]                  where parent[root] == root
//! object[child] = object[parent] * local[child]
//! ```
//!
//! A root is any node naming itself as parent, wherever it sits in the list.

use glam::{Mat4, Quat, Vec3};
use rose_formats::{AnimationDocument, SkeletonDocument, SkeletonNode};
use rose_shared::{AssetError, AssetResult, BoneMatrix3x4, CoordinateConvention};
use serde::Serialize;

use crate::sampler::AnimationSampler;

pub fn local_transform(rotation: Quat, position: Vec3) -> Mat4 {
    Mat4::from_rotation_translation(rotation, position)
}

fn node_transform(node: &SkeletonNode) -> Mat4 {
    local_transform(node.rotation, node.position)
}

/// Composes local transforms down the parent graph.
///
/// Runs passes until every node is resolved. A pass that resolves nothing
/// means some parent chain never reaches a root.
pub fn resolve_hierarchy(parents: &[u32], locals: &[Mat4]) -> AssetResult<Vec<Mat4>> {
    debug_assert_eq!(parents.len(), locals.len());
    let count = parents.len();
    let mut object: Vec<Option<Mat4>> = vec![None; count];
    let mut remaining = count;

    while remaining > 0 {
        let mut progressed = false;
        for node in 0..count {
            if object[node].is_some() {
                continue;
            }
            let parent = parents[node] as usize;
            let resolved = if parent == node {
                Some(locals[node])
            } else {
                object
                    .get(parent)
                    .copied()
                    .flatten()
                    .map(|parent_object| parent_object * locals[node])
            };
            if resolved.is_some() {
                object[node] = resolved;
                remaining -= 1;
                progressed = true;
            }
        }

        if !progressed {
            let node = object.iter().position(Option::is_none).unwrap_or(0);
            return Err(AssetError::CyclicHierarchy {
                node,
                parent: parents[node] as usize,
            });
        }
    }

    Ok(object.into_iter().flatten().collect())
}

/// Rest pose of a skeleton, one entry per node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindPose {
    pub parents: Vec<u32>,
    pub local: Vec<Mat4>,
    pub object: Vec<Mat4>,
    /// Inverse of each object-space transform
    pub inverse_bind: Vec<Mat4>,
}

impl BindPose {
    pub fn from_skeleton(skeleton: &SkeletonDocument) -> AssetResult<Self> {
        let parents: Vec<u32> = skeleton.nodes().map(|node| node.parent).collect();
        let local: Vec<Mat4> = skeleton.nodes().map(node_transform).collect();
        let object = resolve_hierarchy(&parents, &local)?;
        let inverse_bind = object.iter().map(Mat4::inverse).collect();

        tracing::debug!(nodes = parents.len(), "resolved bind pose");

        Ok(Self {
            parents,
            local,
            object,
            inverse_bind,
        })
    }

    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    pub fn is_root(&self, node: usize) -> bool {
        self.parents.get(node).is_some_and(|&p| p as usize == node)
    }

    /// Object-space origin of each node.
    pub fn joint_positions(&self) -> Vec<Vec3> {
        self.object
            .iter()
            .map(|m| m.transform_point3(Vec3::ZERO))
            .collect()
    }

    /// Every matrix expressed in `convention`.
    pub fn converted(&self, convention: &CoordinateConvention) -> Self {
        let convert = |matrices: &[Mat4]| -> Vec<Mat4> {
            matrices.iter().map(|&m| convention.matrix(m)).collect()
        };
        Self {
            parents: self.parents.clone(),
            local: convert(&self.local),
            object: convert(&self.object),
            inverse_bind: convert(&self.inverse_bind),
        }
    }
}

/// Object-space transforms of one animated frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
    pub local: Vec<Mat4>,
    pub object: Vec<Mat4>,
}

impl Pose {
    /// The skeleton at rest.
    pub fn bind(bind: &BindPose) -> Self {
        Self {
            local: bind.local.clone(),
            object: bind.object.clone(),
        }
    }

    /// Applies the animation's position and rotation channels at `time`
    /// seconds over the skeleton's rest values. Nodes without a channel keep
    /// their rest component.
    pub fn sample(
        bind: &BindPose,
        skeleton: &SkeletonDocument,
        animation: &AnimationDocument,
        time: f64,
    ) -> AssetResult<Self> {
        if skeleton.node_count() != bind.node_count() {
            return Err(AssetError::invalid_reference(
                format!(
                    "bind pose has {} nodes, skeleton has {}",
                    bind.node_count(),
                    skeleton.node_count()
                ),
            ));
        }

        let sampler = AnimationSampler::new(animation);
        let local: Vec<Mat4> = skeleton
            .nodes()
            .enumerate()
            .map(|(index, node)| {
                let bone = index as u32;
                let position = sampler.position(bone, time).unwrap_or(node.position);
                let rotation = sampler.rotation(bone, time).unwrap_or(node.rotation);
                local_transform(rotation, position)
            })
            .collect();
        let object = resolve_hierarchy(&bind.parents, &local)?;
        Ok(Self { local, object })
    }

    /// `current * inverse_bind` per node: the matrix that moves a rest-pose
    /// vertex into this pose.
    pub fn skinning_matrices(&self, bind: &BindPose) -> Vec<Mat4> {
        self.object
            .iter()
            .zip(&bind.inverse_bind)
            .map(|(current, inverse)| *current * *inverse)
            .collect()
    }

    /// Skinning matrices packed for upload.
    pub fn palette(&self, bind: &BindPose) -> Vec<BoneMatrix3x4> {
        self.skinning_matrices(bind)
            .into_iter()
            .map(BoneMatrix3x4::from_mat4)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rose_formats::skeleton::SkeletonVersion;
    use rose_formats::{Channel, ChannelKind, ChannelValues};

    fn approx_mat(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    fn node(name: &str, parent: u32, position: Vec3, rotation: Quat) -> SkeletonNode {
        SkeletonNode {
            name: name.into(),
            parent,
            position,
            rotation,
        }
    }

    fn three_bone_chain() -> SkeletonDocument {
        SkeletonDocument {
            version: SkeletonVersion::V3,
            bones: vec![
                node("root", 0, Vec3::new(0.0, 0.0, 1.0), Quat::from_rotation_z(0.5)),
                node("spine", 0, Vec3::new(2.0, 0.0, 0.0), Quat::from_rotation_x(0.3)),
                node("head", 1, Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY),
            ],
            dummies: vec![node("hand", 2, Vec3::new(0.0, 0.0, 1.0), Quat::IDENTITY)],
        }
    }

    #[test]
    fn test_chain_composes_from_root() {
        let skeleton = three_bone_chain();
        let pose = BindPose::from_skeleton(&skeleton).unwrap();
        let l = |i: usize| node_transform(skeleton.node(i).unwrap());
        assert!(approx_mat(pose.object[2], l(0) * l(1) * l(2)));
        assert!(approx_mat(pose.object[3], l(0) * l(1) * l(2) * l(3)));
        assert!(approx_mat(pose.object[2] * pose.inverse_bind[2], Mat4::IDENTITY));
    }

    #[test]
    fn test_root_anywhere_in_list() {
        let mut skeleton = three_bone_chain();
        skeleton.bones[2].parent = 2;
        let pose = BindPose::from_skeleton(&skeleton).unwrap();
        assert!(pose.is_root(2));
        assert!(approx_mat(pose.object[2], node_transform(&skeleton.bones[2])));
    }

    #[test]
    fn test_child_listed_before_parent() {
        let parents = [1, 2, 2];
        let locals = [
            Mat4::from_translation(Vec3::X),
            Mat4::from_translation(Vec3::Y),
            Mat4::from_translation(Vec3::Z),
        ];
        let object = resolve_hierarchy(&parents, &locals).unwrap();
        assert!(approx_mat(object[0], Mat4::from_translation(Vec3::ONE)));
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut skeleton = three_bone_chain();
        skeleton.bones[1].parent = 2;
        let err = BindPose::from_skeleton(&skeleton).unwrap_err();
        assert!(matches!(
            err,
            AssetError::CyclicHierarchy { node: 1, parent: 2 }
        ));
    }

    #[test]
    fn test_sample_rejects_foreign_bind_pose() {
        let skeleton = three_bone_chain();
        let bind = BindPose::from_skeleton(&skeleton).unwrap();
        let mut smaller = skeleton.clone();
        smaller.dummies.clear();
        let animation = AnimationDocument {
            fps: 10,
            frame_count: 1,
            channels: Vec::new(),
            footer: None,
        };
        let err = Pose::sample(&bind, &smaller, &animation, 0.0).unwrap_err();
        assert!(matches!(err, AssetError::InvalidReference { .. }));
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_sampled_pose_overrides_rest_values() {
        let skeleton = three_bone_chain();
        let bind = BindPose::from_skeleton(&skeleton).unwrap();
        let animation = AnimationDocument {
            fps: 10,
            frame_count: 2,
            channels: vec![Channel {
                kind: ChannelKind::Position,
                bone: 1,
                values: ChannelValues::Vec3(vec![Vec3::new(4.0, 0.0, 0.0); 2]),
            }],
            footer: None,
        };
        let pose = Pose::sample(&bind, &skeleton, &animation, 0.0).unwrap();
        let expected = local_transform(skeleton.bones[1].rotation, Vec3::new(4.0, 0.0, 0.0));
        assert!(approx_mat(pose.local[1], expected));
        assert!(approx_mat(pose.local[0], bind.local[0]));
        assert!(approx_mat(pose.object[2], pose.object[1] * bind.local[2]));
    }

    #[test]
    fn test_rest_pose_palette_is_identity() {
        let skeleton = three_bone_chain();
        let bind = BindPose::from_skeleton(&skeleton).unwrap();
        for m in Pose::bind(&bind).skinning_matrices(&bind) {
            assert!(approx_mat(m, Mat4::IDENTITY));
        }
        let palette = Pose::bind(&bind).palette(&bind);
        assert_eq!(palette.len(), 4);
    }

    #[test]
    fn test_converted_joints_follow_convention() {
        let skeleton = three_bone_chain();
        let bind = BindPose::from_skeleton(&skeleton).unwrap();
        let convention = CoordinateConvention::Y_UP_METERS;
        let converted = bind.converted(&convention);
        for (a, b) in bind.joint_positions().iter().zip(converted.joint_positions()) {
            assert!((convention.position(*a) - b).length() < 1e-5);
        }
    }
}
