//! Linear blend skinning
//!
//! Mesh vertices reference bones through slots in the mesh's own bone table.
//! [`BoneBinding`] resolves those slots to skeleton nodes once, when the mesh
//! is paired with a skeleton, so a bad table is reported before any vertex is
//! touched.

use glam::{Mat4, Vec3, Vec4};
use rose_formats::MeshDocument;
use rose_shared::{AssetError, AssetResult};
use serde::Serialize;

use crate::pose::{BindPose, Pose};

/// Mesh bone slot to skeleton node mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoneBinding {
    nodes: Vec<usize>,
}

impl BoneBinding {
    /// Fails when a bone table entry names a node the skeleton lacks.
    pub fn new(mesh: &MeshDocument, node_count: usize) -> AssetResult<Self> {
        let nodes = mesh
            .bone_table
            .iter()
            .enumerate()
            .map(|(slot, &node)| {
                let node = node as usize;
                if node >= node_count {
                    return Err(AssetError::invalid_reference(
                        format!("bone slot {slot} maps to node {node}, skeleton has {node_count}"),
                    ));
                }
                Ok(node)
            })
            .collect::<AssetResult<Vec<_>>>()?;
        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, slot: u32) -> AssetResult<usize> {
        self.nodes.get(slot as usize).copied().ok_or_else(|| {
            AssetError::invalid_reference(
                format!("bone slot {slot} outside bone table of {}", self.nodes.len()),
            )
        })
    }
}

/// Weighted sum of `matrices[node] * point` over influences with a positive
/// weight. A vertex with no positive weight keeps its rest position.
fn blend(
    point: Vec3,
    weights: Vec4,
    slots: [u32; 4],
    binding: &BoneBinding,
    matrices: &[Mat4],
    apply: impl Fn(&Mat4, Vec3) -> Vec3,
) -> AssetResult<Vec3> {
    let mut result = Vec3::ZERO;
    let mut influenced = false;
    for (k, &slot) in slots.iter().enumerate() {
        let weight = weights[k];
        if weight <= 0.0 {
            continue;
        }
        let node = binding.node(slot)?;
        let matrix = matrices.get(node).ok_or_else(|| {
            AssetError::invalid_reference(
                format!("node {node} outside pose of {} nodes", matrices.len()),
            )
        })?;
        result += apply(matrix, point) * weight;
        influenced = true;
    }
    Ok(if influenced { result } else { point })
}

/// Skins one rest-pose position. `matrices` are the pose's skinning
/// matrices (current times inverse bind) indexed by node.
pub fn skin_vertex(
    position: Vec3,
    weights: Vec4,
    slots: [u32; 4],
    binding: &BoneBinding,
    matrices: &[Mat4],
) -> AssetResult<Vec3> {
    blend(position, weights, slots, binding, matrices, |m, p| {
        m.transform_point3(p)
    })
}

pub fn skin_normal(
    normal: Vec3,
    weights: Vec4,
    slots: [u32; 4],
    binding: &BoneBinding,
    matrices: &[Mat4],
) -> AssetResult<Vec3> {
    blend(normal, weights, slots, binding, matrices, |m, n| {
        m.transform_vector3(n)
    })
    .map(Vec3::normalize_or_zero)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinnedMesh {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
}

/// Deforms every vertex of `mesh` into `pose`. Meshes without bone data are
/// returned at rest.
pub fn skin_mesh(
    mesh: &MeshDocument,
    binding: &BoneBinding,
    bind: &BindPose,
    pose: &Pose,
) -> AssetResult<SkinnedMesh> {
    let rest_positions = mesh.positions.clone().unwrap_or_default();
    let (Some(weights), Some(slots)) = (&mesh.bone_weights, &mesh.bone_indices) else {
        return Ok(SkinnedMesh {
            positions: rest_positions,
            normals: mesh.normals.clone(),
        });
    };

    let matrices = pose.skinning_matrices(bind);
    let positions = rest_positions
        .iter()
        .zip(weights.iter().zip(slots))
        .map(|(&p, (&w, &s))| skin_vertex(p, w, s, binding, &matrices))
        .collect::<AssetResult<Vec<_>>>()?;
    let normals = mesh
        .normals
        .as_ref()
        .map(|normals| {
            normals
                .iter()
                .zip(weights.iter().zip(slots))
                .map(|(&n, (&w, &s))| skin_normal(n, w, s, binding, &matrices))
                .collect::<AssetResult<Vec<_>>>()
        })
        .transpose()?;

    Ok(SkinnedMesh { positions, normals })
}
