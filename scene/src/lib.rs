//! Scene-level computations over parsed ROSE documents
//!
//! - [`pose`]: bind-pose resolution of a skeleton hierarchy and animated poses
//! - [`skinning`]: mesh bone-slot binding and linear blend skinning
//! - [`sampler`]: looping frame sampling of animation channels
//! - [`terrain`]: heightmap interpolation and tile texture resolution
//! - [`map`]: multi-block terrain with seam bridging
//! - [`instancing`]: zone placements resolved to per-part world transforms
//!
//! Every operation is a pure function of its input documents. Results stay
//! in the source convention until passed through
//! [`CoordinateConvention`](rose_shared::CoordinateConvention).

pub mod instancing;
pub mod map;
pub mod pose;
pub mod sampler;
pub mod skinning;
pub mod terrain;

pub use instancing::{ObjectInstance, PartInstance, instantiate};
pub use map::{TerrainMap, TerrainMapMesh};
pub use pose::{BindPose, Pose};
pub use sampler::{AnimationSampler, FrameCursor, SampledValue};
pub use skinning::{BoneBinding, SkinnedMesh};
pub use terrain::{TerrainCompositor, TerrainMesh, TileTextures};
