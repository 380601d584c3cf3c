//! JSON reports built from scene evaluation, in a target convention

use anyhow::Result;
use glam::{Mat4, Vec3};
use rose_formats::{AnimationDocument, ChannelKind, HeightmapDocument, SkeletonDocument};
use rose_scene::sampler::ChannelSample;
use rose_scene::terrain::sample_height;
use rose_scene::{AnimationSampler, BindPose, FrameCursor, SampledValue};
use rose_shared::CoordinateConvention;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointReport {
    pub index: usize,
    pub name: String,
    pub parent: Option<u32>,
    /// Object-space joint origin
    pub position: Vec3,
    pub object: Mat4,
    pub inverse_bind: Mat4,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindPoseReport {
    pub convention: CoordinateConvention,
    pub joints: Vec<JointReport>,
}

impl BindPoseReport {
    pub fn new(skeleton: &SkeletonDocument, convention: CoordinateConvention) -> Result<Self> {
        let bind = BindPose::from_skeleton(skeleton)?.converted(&convention);
        let positions = bind.joint_positions();
        let joints = skeleton
            .nodes()
            .enumerate()
            .map(|(index, node)| JointReport {
                index,
                name: node.name.clone(),
                parent: (!bind.is_root(index)).then_some(node.parent),
                position: positions[index],
                object: bind.object[index],
                inverse_bind: bind.inverse_bind[index],
            })
            .collect();
        Ok(Self { convention, joints })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub time: f64,
    pub cursor: Option<FrameCursor>,
    pub channels: Vec<ChannelSample>,
    /// Indices into the event list that fire on the sampled frame
    pub events: Vec<usize>,
}

fn convert_sample(sample: ChannelSample, convention: &CoordinateConvention) -> ChannelSample {
    let value = match (sample.kind, sample.value) {
        (ChannelKind::Position, SampledValue::Vec3(p)) => {
            SampledValue::Vec3(convention.position(p))
        }
        (ChannelKind::Normal, SampledValue::Vec3(n)) => SampledValue::Vec3(convention.normal(n)),
        (ChannelKind::Rotation, SampledValue::Quat(q)) => {
            SampledValue::Quat(convention.rotation(q))
        }
        (_, value) => value,
    };
    ChannelSample { value, ..sample }
}

impl SampleReport {
    pub fn new(
        animation: &AnimationDocument,
        time: f64,
        convention: &CoordinateConvention,
    ) -> Self {
        let sampler = AnimationSampler::new(animation);
        let channels = sampler
            .sample_all(time)
            .into_iter()
            .map(|sample| convert_sample(sample, convention))
            .collect();
        Self {
            time,
            cursor: sampler.cursor(time),
            channels,
            events: sampler.events_at_time(time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightReport {
    /// Grid coordinates as queried
    pub x: f32,
    pub y: f32,
    /// Interpolated height in source units
    pub height: f32,
    /// The grid point `(x, y, height)` in the target convention
    pub position: Vec3,
}

impl HeightReport {
    pub fn new(
        heightmap: &HeightmapDocument,
        x: f32,
        y: f32,
        convention: &CoordinateConvention,
    ) -> Self {
        let height = sample_height(heightmap, x, y);
        Self {
            x,
            y,
            height,
            position: convention.position(Vec3::new(x, y, height)),
        }
    }
}
