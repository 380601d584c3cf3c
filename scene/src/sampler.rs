//! Animation channel sampling
//!
//! Time is wrapped into one loop of the animation, split into a frame pair
//! and a blend fraction, and each channel interpolates between its two
//! stored values. The last frame blends back into frame 0.

use glam::{Quat, Vec2, Vec3, Vec4};
use rose_formats::{AnimationDocument, Channel, ChannelKind, ChannelValues};
use serde::Serialize;

/// Above this dot product two rotations are blended linearly.
const SLERP_LINEAR_THRESHOLD: f32 = 0.9995;

/// Position within one loop of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameCursor {
    pub frame: usize,
    /// `(frame + 1) % frame_count`
    pub next_frame: usize,
    /// Blend weight toward `next_frame`, in `0..=1`
    pub fraction: f32,
}

impl FrameCursor {
    /// `None` when there are no frames or the frame rate is zero.
    pub fn new(fps: u32, frame_count: u32, time: f64) -> Option<Self> {
        if fps == 0 || frame_count == 0 {
            return None;
        }
        let frames = frame_count as usize;
        // Wrapping in frame units keeps `t` and `t + duration` identical
        // whenever both products are exact.
        let position = (time * f64::from(fps)).rem_euclid(f64::from(frame_count));
        let frame = (position.floor() as usize).min(frames - 1);
        let fraction = ((position - frame as f64) as f32).clamp(0.0, 1.0);
        Some(Self {
            frame,
            next_frame: (frame + 1) % frames,
            fraction,
        })
    }
}

/// One interpolated channel value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SampledValue {
    Vec3(Vec3),
    Quat(Quat),
    Vec2(Vec2),
    Scalar(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSample {
    pub bone: u32,
    pub kind: ChannelKind,
    pub value: SampledValue,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Shortest-arc spherical interpolation. `t <= 0` and `t >= 1` return the
/// stored endpoints unchanged.
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }

    let mut dot = a.dot(b);
    let mut b = b;
    if dot < 0.0 {
        b = -b;
        dot = -dot;
    }

    if dot > SLERP_LINEAR_THRESHOLD {
        let blended = Vec4::from(a).lerp(Vec4::from(b), t).normalize();
        return Quat::from_vec4(blended);
    }

    let theta = dot.acos();
    let sin_theta = theta.sin();
    let s0 = ((1.0 - t) * theta).sin() / sin_theta;
    let s1 = (t * theta).sin() / sin_theta;
    a * s0 + b * s1
}

/// Blends the values stored at the cursor's frame pair. `None` for empty
/// channels or frames missing from the value list.
pub fn sample_channel(channel: &Channel, cursor: FrameCursor) -> Option<SampledValue> {
    let (i, j, t) = (cursor.frame, cursor.next_frame, cursor.fraction);
    Some(match &channel.values {
        ChannelValues::Empty => return None,
        ChannelValues::Vec3(v) => SampledValue::Vec3(v.get(i)?.lerp(*v.get(j)?, t)),
        ChannelValues::Quat(v) => SampledValue::Quat(slerp(*v.get(i)?, *v.get(j)?, t)),
        ChannelValues::Vec2(v) => SampledValue::Vec2(v.get(i)?.lerp(*v.get(j)?, t)),
        ChannelValues::Scalar(v) => SampledValue::Scalar(lerp(*v.get(i)?, *v.get(j)?, t)),
    })
}

/// Stateless sampler over one animation.
#[derive(Debug, Clone, Copy)]
pub struct AnimationSampler<'a> {
    animation: &'a AnimationDocument,
}

impl<'a> AnimationSampler<'a> {
    pub fn new(animation: &'a AnimationDocument) -> Self {
        Self { animation }
    }

    pub fn animation(&self) -> &'a AnimationDocument {
        self.animation
    }

    pub fn cursor(&self, time: f64) -> Option<FrameCursor> {
        FrameCursor::new(self.animation.fps, self.animation.frame_count, time)
    }

    /// Value of the `kind` channel bound to `bone` at `time` seconds.
    pub fn sample(&self, bone: u32, kind: ChannelKind, time: f64) -> Option<SampledValue> {
        let channel = self.animation.channel(bone, kind)?;
        sample_channel(channel, self.cursor(time)?)
    }

    pub fn position(&self, bone: u32, time: f64) -> Option<Vec3> {
        match self.sample(bone, ChannelKind::Position, time)? {
            SampledValue::Vec3(v) => Some(v),
            _ => None,
        }
    }

    pub fn rotation(&self, bone: u32, time: f64) -> Option<Quat> {
        match self.sample(bone, ChannelKind::Rotation, time)? {
            SampledValue::Quat(q) => Some(q),
            _ => None,
        }
    }

    pub fn scale(&self, bone: u32, time: f64) -> Option<f32> {
        match self.sample(bone, ChannelKind::Scale, time)? {
            SampledValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Every non-empty channel at `time`, in channel order.
    pub fn sample_all(&self, time: f64) -> Vec<ChannelSample> {
        let Some(cursor) = self.cursor(time) else {
            return Vec::new();
        };
        self.animation
            .channels
            .iter()
            .filter_map(|channel| {
                Some(ChannelSample {
                    bone: channel.bone,
                    kind: channel.kind,
                    value: sample_channel(channel, cursor)?,
                })
            })
            .collect()
    }

    /// Positions in the event list whose stored frame index equals `frame`.
    pub fn events_at(&self, frame: usize) -> impl Iterator<Item = usize> + 'a {
        self.animation
            .events()
            .iter()
            .enumerate()
            .filter(move |&(_, &event_frame)| event_frame as usize == frame)
            .map(|(index, _)| index)
    }

    /// Events on the frame that `time` falls in.
    pub fn events_at_time(&self, time: f64) -> Vec<usize> {
        self.cursor(time)
            .map(|cursor| self.events_at(cursor.frame).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rose_formats::animation::AnimationFooter;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    fn two_frame_walk() -> AnimationDocument {
        AnimationDocument {
            fps: 30,
            frame_count: 2,
            channels: vec![
                Channel {
                    kind: ChannelKind::Position,
                    bone: 0,
                    values: ChannelValues::Vec3(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]),
                },
                Channel {
                    kind: ChannelKind::Rotation,
                    bone: 0,
                    values: ChannelValues::Quat(vec![
                        Quat::IDENTITY,
                        Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
                    ]),
                },
                Channel {
                    kind: ChannelKind::Empty,
                    bone: 3,
                    values: ChannelValues::Empty,
                },
            ],
            footer: Some(AnimationFooter {
                events: vec![1, 0, 1],
                interpolation_interval_ms: None,
            }),
        }
    }

    #[test]
    fn test_half_frame_position() {
        let anim = two_frame_walk();
        let sampler = AnimationSampler::new(&anim);
        let p = sampler.position(0, 1.0 / 60.0).unwrap();
        assert!(approx(p, Vec3::new(5.0, 0.0, 0.0)), "got {p:?}");
    }

    #[test]
    fn test_cursor_wraps_last_frame_to_first() {
        let cursor = FrameCursor::new(30, 2, 0.05).unwrap();
        assert_eq!(cursor.frame, 1);
        assert_eq!(cursor.next_frame, 0);
        assert!((cursor.fraction - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_loop_invariant() {
        let mut anim = two_frame_walk();
        anim.fps = 4;
        anim.frame_count = 3;
        for channel in &mut anim.channels {
            channel.values = match &channel.values {
                ChannelValues::Vec3(v) => ChannelValues::Vec3(vec![v[0], v[1], Vec3::ONE]),
                ChannelValues::Quat(v) => ChannelValues::Quat(vec![v[0], v[1], v[0]]),
                other => other.clone(),
            };
        }
        let sampler = AnimationSampler::new(&anim);
        let duration = anim.duration_secs();
        assert_eq!(duration, 0.75);
        for t in [0.0, 0.125, 0.3125, 0.5, 0.6875] {
            assert_eq!(sampler.sample_all(t), sampler.sample_all(t + duration));
            assert_eq!(sampler.sample_all(t), sampler.sample_all(t - duration));
        }
    }

    #[test]
    fn test_slerp_endpoints_are_exact() {
        let a = Quat::from_rotation_x(0.3);
        let b = -Quat::from_rotation_y(1.2);
        assert_eq!(slerp(a, b, 0.0), a);
        assert_eq!(slerp(a, b, 1.0), b);
    }

    #[test]
    fn test_slerp_takes_short_arc() {
        let a = Quat::IDENTITY;
        let b = -Quat::from_rotation_z(0.5);
        let mid = slerp(a, b, 0.5);
        assert!(mid.angle_between(Quat::from_rotation_z(0.25)) < 1e-4);
    }

    #[test]
    fn test_slerp_nearly_equal_falls_back_to_lerp() {
        let a = Quat::from_rotation_z(0.1);
        let b = Quat::from_rotation_z(0.1001);
        let mid = slerp(a, b, 0.5);
        assert!((mid.length() - 1.0).abs() < 1e-6);
        assert!(mid.angle_between(Quat::from_rotation_z(0.10005)) < 1e-4);
    }

    #[test]
    fn test_missing_channel_yields_none() {
        let anim = two_frame_walk();
        let sampler = AnimationSampler::new(&anim);
        assert!(sampler.position(7, 0.0).is_none());
        assert!(sampler.sample(3, ChannelKind::Empty, 0.0).is_none());
        assert_eq!(sampler.sample_all(0.0).len(), 2);
    }

    #[test]
    fn test_zero_fps_samples_nothing() {
        let mut anim = two_frame_walk();
        anim.fps = 0;
        let sampler = AnimationSampler::new(&anim);
        assert!(sampler.cursor(0.0).is_none());
        assert!(sampler.sample_all(0.0).is_empty());
    }

    #[test]
    fn test_events_at_frame() {
        let anim = two_frame_walk();
        let sampler = AnimationSampler::new(&anim);
        assert_eq!(sampler.events_at(1).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(sampler.events_at(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(sampler.events_at(5).count(), 0);
        assert_eq!(sampler.events_at_time(0.04), vec![0, 2]);
    }
}
