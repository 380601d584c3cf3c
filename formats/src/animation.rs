//! ZMO animation format (.zmo)
//!
//! ```text
//! 0x00: tag [u8; 8]          "ZMO0002", NUL padded
//! 0x08: fps u32
//! 0x0C: frame_count u32
//! 0x10: channel_count u32
//! 0x14: channel_count × (kind u32, bone u32)
//!       per channel: frame_count values, channel after channel
//! ```
//!
//! Optional footer, detected from the end of the buffer:
//!
//! ```text
//! footer:   event_count u16, event_count × u16 frame, [interval_ms u32 for "3ZMO"]
//! len - 8:  footer offset u32
//! len - 4:  "EZMO" | "3ZMO"
//! ```

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec2, Vec3};
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader, WriteAssetExt};
use serde::Serialize;
use std::io::{self, Write};

use crate::serialization::{BinaryDocument, BinaryEncode};

const TAG: &[u8; 8] = b"ZMO0002\0";
const FOOTER_EVENTS: &[u8; 4] = b"EZMO";
const FOOTER_EVENTS_INTERVAL: &[u8; 4] = b"3ZMO";

/// Interpolation interval used when the file does not carry one.
pub const DEFAULT_INTERPOLATION_INTERVAL_MS: u32 = 500;

/// What a channel animates. Each kind is a single bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum ChannelKind {
    Empty = 1,
    Position = 2,
    Rotation = 4,
    Normal = 8,
    Alpha = 16,
    Uv1 = 32,
    Uv2 = 64,
    Uv3 = 128,
    Uv4 = 256,
    Texture = 512,
    Scale = 1024,
}

impl ChannelKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Empty,
            2 => Self::Position,
            4 => Self::Rotation,
            8 => Self::Normal,
            16 => Self::Alpha,
            32 => Self::Uv1,
            64 => Self::Uv2,
            128 => Self::Uv3,
            256 => Self::Uv4,
            512 => Self::Texture,
            1024 => Self::Scale,
            _ => return None,
        })
    }

    /// Encoded size of one frame value.
    pub const fn value_size(self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Position | Self::Normal => 12,
            Self::Rotation => 16,
            Self::Uv1 | Self::Uv2 | Self::Uv3 | Self::Uv4 => 8,
            Self::Alpha | Self::Texture | Self::Scale => 4,
        }
    }
}

/// Per-frame values of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelValues {
    /// Empty channels carry no data
    Empty,
    Vec3(Vec<Vec3>),
    Quat(Vec<Quat>),
    Vec2(Vec<Vec2>),
    Scalar(Vec<f32>),
}

impl ChannelValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Vec3(v) => v.len(),
            Self::Quat(v) => v.len(),
            Self::Vec2(v) => v.len(),
            Self::Scalar(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub kind: ChannelKind,
    /// Skeleton node (or morph target) index the channel drives
    pub bone: u32,
    pub values: ChannelValues,
}

/// Trailing event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimationFooter {
    pub events: Vec<u16>,
    /// Present only in the "3ZMO" variant
    pub interpolation_interval_ms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationDocument {
    pub fps: u32,
    pub frame_count: u32,
    pub channels: Vec<Channel>,
    pub footer: Option<AnimationFooter>,
}

/// Event ids that mark attack hit frames.
pub fn is_attack_event(event: u16) -> bool {
    matches!(event, 10 | 20..=28 | 56 | 57 | 66 | 67)
}

impl AnimationDocument {
    /// Length of one loop in seconds; zero when fps is zero.
    pub fn duration_secs(&self) -> f64 {
        if self.fps == 0 {
            0.0
        } else {
            f64::from(self.frame_count) / f64::from(self.fps)
        }
    }

    pub fn events(&self) -> &[u16] {
        match &self.footer {
            Some(footer) => &footer.events,
            None => &[],
        }
    }

    pub fn interpolation_interval_ms(&self) -> u32 {
        self.footer
            .as_ref()
            .and_then(|f| f.interpolation_interval_ms)
            .unwrap_or(DEFAULT_INTERPOLATION_INTERVAL_MS)
    }

    pub fn attack_frame_count(&self) -> usize {
        self.events().iter().filter(|&&e| is_attack_event(e)).count()
    }

    /// First channel of `kind` bound to `bone`.
    pub fn channel(&self, bone: u32, kind: ChannelKind) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|c| c.bone == bone && c.kind == kind)
    }
}

fn read_values(
    reader: &mut ByteReader<'_>,
    kind: ChannelKind,
    frames: usize,
) -> AssetResult<ChannelValues> {
    reader.ensure_available("channel values", frames, kind.value_size())?;
    let values = match kind {
        ChannelKind::Empty => ChannelValues::Empty,
        ChannelKind::Position | ChannelKind::Normal => ChannelValues::Vec3(
            (0..frames)
                .map(|_| reader.read_vec3())
                .collect::<AssetResult<_>>()?,
        ),
        ChannelKind::Rotation => ChannelValues::Quat(
            (0..frames)
                .map(|_| reader.read_quat_wxyz())
                .collect::<AssetResult<_>>()?,
        ),
        ChannelKind::Uv1 | ChannelKind::Uv2 | ChannelKind::Uv3 | ChannelKind::Uv4 => {
            ChannelValues::Vec2(
                (0..frames)
                    .map(|_| reader.read_vec2())
                    .collect::<AssetResult<_>>()?,
            )
        }
        ChannelKind::Alpha | ChannelKind::Texture | ChannelKind::Scale => ChannelValues::Scalar(
            (0..frames)
                .map(|_| reader.read_f32())
                .collect::<AssetResult<_>>()?,
        ),
    };
    Ok(values)
}

fn read_footer(reader: &mut ByteReader<'_>) -> AssetResult<Option<AnimationFooter>> {
    let len = reader.len();
    if len < 8 {
        return Ok(None);
    }

    let resume = reader.position();
    reader.seek(len - 4)?;
    let magic = reader.read_bytes(4)?;
    let has_interval = if magic == FOOTER_EVENTS {
        false
    } else if magic == FOOTER_EVENTS_INTERVAL {
        true
    } else {
        reader.seek(resume)?;
        return Ok(None);
    };

    reader.seek(len - 8)?;
    let footer_offset = reader.read_u32()? as usize;
    if footer_offset > len - 8 {
        return Err(AssetError::malformed(
            len - 8,
            format!("footer offset {footer_offset} points past the footer trailer"),
        ));
    }

    reader.seek(footer_offset)?;
    let event_count = reader.read_u16()? as usize;
    reader.ensure_available("frame events", event_count, 2)?;
    let events = (0..event_count)
        .map(|_| reader.read_u16())
        .collect::<AssetResult<Vec<_>>>()?;
    let interpolation_interval_ms = if has_interval {
        Some(reader.read_u32()?)
    } else {
        None
    };

    tracing::debug!(
        offset = footer_offset,
        events = events.len(),
        interval = ?interpolation_interval_ms,
        "read animation footer"
    );

    Ok(Some(AnimationFooter {
        events,
        interpolation_interval_ms,
    }))
}

impl BinaryDocument for AnimationDocument {
    const FORMAT: AssetFormat = AssetFormat::Animation;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let tag = reader.read_fixed_string(TAG.len())?;
        if tag.as_bytes() != &TAG[..7] {
            return Err(AssetError::UnsupportedVersion { tag });
        }

        let fps = reader.read_u32()?;
        let frame_count = reader.read_u32()?;
        let channel_count = reader.read_u32()? as usize;
        reader.ensure_available("channel headers", channel_count, 8)?;

        let mut headers = Vec::with_capacity(channel_count);
        for _ in 0..channel_count {
            let kind_offset = reader.offset();
            let raw_kind = reader.read_u32()?;
            let bone = reader.read_u32()?;
            let kind = ChannelKind::from_u32(raw_kind).ok_or_else(|| {
                AssetError::malformed(kind_offset, format!("unknown channel kind {raw_kind}"))
            })?;
            headers.push((kind, bone));
        }

        let frames = frame_count as usize;
        let mut channels = Vec::with_capacity(channel_count);
        for (kind, bone) in headers {
            let values = read_values(reader, kind, frames)?;
            channels.push(Channel { kind, bone, values });
        }

        let footer = read_footer(reader)?;

        tracing::debug!(
            fps,
            frames = frame_count,
            channels = channels.len(),
            "parsed animation"
        );

        Ok(AnimationDocument {
            fps,
            frame_count,
            channels,
            footer,
        })
    }
}

impl BinaryEncode for AnimationDocument {
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let frames = self.frame_count as usize;
        for channel in &self.channels {
            let expected = if channel.kind == ChannelKind::Empty { 0 } else { frames };
            let matches_kind = matches!(
                (channel.kind, &channel.values),
                (ChannelKind::Empty, ChannelValues::Empty)
                    | (ChannelKind::Position | ChannelKind::Normal, ChannelValues::Vec3(_))
                    | (ChannelKind::Rotation, ChannelValues::Quat(_))
                    | (
                        ChannelKind::Uv1 | ChannelKind::Uv2 | ChannelKind::Uv3 | ChannelKind::Uv4,
                        ChannelValues::Vec2(_)
                    )
                    | (
                        ChannelKind::Alpha | ChannelKind::Texture | ChannelKind::Scale,
                        ChannelValues::Scalar(_)
                    )
            );
            if !matches_kind || channel.values.len() != expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "{:?} channel for bone {} holds {} values, expected {expected}",
                        channel.kind,
                        channel.bone,
                        channel.values.len()
                    ),
                ));
            }
        }

        // Track the byte count so the footer offset can be written.
        let mut body = Vec::new();
        body.write_all(TAG)?;
        body.write_u32::<LittleEndian>(self.fps)?;
        body.write_u32::<LittleEndian>(self.frame_count)?;
        body.write_u32::<LittleEndian>(self.channels.len() as u32)?;
        for channel in &self.channels {
            body.write_u32::<LittleEndian>(channel.kind as u32)?;
            body.write_u32::<LittleEndian>(channel.bone)?;
        }
        for channel in &self.channels {
            match &channel.values {
                ChannelValues::Empty => {}
                ChannelValues::Vec3(values) => {
                    for &v in values {
                        body.write_vec3(v)?;
                    }
                }
                ChannelValues::Quat(values) => {
                    for &q in values {
                        body.write_quat_wxyz(q)?;
                    }
                }
                ChannelValues::Vec2(values) => {
                    for &v in values {
                        body.write_vec2(v)?;
                    }
                }
                ChannelValues::Scalar(values) => {
                    for &v in values {
                        body.write_f32::<LittleEndian>(v)?;
                    }
                }
            }
        }

        if let Some(footer) = &self.footer {
            let offset = body.len() as u32;
            let count = u16::try_from(footer.events.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "too many frame events")
            })?;
            body.write_u16::<LittleEndian>(count)?;
            for &event in &footer.events {
                body.write_u16::<LittleEndian>(event)?;
            }
            let magic = match footer.interpolation_interval_ms {
                Some(interval) => {
                    body.write_u32::<LittleEndian>(interval)?;
                    FOOTER_EVENTS_INTERVAL
                }
                None => FOOTER_EVENTS,
            };
            body.write_u32::<LittleEndian>(offset)?;
            body.write_all(magic)?;
        }

        w.write_all(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(footer: Option<AnimationFooter>) -> AnimationDocument {
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
                    bone: 1,
                    values: ChannelValues::Quat(vec![Quat::IDENTITY, Quat::from_rotation_y(1.0)]),
                },
                Channel {
                    kind: ChannelKind::Empty,
                    bone: 2,
                    values: ChannelValues::Empty,
                },
                Channel {
                    kind: ChannelKind::Alpha,
                    bone: 3,
                    values: ChannelValues::Scalar(vec![1.0, 0.25]),
                },
            ],
            footer,
        }
    }

    #[test]
    fn test_channel_blocks_are_contiguous() {
        let doc = walk(None);
        let bytes = doc.to_bytes().unwrap();
        // Header 8 + 12 + 4 channels × 8 = 52; position block follows
        let second_frame_x = f32::from_le_bytes(bytes[52 + 12..52 + 16].try_into().unwrap());
        assert_eq!(second_frame_x, 10.0);
        assert_eq!(AnimationDocument::parse(&bytes).unwrap(), doc);
    }

    #[test]
    fn test_no_footer_defaults() {
        let doc = AnimationDocument::parse(&walk(None).to_bytes().unwrap()).unwrap();
        assert!(doc.events().is_empty());
        assert_eq!(doc.interpolation_interval_ms(), DEFAULT_INTERPOLATION_INTERVAL_MS);
        assert_eq!(doc.duration_secs(), 2.0 / 30.0);
    }

    #[test]
    fn test_event_footer() {
        let footer = AnimationFooter {
            events: vec![0, 21, 0, 66],
            interpolation_interval_ms: None,
        };
        let bytes = walk(Some(footer.clone())).to_bytes().unwrap();
        assert_eq!(&bytes[bytes.len() - 4..], b"EZMO");
        let doc = AnimationDocument::parse(&bytes).unwrap();
        assert_eq!(doc.footer, Some(footer));
        assert_eq!(doc.attack_frame_count(), 2);
        assert_eq!(doc.interpolation_interval_ms(), 500);
    }

    #[test]
    fn test_interval_footer_roundtrip() {
        let doc = walk(Some(AnimationFooter {
            events: vec![10],
            interpolation_interval_ms: Some(250),
        }));
        let bytes = doc.to_bytes().unwrap();
        assert_eq!(&bytes[bytes.len() - 4..], b"3ZMO");
        let parsed = AnimationDocument::parse(&bytes).unwrap();
        assert_eq!(parsed.interpolation_interval_ms(), 250);
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_unknown_channel_kind() {
        let mut bytes = walk(None).to_bytes().unwrap();
        bytes[20..24].copy_from_slice(&3u32.to_le_bytes());
        let err = AnimationDocument::parse(&bytes).unwrap_err();
        assert!(matches!(
            err.source,
            AssetError::MalformedStructure { offset: 20, .. }
        ));
    }

    #[test]
    fn test_truncated_values() {
        let bytes = walk(None).to_bytes().unwrap();
        let err = AnimationDocument::parse(&bytes[..60]).unwrap_err();
        assert!(matches!(
            err.source,
            AssetError::TruncatedData {
                what: "channel values",
                ..
            }
        ));
    }

    #[test]
    fn test_bad_footer_offset() {
        let mut bytes = walk(None).to_bytes().unwrap();
        bytes.extend_from_slice(&9999u32.to_le_bytes());
        bytes.extend_from_slice(b"EZMO");
        let err = AnimationDocument::parse(&bytes).unwrap_err();
        assert!(matches!(err.source, AssetError::MalformedStructure { .. }));
    }

    #[test]
    fn test_attack_events() {
        assert!(is_attack_event(10));
        assert!(is_attack_event(24));
        assert!(is_attack_event(57));
        assert!(!is_attack_event(11));
        assert!(!is_attack_event(68));
    }

    #[test]
    fn test_rejects_mismatched_values() {
        let mut doc = walk(None);
        doc.frame_count = 3;
        assert!(doc.to_bytes().is_err());
    }
}
