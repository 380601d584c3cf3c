//! Little-endian write helpers used by the encoders

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec2, Vec3, Vec4};
use std::io::{self, Write};

/// Vector, quaternion and string writers layered over [`WriteBytesExt`].
///
/// The quaternion writers mirror the two field orders of
/// [`ByteReader`](crate::ByteReader).
pub trait WriteAssetExt: Write {
    fn write_vec2(&mut self, v: Vec2) -> io::Result<()> {
        self.write_f32::<LittleEndian>(v.x)?;
        self.write_f32::<LittleEndian>(v.y)
    }

    fn write_vec3(&mut self, v: Vec3) -> io::Result<()> {
        self.write_f32::<LittleEndian>(v.x)?;
        self.write_f32::<LittleEndian>(v.y)?;
        self.write_f32::<LittleEndian>(v.z)
    }

    fn write_vec4(&mut self, v: Vec4) -> io::Result<()> {
        self.write_f32::<LittleEndian>(v.x)?;
        self.write_f32::<LittleEndian>(v.y)?;
        self.write_f32::<LittleEndian>(v.z)?;
        self.write_f32::<LittleEndian>(v.w)
    }

    fn write_quat_xyzw(&mut self, q: Quat) -> io::Result<()> {
        self.write_vec4(Vec4::new(q.x, q.y, q.z, q.w))
    }

    fn write_quat_wxyz(&mut self, q: Quat) -> io::Result<()> {
        self.write_vec4(Vec4::new(q.w, q.x, q.y, q.z))
    }

    fn write_cstring(&mut self, s: &str) -> io::Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "string contains an interior NUL byte",
            ));
        }
        self.write_all(s.as_bytes())?;
        self.write_u8(0)
    }

    fn write_u8_prefixed_string(&mut self, s: &str) -> io::Result<()> {
        let len = u8::try_from(s.len()).map_err(|_| too_long(s.len()))?;
        self.write_u8(len)?;
        self.write_all(s.as_bytes())
    }

    fn write_u16_prefixed_string(&mut self, s: &str) -> io::Result<()> {
        let len = u16::try_from(s.len()).map_err(|_| too_long(s.len()))?;
        self.write_u16::<LittleEndian>(len)?;
        self.write_all(s.as_bytes())
    }
}

impl<W: Write + ?Sized> WriteAssetExt for W {}

fn too_long(len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("string of {len} bytes does not fit its length prefix"),
    )
}
