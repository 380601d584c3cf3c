//! Skinning palette entries
//!
//! A pose's skinning matrices are affine, so the bottom row is dropped and
//! each bone ships as three rows of four floats.

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Row-major 3x4 affine matrix, 48 bytes.
///
/// Row `i` holds `[m_i0, m_i1, m_i2, t_i]`. The implicit fourth row is
/// `[0, 0, 0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct BoneMatrix3x4 {
    pub rows: [[f32; 4]; 3],
}

impl Default for BoneMatrix3x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneMatrix3x4 {
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };

    /// Drops the bottom row of `m`.
    pub fn from_mat4(m: Mat4) -> Self {
        Self {
            rows: [m.row(0).to_array(), m.row(1).to_array(), m.row(2).to_array()],
        }
    }

    pub fn to_mat4(&self) -> Mat4 {
        let [r0, r1, r2] = self.rows;
        Mat4::from_cols(
            Vec4::new(r0[0], r1[0], r2[0], 0.0),
            Vec4::new(r0[1], r1[1], r2[1], 0.0),
            Vec4::new(r0[2], r1[2], r2[2], 0.0),
            Vec4::new(r0[3], r1[3], r2[3], 1.0),
        )
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.rows[0][3], self.rows[1][3], self.rows[2][3])
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let row = |r: [f32; 4]| r[0] * p.x + r[1] * p.y + r[2] * p.z + r[3];
        Vec3::new(row(self.rows[0]), row(self.rows[1]), row(self.rows[2]))
    }

    /// Row-major floats, the layout hosts upload.
    pub fn to_array(&self) -> [f32; 12] {
        let mut out = [0.0; 12];
        for (chunk, row) in out.chunks_exact_mut(4).zip(&self.rows) {
            chunk.copy_from_slice(row);
        }
        out
    }
}

/// Writes a palette as consecutive little-endian 48-byte matrices.
pub fn write_palette<W: Write>(w: &mut W, palette: &[BoneMatrix3x4]) -> io::Result<()> {
    for matrix in palette {
        for value in matrix.to_array() {
            w.write_f32::<LittleEndian>(value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_default_is_identity() {
        assert_eq!(BoneMatrix3x4::default().to_mat4(), Mat4::IDENTITY);
        assert_eq!(BoneMatrix3x4::from_mat4(Mat4::IDENTITY), BoneMatrix3x4::IDENTITY);
    }

    #[test]
    fn test_translation_lands_in_last_column() {
        let b = BoneMatrix3x4::from_mat4(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(b.rows[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(b.rows[2], [0.0, 0.0, 1.0, 3.0]);
        assert_eq!(b.translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_matches_mat4() {
        let m = Mat4::from_rotation_translation(
            Quat::from_rotation_y(0.7),
            Vec3::new(-4.0, 0.5, 9.0),
        );
        let b = BoneMatrix3x4::from_mat4(m);
        let p = Vec3::new(1.0, -2.0, 3.0);
        assert!((b.transform_point(p) - m.transform_point3(p)).length() < 1e-5);
        assert!(b.to_mat4().abs_diff_eq(m, 1e-6));
    }

    #[test]
    fn test_palette_bytes() {
        let mut bytes = Vec::new();
        write_palette(&mut bytes, &[BoneMatrix3x4::IDENTITY; 2]).unwrap();
        assert_eq!(bytes.len(), 96);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0.0f32.to_le_bytes());
    }
}
