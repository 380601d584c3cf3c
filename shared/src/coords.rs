//! Coordinate convention conversion
//!
//! Documents keep the game's source values untouched. Consumers that need a
//! different convention build one [`CoordinateConvention`] and pass every
//! position, normal, rotation and matrix through it, so all call sites agree
//! on the same axis remap and scale.
//!
//! A convention is a signed axis permutation `M` plus a uniform divisor `d`:
//!
//! ```text
//! position' = M * p / d
//! normal'   = normalize(M * n)
//! rotation' = (det(M) * M * q.xyz, q.w)
//! matrix'   = D * T * D^-1        where D = M / d
//! ```

use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// One source axis with a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedAxis {
    #[serde(rename = "+x")]
    PosX,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "+y")]
    PosY,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "+z")]
    PosZ,
    #[serde(rename = "-z")]
    NegZ,
}

impl SignedAxis {
    fn index(self) -> usize {
        match self {
            Self::PosX | Self::NegX => 0,
            Self::PosY | Self::NegY => 1,
            Self::PosZ | Self::NegZ => 2,
        }
    }

    fn sign(self) -> f32 {
        match self {
            Self::PosX | Self::PosY | Self::PosZ => 1.0,
            Self::NegX | Self::NegY | Self::NegZ => -1.0,
        }
    }
}

/// Target convention: output component `i` takes source axis `axes[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConvention {
    pub axes: [SignedAxis; 3],
    pub scale_divisor: f32,
}

impl Default for CoordinateConvention {
    fn default() -> Self {
        Self::SOURCE
    }
}

impl CoordinateConvention {
    /// Game units, Z-up. Identity.
    pub const SOURCE: Self = Self {
        axes: [SignedAxis::PosX, SignedAxis::PosY, SignedAxis::PosZ],
        scale_divisor: 1.0,
    };

    /// Z-up, centimeters converted to meters.
    pub const Z_UP_METERS: Self = Self {
        axes: [SignedAxis::PosX, SignedAxis::PosY, SignedAxis::PosZ],
        scale_divisor: 100.0,
    };

    /// Y-up right-handed meters: (x, y, z) -> (x, z, -y).
    pub const Y_UP_METERS: Self = Self {
        axes: [SignedAxis::PosX, SignedAxis::PosZ, SignedAxis::NegY],
        scale_divisor: 100.0,
    };

    /// Looks up a preset by its config name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "source" => Some(Self::SOURCE),
            "z-up-meters" => Some(Self::Z_UP_METERS),
            "y-up-meters" => Some(Self::Y_UP_METERS),
            _ => None,
        }
    }

    /// True when every source axis is used exactly once and the divisor is
    /// usable.
    pub fn is_valid(&self) -> bool {
        let mut seen = [false; 3];
        for axis in self.axes {
            seen[axis.index()] = true;
        }
        seen.iter().all(|&s| s) && self.scale_divisor.is_finite() && self.scale_divisor != 0.0
    }

    /// The signed permutation matrix (no scale).
    pub fn axis_matrix(&self) -> Mat3 {
        let row = |axis: SignedAxis| {
            let mut r = Vec3::ZERO;
            r[axis.index()] = axis.sign();
            r
        };
        Mat3::from_cols(
            row(self.axes[0]),
            row(self.axes[1]),
            row(self.axes[2]),
        )
        .transpose()
    }

    fn remap(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            v[self.axes[0].index()] * self.axes[0].sign(),
            v[self.axes[1].index()] * self.axes[1].sign(),
            v[self.axes[2].index()] * self.axes[2].sign(),
        )
    }

    pub fn position(&self, p: Vec3) -> Vec3 {
        self.remap(p) / self.scale_divisor
    }

    /// Directions are remapped and renormalized, never scaled.
    pub fn normal(&self, n: Vec3) -> Vec3 {
        self.remap(n).normalize_or_zero()
    }

    /// Per-axis scale factors follow the permutation without signs.
    pub fn scale(&self, s: Vec3) -> Vec3 {
        self.remap(s).abs()
    }

    pub fn rotation(&self, q: Quat) -> Quat {
        let det = self.axis_matrix().determinant();
        let axis = self.remap(Vec3::new(q.x, q.y, q.z)) * det;
        Quat::from_xyzw(axis.x, axis.y, axis.z, q.w)
    }

    /// Converts an affine transform expressed in source space.
    pub fn matrix(&self, m: Mat4) -> Mat4 {
        let axes = self.axis_matrix();
        let to = Mat4::from_mat3(axes * (1.0 / self.scale_divisor));
        let from = Mat4::from_mat3(axes.transpose() * self.scale_divisor);
        to * m * from
    }
}
