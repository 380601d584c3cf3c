//! HIM heightmap format (.him)
//!
//! ```text
//! width i32, height i32, grid_count i32, patch_scale f32
//! width × height × f32   (row-major, y outer)
//! ```

use byteorder::{LittleEndian, WriteBytesExt};
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader};
use serde::Serialize;
use std::io::{self, Write};

use crate::serialization::{BinaryDocument, BinaryEncode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightmapDocument {
    pub width: u32,
    pub height: u32,
    pub grid_count: i32,
    pub patch_scale: f32,
    /// `width × height` samples, row-major
    pub heights: Vec<f32>,
}

impl HeightmapDocument {
    /// Builds a heightmap from row-major samples. `None` when the sample
    /// count does not match the dimensions.
    pub fn new(width: u32, height: u32, heights: Vec<f32>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?;
        (heights.len() == expected).then_some(Self {
            width,
            height,
            grid_count: 0,
            patch_scale: 0.0,
            heights,
        })
    }

    /// Sample at integer grid coordinates.
    pub fn height_at(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.heights
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn min_height(&self) -> Option<f32> {
        self.heights.iter().copied().reduce(f32::min)
    }

    pub fn max_height(&self) -> Option<f32> {
        self.heights.iter().copied().reduce(f32::max)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.heights.chunks_exact(self.width.max(1) as usize)
    }
}

fn read_dimension(reader: &mut ByteReader<'_>, what: &str) -> AssetResult<u32> {
    let offset = reader.offset();
    let value = reader.read_i32()?;
    u32::try_from(value)
        .map_err(|_| AssetError::malformed(offset, format!("negative {what} {value}")))
}

impl BinaryDocument for HeightmapDocument {
    const FORMAT: AssetFormat = AssetFormat::Heightmap;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let width = read_dimension(reader, "width")?;
        let height = read_dimension(reader, "height")?;
        let grid_count = reader.read_i32()?;
        let patch_scale = reader.read_f32()?;

        let count = (width as usize).saturating_mul(height as usize);
        reader.ensure_available("heights", count, 4)?;
        let heights = (0..count)
            .map(|_| reader.read_f32())
            .collect::<AssetResult<Vec<_>>>()?;

        tracing::debug!(width, height, "parsed heightmap");

        Ok(HeightmapDocument {
            width,
            height,
            grid_count,
            patch_scale,
            heights,
        })
    }
}

impl BinaryEncode for HeightmapDocument {
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let expected = self.width as usize * self.height as usize;
        if self.heights.len() != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} heights for a {}x{} grid",
                    self.heights.len(),
                    self.width,
                    self.height
                ),
            ));
        }
        let dimension = |v: u32| {
            i32::try_from(v)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "dimension exceeds i32"))
        };
        w.write_i32::<LittleEndian>(dimension(self.width)?)?;
        w.write_i32::<LittleEndian>(dimension(self.height)?)?;
        w.write_i32::<LittleEndian>(self.grid_count)?;
        w.write_f32::<LittleEndian>(self.patch_scale)?;
        for &h in &self.heights {
            w.write_f32::<LittleEndian>(h)?;
        }
        Ok(())
    }
}
