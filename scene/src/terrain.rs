//! Terrain composition
//!
//! A map block pairs a heightmap (HIM) with a tile index (TIL) and the zone
//! (ZON) tile and texture tables. Texture resolution goes through exactly
//! three lookups:
//!
//! ```text
//! TIL[x, y] -> zone.tiles[id] -> zone.textures[layer + offset]
//! ```
//!
//! Grid queries clamp to the grid instead of failing.

use glam::{Vec2, Vec3};
use rose_formats::zone::TileRotation;
use rose_formats::{HeightmapDocument, TileIndexDocument, ZoneDocument, ZoneTile};
use rose_shared::{AssetError, AssetResult, CoordinateConvention};
use serde::Serialize;

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Bilinear height at fractional grid coordinates, clamped to the grid.
/// An empty heightmap reads as zero.
pub fn sample_height(heightmap: &HeightmapDocument, x: f32, y: f32) -> f32 {
    if heightmap.width == 0 || heightmap.height == 0 {
        return 0.0;
    }
    let max_x = (heightmap.width - 1) as f32;
    let max_y = (heightmap.height - 1) as f32;
    let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, max_x) };
    let y = if y.is_nan() { 0.0 } else { y.clamp(0.0, max_y) };

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(heightmap.width - 1);
    let y1 = (y0 + 1).min(heightmap.height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |x: u32, y: u32| heightmap.height_at(x, y).unwrap_or(0.0);
    let top = lerp(at(x0, y0), at(x1, y0), fx);
    let bottom = lerp(at(x0, y1), at(x1, y1), fx);
    lerp(top, bottom, fy)
}

/// Textures resolved for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileTextures<'a> {
    pub tile_id: u32,
    pub tile: &'a ZoneTile,
    pub base: &'a str,
    /// Blended second layer, when the tile has blending enabled
    pub overlay: Option<&'a str>,
    pub rotation: TileRotation,
}

/// Texture table indices for one heightmap cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellTextures {
    pub base: usize,
    pub overlay: Option<usize>,
    pub rotation: TileRotation,
}

/// Renderable grid for one map block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainMesh {
    pub width: u32,
    pub height: u32,
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Two triangles per cell, cells row-major
    pub indices: Vec<u32>,
    /// One entry per cell, row-major
    pub cells: Vec<CellTextures>,
}

impl TerrainMesh {
    /// Positions converted to `convention`. Triangle winding is reversed when
    /// the axis remap is a reflection.
    pub fn converted(&self, convention: &CoordinateConvention) -> Self {
        let (positions, indices) = convert_geometry(&self.positions, &self.indices, convention);
        Self {
            positions,
            indices,
            ..self.clone()
        }
    }
}

pub(crate) fn convert_geometry(
    positions: &[Vec3],
    indices: &[u32],
    convention: &CoordinateConvention,
) -> (Vec<Vec3>, Vec<u32>) {
    let positions = positions.iter().map(|&p| convention.position(p)).collect();
    let mut indices = indices.to_vec();
    if convention.axis_matrix().determinant() < 0.0 {
        for tri in indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }
    (positions, indices)
}

/// Height and texture queries over one validated map block.
#[derive(Debug, Clone, Copy)]
pub struct TerrainCompositor<'a> {
    heightmap: &'a HeightmapDocument,
    tiles: &'a TileIndexDocument,
    zone: &'a ZoneDocument,
}

impl<'a> TerrainCompositor<'a> {
    /// Checks every tile reference up front so lookups cannot fail later.
    pub fn new(
        heightmap: &'a HeightmapDocument,
        tiles: &'a TileIndexDocument,
        zone: &'a ZoneDocument,
    ) -> AssetResult<Self> {
        let tile_count = zone.tiles.len();
        if let Some((cell, id)) = tiles
            .tiles
            .iter()
            .enumerate()
            .find(|&(_, &id)| id as usize >= tile_count)
        {
            return Err(AssetError::invalid_reference(
                format!("tile index cell {cell} names tile {id}, zone has {tile_count}"),
            ));
        }

        let texture_count = zone.textures.len();
        for (id, tile) in zone.tiles.iter().enumerate() {
            let mut layers = vec![tile.texture_index1()];
            if tile.blend {
                layers.push(tile.texture_index2());
            }
            if let Some(bad) = layers.into_iter().find(|&t| t >= texture_count) {
                return Err(AssetError::invalid_reference(
                    format!("zone tile {id} uses texture {bad}, zone has {texture_count}"),
                ));
            }
        }

        Ok(Self {
            heightmap,
            tiles,
            zone,
        })
    }

    /// Distance between neighbouring height samples, in source units.
    pub fn grid_spacing(&self) -> f32 {
        self.zone.info.grid_size
    }

    pub fn heightmap(&self) -> &'a HeightmapDocument {
        self.heightmap
    }

    pub fn tiles(&self) -> &'a TileIndexDocument {
        self.tiles
    }

    /// Height at fractional grid coordinates.
    pub fn height_at_grid(&self, x: f32, y: f32) -> f32 {
        sample_height(self.heightmap, x, y)
    }

    /// Height at a position relative to the block origin, in source units.
    pub fn height_at(&self, position: Vec2) -> f32 {
        let spacing = self.grid_spacing();
        if spacing <= 0.0 {
            return self.height_at_grid(position.x, position.y);
        }
        let grid = position / spacing;
        self.height_at_grid(grid.x, grid.y)
    }

    /// Tile id at clamped tile coordinates; `None` for an empty tile grid.
    pub fn tile_id(&self, x: i64, y: i64) -> Option<u32> {
        if self.tiles.width == 0 || self.tiles.height == 0 {
            return None;
        }
        let x = x.clamp(0, i64::from(self.tiles.width) - 1) as u32;
        let y = y.clamp(0, i64::from(self.tiles.height) - 1) as u32;
        self.tiles.tile_at(x, y)
    }

    /// Textures for the tile at clamped tile coordinates.
    pub fn textures_at(&self, x: i64, y: i64) -> Option<TileTextures<'a>> {
        let tile_id = self.tile_id(x, y)?;
        let tile = self.zone.tiles.get(tile_id as usize)?;
        let base = self.zone.textures.get(tile.texture_index1())?;
        let overlay = if tile.blend {
            Some(self.zone.textures.get(tile.texture_index2())?.as_str())
        } else {
            None
        };
        Some(TileTextures {
            tile_id,
            tile,
            base: base.as_str(),
            overlay,
            rotation: tile.rotation,
        })
    }

    /// Vertex grid with heights, UVs spanning the block, two triangles per
    /// cell and each cell's textures. A cell uses the tile at its own
    /// coordinates, clamped to the tile grid.
    pub fn build_mesh(&self) -> TerrainMesh {
        let (w, h) = (self.heightmap.width, self.heightmap.height);
        let spacing = self.grid_spacing();
        let u_span = w.saturating_sub(1).max(1) as f32;
        let v_span = h.saturating_sub(1).max(1) as f32;

        let mut positions = Vec::with_capacity((w * h) as usize);
        let mut uvs = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                let height = self.heightmap.height_at(x, y).unwrap_or(0.0);
                positions.push(Vec3::new(x as f32 * spacing, y as f32 * spacing, height));
                uvs.push(Vec2::new(x as f32 / u_span, y as f32 / v_span));
            }
        }

        let cells_x = w.saturating_sub(1);
        let cells_y = h.saturating_sub(1);
        let mut indices = Vec::with_capacity((cells_x * cells_y * 6) as usize);
        let mut cells = Vec::with_capacity((cells_x * cells_y) as usize);
        for y in 0..cells_y {
            for x in 0..cells_x {
                let v0 = y * w + x;
                let v1 = v0 + 1;
                let v2 = v0 + w + 1;
                let v3 = v0 + w;
                indices.extend_from_slice(&[v0, v1, v2, v0, v2, v3]);

                if let Some(textures) = self.textures_at(i64::from(x), i64::from(y)) {
                    cells.push(CellTextures {
                        base: textures.tile.texture_index1(),
                        overlay: textures
                            .overlay
                            .map(|_| textures.tile.texture_index2()),
                        rotation: textures.rotation,
                    });
                }
            }
        }

        tracing::debug!(
            vertices = positions.len(),
            triangles = indices.len() / 3,
            "built terrain mesh"
        );

        TerrainMesh {
            width: w,
            height: h,
            positions,
            uvs,
            indices,
            cells,
        }
    }
}
