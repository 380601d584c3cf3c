//! Multi-block terrain maps
//!
//! A zone's terrain is a grid of blocks named by their `(x, y)` position,
//! each with its own heightmap and tile index. Blocks keep their own samples
//! and sit side by side in a global grid:
//!
//! ```text
//! global sample (gx, gy) -> block (min_x + gx / w, min_y + gy / h), local (gx % w, gy % h)
//! ```
//!
//! The cell between the edge samples of two neighbouring blocks is a seam
//! cell. Height queries interpolate across it and the built mesh bridges it
//! with extra triangles. Missing blocks leave holes.

use std::collections::BTreeMap;

use glam::{UVec2, Vec2, Vec3};
use rose_formats::{HeightmapDocument, TileIndexDocument, ZoneDocument};
use rose_shared::{AssetError, AssetResult, CoordinateConvention};
use serde::Serialize;

use crate::terrain::{CellTextures, TerrainCompositor, TileTextures, convert_geometry, lerp};

/// Block position within a zone, as in `{x}_{y}.him`.
pub type BlockKey = (i32, i32);

/// Vertices one block contributes to a [`TerrainMapMesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRange {
    pub key: BlockKey,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

/// Joined mesh of every block in a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TerrainMapMesh {
    pub positions: Vec<Vec3>,
    /// Per-block UVs, each block spanning 0..1
    pub uvs: Vec<Vec2>,
    /// Block triangles first, then seam triangles from `seam_start`
    pub indices: Vec<u32>,
    pub seam_start: usize,
    /// Each block's cells in turn, blocks in `blocks` order
    pub cells: Vec<CellTextures>,
    pub blocks: Vec<BlockRange>,
}

impl TerrainMapMesh {
    pub fn seam_triangle_count(&self) -> usize {
        (self.indices.len() - self.seam_start) / 3
    }

    pub fn converted(&self, convention: &CoordinateConvention) -> Self {
        let (positions, indices) = convert_geometry(&self.positions, &self.indices, convention);
        Self {
            positions,
            indices,
            ..self.clone()
        }
    }
}

fn push_quad(indices: &mut Vec<u32>, [v0, v1, v2, v3]: [u32; 4]) {
    indices.extend_from_slice(&[v0, v1, v2, v0, v2, v3]);
}

/// Height and texture queries routed across the blocks of one zone.
#[derive(Debug, Clone)]
pub struct TerrainMap<'a> {
    blocks: BTreeMap<BlockKey, TerrainCompositor<'a>>,
    min: BlockKey,
    columns: u32,
    rows: u32,
    /// Heightmap samples per block
    samples: UVec2,
    /// Tiles per block
    tiles: UVec2,
    spacing: f32,
}

impl<'a> TerrainMap<'a> {
    /// Validates every block against `zone` and checks that all blocks share
    /// one heightmap size and one tile grid size.
    pub fn new(
        zone: &'a ZoneDocument,
        blocks: impl IntoIterator<Item = (BlockKey, &'a HeightmapDocument, &'a TileIndexDocument)>,
    ) -> AssetResult<Self> {
        let mut map = BTreeMap::new();
        let mut sizes: Option<(UVec2, UVec2)> = None;

        for (key, heightmap, tiles) in blocks {
            let found = (
                UVec2::new(heightmap.width, heightmap.height),
                UVec2::new(tiles.width, tiles.height),
            );
            if found.0.min_element() == 0 {
                return Err(AssetError::invalid_reference(format!(
                    "block {key:?} has an empty heightmap"
                )));
            }
            match sizes {
                None => sizes = Some(found),
                Some(expected) if expected != found => {
                    return Err(AssetError::invalid_reference(format!(
                        "block {key:?} has {} samples and {} tiles, other blocks have {} and {}",
                        found.0, found.1, expected.0, expected.1
                    )));
                }
                Some(_) => {}
            }

            let compositor = TerrainCompositor::new(heightmap, tiles, zone)?;
            if map.insert(key, compositor).is_some() {
                return Err(AssetError::invalid_reference(format!(
                    "block {key:?} given twice"
                )));
            }
        }

        let Some((samples, tiles)) = sizes else {
            return Err(AssetError::invalid_reference("terrain map has no blocks"));
        };

        let span = |axis: fn(&BlockKey) -> i32| {
            let min = map.keys().map(axis).min().unwrap_or(0);
            let max = map.keys().map(axis).max().unwrap_or(0);
            (min, (i64::from(max) - i64::from(min) + 1) as u32)
        };
        let (min_x, columns) = span(|key: &BlockKey| key.0);
        let (min_y, rows) = span(|key: &BlockKey| key.1);

        tracing::debug!(blocks = map.len(), columns, rows, "assembled terrain map");

        Ok(Self {
            blocks: map,
            min: (min_x, min_y),
            columns,
            rows,
            samples,
            tiles,
            spacing: zone.info.grid_size,
        })
    }

    pub fn grid_spacing(&self) -> f32 {
        self.spacing
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, key: BlockKey) -> Option<&TerrainCompositor<'a>> {
        self.blocks.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = BlockKey> + '_ {
        self.blocks.keys().copied()
    }

    /// Global sample counts, holes included.
    pub fn sample_extent(&self) -> UVec2 {
        UVec2::new(
            self.columns.saturating_mul(self.samples.x),
            self.rows.saturating_mul(self.samples.y),
        )
    }

    /// Global grid coordinates of the block's first sample.
    pub fn block_origin(&self, key: BlockKey) -> UVec2 {
        let column = (i64::from(key.0) - i64::from(self.min.0)).max(0) as u32;
        let row = (i64::from(key.1) - i64::from(self.min.1)).max(0) as u32;
        UVec2::new(column * self.samples.x, row * self.samples.y)
    }

    fn key_at(&self, column: u32, row: u32) -> Option<BlockKey> {
        let x = i32::try_from(i64::from(self.min.0) + i64::from(column)).ok()?;
        let y = i32::try_from(i64::from(self.min.1) + i64::from(row)).ok()?;
        Some((x, y))
    }

    fn sample(&self, x: u32, y: u32) -> Option<f32> {
        let key = self.key_at(x / self.samples.x, y / self.samples.y)?;
        self.blocks
            .get(&key)?
            .heightmap()
            .height_at(x % self.samples.x, y % self.samples.y)
    }

    /// Bilinear height at global grid coordinates, clamped to the map.
    /// `None` when a sample it needs falls in a missing block.
    pub fn height_at_grid(&self, x: f32, y: f32) -> Option<f32> {
        let extent = self.sample_extent();
        let max_x = (extent.x - 1) as f32;
        let max_y = (extent.y - 1) as f32;
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, max_x) };
        let y = if y.is_nan() { 0.0 } else { y.clamp(0.0, max_y) };

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(extent.x - 1);
        let y1 = (y0 + 1).min(extent.y - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let top = lerp(self.sample(x0, y0)?, self.sample(x1, y0)?, fx);
        let bottom = lerp(self.sample(x0, y1)?, self.sample(x1, y1)?, fx);
        Some(lerp(top, bottom, fy))
    }

    /// Height at a position relative to the first block's origin.
    pub fn height_at(&self, position: Vec2) -> Option<f32> {
        if self.spacing <= 0.0 {
            return self.height_at_grid(position.x, position.y);
        }
        let grid = position / self.spacing;
        self.height_at_grid(grid.x, grid.y)
    }

    /// Owning block and local coordinates of a global tile, clamped to the map.
    fn route_tile(&self, x: i64, y: i64) -> Option<(&TerrainCompositor<'a>, i64, i64)> {
        if self.tiles.min_element() == 0 {
            return None;
        }
        let (tw, th) = (i64::from(self.tiles.x), i64::from(self.tiles.y));
        let x = x.clamp(0, i64::from(self.columns) * tw - 1);
        let y = y.clamp(0, i64::from(self.rows) * th - 1);
        let key = self.key_at((x / tw) as u32, (y / th) as u32)?;
        let block = self.blocks.get(&key)?;
        Some((block, x % tw, y % th))
    }

    /// Tile id at global tile coordinates, clamped to the map.
    pub fn tile_id(&self, x: i64, y: i64) -> Option<u32> {
        let (block, x, y) = self.route_tile(x, y)?;
        block.tile_id(x, y)
    }

    pub fn textures_at(&self, x: i64, y: i64) -> Option<TileTextures<'a>> {
        let (block, x, y) = self.route_tile(x, y)?;
        block.textures_at(x, y)
    }

    /// Every block's mesh placed at its global offset, then seam quads to the
    /// right and down neighbours and a corner quad where four blocks meet.
    pub fn build_mesh(&self) -> TerrainMapMesh {
        let (w, h) = (self.samples.x, self.samples.y);
        let mut mesh = TerrainMapMesh::default();
        let mut first_vertex = BTreeMap::new();

        for (&key, block) in &self.blocks {
            let block_mesh = block.build_mesh();
            let base = mesh.positions.len() as u32;
            let offset = (self.block_origin(key).as_vec2() * self.spacing).extend(0.0);

            mesh.positions
                .extend(block_mesh.positions.iter().map(|&p| p + offset));
            mesh.uvs.extend_from_slice(&block_mesh.uvs);
            mesh.indices
                .extend(block_mesh.indices.iter().map(|&i| i + base));
            mesh.cells.extend_from_slice(&block_mesh.cells);
            mesh.blocks.push(BlockRange {
                key,
                first_vertex: base,
                vertex_count: block_mesh.positions.len() as u32,
            });
            first_vertex.insert(key, base);
        }

        mesh.seam_start = mesh.indices.len();
        let at = |base: u32, x: u32, y: u32| base + y * w + x;
        for (&key, &here) in &first_vertex {
            let neighbour = |dx: i32, dy: i32| {
                let key = (key.0.checked_add(dx)?, key.1.checked_add(dy)?);
                first_vertex.get(&key).copied()
            };
            let right = neighbour(1, 0);
            let down = neighbour(0, 1);

            if let Some(right) = right {
                for y in 0..h - 1 {
                    push_quad(
                        &mut mesh.indices,
                        [
                            at(here, w - 1, y),
                            at(right, 0, y),
                            at(right, 0, y + 1),
                            at(here, w - 1, y + 1),
                        ],
                    );
                }
            }
            if let Some(down) = down {
                for x in 0..w - 1 {
                    push_quad(
                        &mut mesh.indices,
                        [
                            at(here, x, h - 1),
                            at(here, x + 1, h - 1),
                            at(down, x + 1, 0),
                            at(down, x, 0),
                        ],
                    );
                }
            }
            if let (Some(right), Some(down), Some(diagonal)) = (right, down, neighbour(1, 1)) {
                push_quad(
                    &mut mesh.indices,
                    [
                        at(here, w - 1, h - 1),
                        at(right, 0, h - 1),
                        at(diagonal, 0, 0),
                        at(down, w - 1, 0),
                    ],
                );
            }
        }

        tracing::debug!(
            blocks = mesh.blocks.len(),
            vertices = mesh.positions.len(),
            seam_triangles = mesh.seam_triangle_count(),
            "built terrain map mesh"
        );

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rose_formats::ZoneTile;
    use rose_formats::zone::{TileRotation, ZoneInfo};

    fn zone() -> ZoneDocument {
        let tile = |layer1| ZoneTile {
            layer1,
            offset1: 0,
            layer2: 0,
            offset2: 0,
            blend: false,
            rotation: TileRotation::None,
        };
        ZoneDocument {
            info: ZoneInfo {
                zone_type: 0,
                width: 2,
                height: 1,
                grid_per_patch: 4,
                grid_size: 250.0,
                start_position: UVec2::ZERO,
            },
            event_positions: Vec::new(),
            textures: vec!["grass.dds".into(), "rock.dds".into()],
            tiles: vec![tile(0), tile(1)],
        }
    }

    fn block(first: f32) -> HeightmapDocument {
        let heights = (0..4).map(|i| first + 10.0 * i as f32).collect();
        HeightmapDocument::new(2, 2, heights).unwrap()
    }

    #[test]
    fn test_height_crosses_seam() {
        let zone = zone();
        let (west, east) = (block(0.0), block(40.0));
        let (til0, til1) = (
            TileIndexDocument::new(1, 1, vec![0]).unwrap(),
            TileIndexDocument::new(1, 1, vec![1]).unwrap(),
        );
        let map = TerrainMap::new(&zone, [((0, 0), &west, &til0), ((1, 0), &east, &til1)])
            .unwrap();

        assert_eq!(map.sample_extent(), UVec2::new(4, 2));
        // west edge 10, east edge 40
        assert_eq!(map.height_at_grid(1.5, 0.0), Some(25.0));
        // rows blend 10..40 and 30..60
        assert_eq!(map.height_at_grid(1.5, 0.5), Some(35.0));
        assert_eq!(map.height_at(Vec2::new(375.0, 125.0)), Some(35.0));
        assert_eq!(map.height_at_grid(3.0, 1.0), Some(70.0));
        assert_eq!(map.height_at_grid(99.0, -4.0), Some(50.0));
    }

    #[test]
    fn test_tile_routing() {
        let zone = zone();
        let (west, east) = (block(0.0), block(40.0));
        let (til0, til1) = (
            TileIndexDocument::new(1, 1, vec![0]).unwrap(),
            TileIndexDocument::new(1, 1, vec![1]).unwrap(),
        );
        let map = TerrainMap::new(&zone, [((3, 5), &west, &til0), ((4, 5), &east, &til1)])
            .unwrap();

        assert_eq!(map.tile_id(0, 0), Some(0));
        assert_eq!(map.tile_id(1, 0), Some(1));
        assert_eq!(map.tile_id(9, 9), Some(1));
        assert_eq!(map.textures_at(1, 0).unwrap().base, "rock.dds");
        assert_eq!(map.block_origin((4, 5)), UVec2::new(2, 0));
    }

    #[test]
    fn test_mesh_bridges_seam() {
        let zone = zone();
        let (west, east) = (block(0.0), block(40.0));
        let til = TileIndexDocument::new(1, 1, vec![0]).unwrap();
        let mesh = TerrainMap::new(&zone, [((0, 0), &west, &til), ((1, 0), &east, &til)])
            .unwrap()
            .build_mesh();

        assert_eq!(mesh.positions.len(), 8);
        assert_eq!(mesh.positions[4], Vec3::new(500.0, 0.0, 40.0));
        assert_eq!(mesh.seam_start, 12);
        assert_eq!(mesh.seam_triangle_count(), 2);
        // west (1, 0), east (0, 0), east (0, 1), west (1, 1)
        assert_eq!(&mesh.indices[12..], &[1, 4, 6, 1, 6, 3]);
        assert_eq!(mesh.cells.len(), 2);
        assert_eq!(mesh.blocks[1].first_vertex, 4);
    }

    #[test]
    fn test_missing_block_leaves_hole() {
        let zone = zone();
        let heights = block(0.0);
        let til = TileIndexDocument::new(1, 1, vec![0]).unwrap();
        let map = TerrainMap::new(
            &zone,
            [
                ((0, 0), &heights, &til),
                ((1, 0), &heights, &til),
                ((0, 1), &heights, &til),
            ],
        )
        .unwrap();

        assert_eq!(map.height_at_grid(0.5, 0.5), Some(15.0));
        assert_eq!(map.height_at_grid(3.0, 3.0), None);
        assert_eq!(map.tile_id(1, 1), None);
        // right seam and down seam, no corner without the diagonal block
        assert_eq!(map.build_mesh().seam_triangle_count(), 4);
    }

    #[test]
    fn test_corner_quad_joins_four_blocks() {
        let zone = zone();
        let heights = block(0.0);
        let til = TileIndexDocument::new(1, 1, vec![0]).unwrap();
        let blocks = [(0, 0), (1, 0), (0, 1), (1, 1)].map(|key| (key, &heights, &til));
        let mesh = TerrainMap::new(&zone, blocks).unwrap().build_mesh();
        // two right seams, two down seams, one corner
        assert_eq!(mesh.seam_triangle_count(), 10);
    }

    #[test]
    fn test_rejects_mismatched_block_sizes() {
        let zone = zone();
        let small = block(0.0);
        let wide = HeightmapDocument::new(3, 2, vec![0.0; 6]).unwrap();
        let til = TileIndexDocument::new(1, 1, vec![0]).unwrap();
        let err = TerrainMap::new(&zone, [((0, 0), &small, &til), ((1, 0), &wide, &til)])
            .unwrap_err();
        assert!(matches!(err, AssetError::InvalidReference { .. }));
    }

    #[test]
    fn test_rejects_empty_map() {
        let zone = zone();
        let none: Vec<(BlockKey, &HeightmapDocument, &TileIndexDocument)> = Vec::new();
        let err = TerrainMap::new(&zone, none).unwrap_err();
        assert!(matches!(err, AssetError::InvalidReference { .. }));
    }
}
