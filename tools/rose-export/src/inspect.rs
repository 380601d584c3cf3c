//! One-screen summaries of parsed documents

use rose_formats::AnyDocument;

/// Human readable `key: value` lines describing `document`.
pub fn summarize(document: &AnyDocument) -> Vec<String> {
    let mut lines = vec![format!("format: {}", document.format())];
    match document {
        AnyDocument::Mesh(mesh) => {
            lines.push(format!("version: {:?}", mesh.version));
            lines.push(format!("vertex format: {:?}", mesh.format));
            lines.push(format!("vertices: {}", mesh.vertex_count));
            lines.push(format!("triangles: {}", mesh.triangle_count()));
            lines.push(format!("bone table: {}", mesh.bone_table.len()));
            lines.push(format!("materials: {}", mesh.material_face_counts.len()));
            lines.push(format!(
                "bounds: {:?} .. {:?}",
                mesh.bounding_box.min, mesh.bounding_box.max
            ));
        }
        AnyDocument::Skeleton(skeleton) => {
            lines.push(format!("version: {:?}", skeleton.version));
            lines.push(format!("bones: {}", skeleton.bones.len()));
            lines.push(format!("dummies: {}", skeleton.dummies.len()));
            let roots: Vec<usize> = (0..skeleton.node_count())
                .filter(|&i| skeleton.is_root(i))
                .collect();
            lines.push(format!("roots: {roots:?}"));
        }
        AnyDocument::Animation(animation) => {
            lines.push(format!("fps: {}", animation.fps));
            lines.push(format!("frames: {}", animation.frame_count));
            lines.push(format!("duration: {:.3}s", animation.duration_secs()));
            lines.push(format!("channels: {}", animation.channels.len()));
            lines.push(format!("events: {}", animation.events().len()));
            lines.push(format!(
                "interpolation interval: {}ms",
                animation.interpolation_interval_ms()
            ));
        }
        AnyDocument::Zone(zone) => {
            lines.push(format!("size: {}x{}", zone.info.width, zone.info.height));
            lines.push(format!("grid size: {}", zone.info.grid_size));
            lines.push(format!("event positions: {}", zone.event_positions.len()));
            lines.push(format!("textures: {}", zone.textures.len()));
            lines.push(format!("tiles: {}", zone.tiles.len()));
        }
        AnyDocument::SceneComposition(scene) => {
            lines.push(format!("meshes: {}", scene.meshes.len()));
            lines.push(format!("materials: {}", scene.materials.len()));
            lines.push(format!("effects: {}", scene.effects.len()));
            lines.push(format!("objects: {}", scene.objects.len()));
            let parts: usize = scene.objects.iter().map(|o| o.parts.len()).sum();
            lines.push(format!("parts: {parts}"));
        }
        AnyDocument::Placement(placement) => {
            lines.push(format!("objects: {}", placement.objects.len()));
            lines.push(format!(
                "monster spawns: {}",
                placement.monster_spawns().count()
            ));
            lines.push(format!("water planes: {}", placement.water_planes.len()));
        }
        AnyDocument::Heightmap(map) => {
            lines.push(format!("size: {}x{}", map.width, map.height));
            if let (Some(min), Some(max)) = (map.min_height(), map.max_height()) {
                lines.push(format!("height range: {min} .. {max}"));
            }
        }
        AnyDocument::TileIndex(tiles) => {
            lines.push(format!("size: {}x{}", tiles.width, tiles.height));
        }
        AnyDocument::CharacterDefinition(characters) => {
            lines.push(format!("skeletons: {}", characters.skeletons.len()));
            lines.push(format!("motions: {}", characters.motions.len()));
            lines.push(format!("effects: {}", characters.effects.len()));
            lines.push(format!(
                "characters: {} of {} slots",
                characters.characters.len(),
                characters.character_slots
            ));
        }
    }
    lines
}
