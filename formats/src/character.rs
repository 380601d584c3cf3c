//! CHR character definition format (.chr)
//!
//! ```text
//! skeleton_count u16 × cstr
//! motion_count u16   × cstr
//! effect_count u16   × cstr
//! character_count u16
//!   per id: enabled u8
//!     enabled: skeleton u16, name cstr,
//!              model_count u16  × mesh id u16,
//!              motion_count u16 × (action id u16, motion index u16),
//!              effect_count u16 × (trigger id u16, effect index u16)
//! ```
//!
//! Ids without a record are simply absent from
//! [`CharacterDefinitionDocument::characters`].

use hashbrown::HashMap;
use rose_shared::{AssetError, AssetFormat, AssetResult, ByteReader};
use serde::Serialize;

use crate::serialization::BinaryDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionBinding {
    pub action_id: u16,
    /// Index into [`CharacterDefinitionDocument::motions`]
    pub motion_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectBinding {
    pub trigger_id: u16,
    /// Index into [`CharacterDefinitionDocument::effects`]
    pub effect_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterDefinition {
    /// Index into [`CharacterDefinitionDocument::skeletons`]
    pub skeleton_index: u16,
    pub name: String,
    pub model_ids: Vec<u16>,
    pub motions: Vec<MotionBinding>,
    pub effects: Vec<EffectBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterDefinitionDocument {
    pub skeletons: Vec<String>,
    pub motions: Vec<String>,
    pub effects: Vec<String>,
    /// Number of id slots in the table, including empty ones
    pub character_slots: u16,
    pub characters: HashMap<u16, CharacterDefinition>,
}

impl CharacterDefinitionDocument {
    pub fn character(&self, id: u16) -> Option<&CharacterDefinition> {
        self.characters.get(&id)
    }

    pub fn skeleton_path(&self, character: &CharacterDefinition) -> Option<&str> {
        self.skeletons
            .get(character.skeleton_index as usize)
            .map(String::as_str)
    }

    /// Motion file bound to `action_id`, if any.
    pub fn motion_path(&self, character: &CharacterDefinition, action_id: u16) -> Option<&str> {
        character
            .motions
            .iter()
            .find(|binding| binding.action_id == action_id)
            .and_then(|binding| self.motions.get(binding.motion_index as usize))
            .map(String::as_str)
    }
}

fn read_paths(reader: &mut ByteReader<'_>, what: &'static str) -> AssetResult<Vec<String>> {
    let count = reader.read_u16()? as usize;
    reader.ensure_available(what, count, 1)?;
    (0..count).map(|_| reader.read_cstring()).collect()
}

fn check_index(offset: usize, what: &str, index: u16, len: usize) -> AssetResult<()> {
    if index as usize >= len {
        return Err(AssetError::malformed(
            offset,
            format!("{what} index {index} outside {len} entries"),
        ));
    }
    Ok(())
}

fn read_pairs(reader: &mut ByteReader<'_>, what: &'static str) -> AssetResult<Vec<(u16, u16, usize)>> {
    let count = reader.read_u16()? as usize;
    reader.ensure_available(what, count, 4)?;
    (0..count)
        .map(|_| {
            let id = reader.read_u16()?;
            let offset = reader.offset();
            Ok((id, reader.read_u16()?, offset))
        })
        .collect()
}

impl BinaryDocument for CharacterDefinitionDocument {
    const FORMAT: AssetFormat = AssetFormat::CharacterDefinition;

    fn read(reader: &mut ByteReader<'_>) -> AssetResult<Self> {
        let skeletons = read_paths(reader, "skeleton paths")?;
        let motions = read_paths(reader, "motion paths")?;
        let effects = read_paths(reader, "effect paths")?;

        let character_slots = reader.read_u16()?;
        reader.ensure_available("character slots", character_slots as usize, 1)?;
        let mut characters = HashMap::new();
        for id in 0..character_slots {
            if reader.read_u8()? == 0 {
                continue;
            }

            let offset = reader.offset();
            let skeleton_index = reader.read_u16()?;
            check_index(offset, "skeleton", skeleton_index, skeletons.len())?;
            let name = reader.read_cstring()?;

            let model_count = reader.read_u16()? as usize;
            reader.ensure_available("model ids", model_count, 2)?;
            let model_ids = (0..model_count)
                .map(|_| reader.read_u16())
                .collect::<AssetResult<Vec<_>>>()?;

            let mut motion_bindings = Vec::new();
            for (action_id, motion_index, offset) in read_pairs(reader, "motion bindings")? {
                check_index(offset, "motion", motion_index, motions.len())?;
                motion_bindings.push(MotionBinding {
                    action_id,
                    motion_index,
                });
            }

            let mut effect_bindings = Vec::new();
            for (trigger_id, effect_index, offset) in read_pairs(reader, "effect bindings")? {
                check_index(offset, "effect", effect_index, effects.len())?;
                effect_bindings.push(EffectBinding {
                    trigger_id,
                    effect_index,
                });
            }

            characters.insert(
                id,
                CharacterDefinition {
                    skeleton_index,
                    name,
                    model_ids,
                    motions: motion_bindings,
                    effects: effect_bindings,
                },
            );
        }

        tracing::debug!(
            skeletons = skeletons.len(),
            motions = motions.len(),
            effects = effects.len(),
            characters = characters.len(),
            "parsed character definitions"
        );

        Ok(CharacterDefinitionDocument {
            skeletons,
            motions,
            effects,
            character_slots,
            characters,
        })
    }
}
