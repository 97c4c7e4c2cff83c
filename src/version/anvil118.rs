use super::anvil113;
use super::{is_generated, Capabilities, ChunkFilter, ChunkRenderer};
use crate::biome::SectionBiomes;
use crate::chunk::DATA_VERSION_KEY;
use crate::error::DecodeError;
use crate::nbt::{self, NbtCompound};
use crate::packing::Packing;
use crate::render::layout::section_index;
use crate::render::{ChunkLayout, SectionData};
use rustc_hash::FxHashSet;

/// 21w43a
pub const MIN_DATA_VERSION: i32 = 2860;

pub const CAPABILITIES: Capabilities = Capabilities {
    family: "anvil118",
    renderer: &Anvil118,
    filter: &Anvil118,
};

pub const SECTIONS: &str = "sections";
pub const STATUS: &str = "Status";
pub const BLOCK_STATES: &str = "block_states";
pub const BIOMES: &str = "biomes";

#[derive(Debug, Clone, Copy, Default)]
pub struct Anvil118;

fn read_section<'a>(section: &'a NbtCompound) -> Result<Option<SectionData<'a>>, DecodeError> {
    let (Some(y), Some(states)) = (nbt::int(section, "Y"), nbt::compound(section, BLOCK_STATES))
    else {
        return Ok(None);
    };
    let Some(palette) = nbt::list(states, "palette") else {
        return Ok(None);
    };
    let data = nbt::long_array(states, "data");
    let Some(data) = anvil113::palette_section(section_index(y)?, palette, data, Packing::Padded, 0)? else {
        return Ok(None);
    };
    // Biomes only tint; a broken biome container leaves the blocks readable.
    let biomes = nbt::compound(section, BIOMES)
        .and_then(|biomes| SectionBiomes::from_nbt(biomes).ok().flatten());
    Ok(Some(data.with_biomes(biomes)))
}

impl ChunkRenderer for Anvil118 {
    fn layout<'a>(&self, root: &'a NbtCompound) -> Result<Option<ChunkLayout<'a>>, DecodeError> {
        if !is_generated(nbt::string(root, STATUS)) {
            return Ok(None);
        }
        let Some(list) = nbt::list(root, SECTIONS) else {
            return Ok(None);
        };

        let mut sections = Vec::new();
        for entry in nbt::compounds(list) {
            if let Some(data) = read_section(entry)? {
                sections.push(data);
            }
        }
        // Data packs may change the build height, so take the range from
        // the sections themselves.
        let min = sections.iter().map(SectionData::y).min().unwrap_or(0);
        let max = sections.iter().map(SectionData::y).max().unwrap_or(-1);
        let mut layout = ChunkLayout::new(min, max, None);
        for data in sections {
            layout.insert(data);
        }
        Ok(Some(layout))
    }

    fn minimize(&self, root: &NbtCompound) -> NbtCompound {
        let mut minimal = NbtCompound::new();
        for key in [DATA_VERSION_KEY, STATUS, SECTIONS] {
            nbt::copy_key(root, &mut minimal, key);
        }
        minimal
    }
}

impl ChunkFilter for Anvil118 {
    fn palette_names<'a>(&self, root: &'a NbtCompound) -> FxHashSet<&'a str> {
        let mut names = FxHashSet::default();
        let Some(sections) = nbt::list(root, SECTIONS) else {
            return names;
        };
        for section in nbt::compounds(sections) {
            if let Some(palette) = nbt::compound(section, BLOCK_STATES).and_then(|s| nbt::list(s, "palette")) {
                anvil113::collect_names(palette, &mut names);
            }
        }
        names
    }

    fn structure_references<'a>(&self, root: &'a NbtCompound) -> Option<&'a NbtCompound> {
        nbt::compound(nbt::compound(root, "structures")?, "References")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_state::BlockState;
    use crate::color::{BiomeColors, ColorMapping, StaticColorMapping};
    use crate::nbt::{NbtList, NbtTag};
    use crate::packing::pack;
    use crate::render::{Placement, RegionImage, TerrainOptions};

    fn string_list(values: &[&str]) -> NbtTag {
        NbtTag::List(NbtList::from(
            values
                .iter()
                .map(|v| NbtTag::String(v.to_string()))
                .collect::<Vec<_>>(),
        ))
    }

    fn modern_section(y: i8, blocks: &[&str], data: Option<Vec<i64>>, biomes: &[&str]) -> NbtTag {
        let mut states = NbtCompound::new();
        states.insert(
            "palette",
            NbtTag::List(NbtList::from(
                blocks
                    .iter()
                    .map(|name| BlockState::new(*name).to_nbt())
                    .collect::<Vec<_>>(),
            )),
        );
        if let Some(data) = data {
            states.insert("data", NbtTag::LongArray(data));
        }
        let mut biome_container = NbtCompound::new();
        biome_container.insert("palette", string_list(biomes));

        let mut section = NbtCompound::new();
        section.insert("Y", NbtTag::Byte(y));
        section.insert(BLOCK_STATES, NbtTag::Compound(states));
        section.insert(BIOMES, NbtTag::Compound(biome_container));
        NbtTag::Compound(section)
    }

    fn modern_chunk(sections: Vec<NbtTag>) -> NbtCompound {
        let mut root = NbtCompound::new();
        root.insert(DATA_VERSION_KEY, NbtTag::Int(3465));
        root.insert(STATUS, NbtTag::String("minecraft:full".to_string()));
        root.insert(SECTIONS, NbtTag::List(NbtList::from(sections)));
        root.insert("Heightmaps", NbtTag::Compound(NbtCompound::new()));
        root
    }

    #[test]
    fn test_named_biome_tints() {
        let mut slots = vec![0u32; 4096];
        slots[15 * 256..].fill(1);
        let root = modern_chunk(vec![modern_section(
            3,
            &["minecraft:air", "minecraft:grass_block"],
            Some(pack(&slots, 4, Packing::Padded).unwrap()),
            &["minecraft:swamp"],
        )]);
        let colors = StaticColorMapping::from_json(
            r#"{ "blocks": { "minecraft:grass_block": 1 }, "tinted": { "minecraft:grass_block": "Grass" } }"#,
        )
        .unwrap()
        .with_biome(
            "minecraft:swamp",
            BiomeColors {
                id: 6,
                grass: Some(0x6A7039),
                ..Default::default()
            },
        );
        assert_eq!(colors.biome_id("minecraft:swamp"), Some(6));

        let mut image = RegionImage::new(1).unwrap();
        Anvil118
            .render_terrain(&root, &colors, &mut image.target(), Placement::new(0, 0, 1), TerrainOptions::default())
            .unwrap();
        assert_eq!(image.pixels[0], 0x6A7039);
        assert_eq!(image.terrain_heights[0], 63);
    }

    #[test]
    fn test_single_state_section_without_data() {
        let root = modern_chunk(vec![
            modern_section(-4, &["minecraft:bedrock"], None, &["minecraft:plains"]),
            modern_section(5, &["minecraft:air"], None, &["minecraft:plains"]),
        ]);
        let layout = Anvil118.layout(&root).unwrap().unwrap();
        assert_eq!(layout.section(-4).unwrap().block(7, 7, 7).unwrap().name, "minecraft:bedrock");
        assert!(layout.section(0).is_none());

        let colors = StaticColorMapping::default().with_block("minecraft:bedrock", 0x333333);
        let mut image = RegionImage::new(1).unwrap();
        Anvil118
            .render_terrain(&root, &colors, &mut image.target(), Placement::new(0, 0, 1), TerrainOptions::default())
            .unwrap();
        assert_eq!(image.terrain_heights[0], -49);
    }

    #[test]
    fn test_corrupt_section_y_rejected() {
        let stone_at = |y: i64| {
            let mut states = NbtCompound::new();
            states.insert(
                "palette",
                NbtTag::List(NbtList::from(vec![BlockState::new("minecraft:stone").to_nbt()])),
            );
            let mut section = NbtCompound::new();
            section.insert("Y", NbtTag::Long(y));
            section.insert(BLOCK_STATES, NbtTag::Compound(states));
            NbtTag::Compound(section)
        };
        for (low, high) in [(-1_000_000_000, 1_000_000_000), (i64::from(i32::MIN), i64::from(i32::MAX))] {
            let root = modern_chunk(vec![stone_at(low), stone_at(high)]);
            assert_eq!(
                Anvil118.layout(&root).unwrap_err(),
                DecodeError::SectionOutOfRange(low)
            );
        }
    }

    #[test]
    fn test_proto_chunk_skipped() {
        let mut root = modern_chunk(vec![modern_section(0, &["minecraft:stone"], None, &[])]);
        root.insert(STATUS, NbtTag::String("minecraft:empty".to_string()));
        assert!(Anvil118.layout(&root).unwrap().is_none());
    }

    #[test]
    fn test_minimize_keeps_render_inputs() {
        let root = modern_chunk(vec![modern_section(0, &["minecraft:stone"], None, &[])]);
        let minimal = Anvil118.minimize(&root);
        assert_eq!(minimal.inner().len(), 3);
        assert!(nbt::tag(&minimal, "Heightmaps").is_none());
        assert_eq!(
            Anvil118.layout(&minimal).unwrap().unwrap().section(0).unwrap().palette()[0].name,
            "minecraft:stone"
        );
    }

    #[test]
    fn test_structures_lowercase_key() {
        let mut references = NbtCompound::new();
        references.insert("minecraft:village_plains", NbtTag::LongArray(vec![42]));
        let mut structures = NbtCompound::new();
        structures.insert("References", NbtTag::Compound(references));
        let mut root = modern_chunk(Vec::new());
        root.insert("structures", NbtTag::Compound(structures));

        let found = Anvil118.structure_references(&root).unwrap();
        assert!(nbt::tag(found, "minecraft:village_plains").is_some());
    }
}
