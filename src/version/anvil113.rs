use super::{is_generated, Capabilities, ChunkFilter, ChunkRenderer};
use crate::block_state::BlockState;
use crate::error::DecodeError;
use crate::nbt::{self, NbtCompound, NbtList, NbtTag};
use crate::packing::{PackedIndices, Packing};
use crate::render::layout::section_index;
use crate::render::{ChunkLayout, SectionData};
use rustc_hash::FxHashSet;

/// 1.13 (17w47a introduced the flattened palette format).
pub const MIN_DATA_VERSION: i32 = 1444;

pub const CAPABILITIES: Capabilities = Capabilities {
    family: "anvil113",
    renderer: &Anvil113,
    filter: &Anvil113,
};

pub const LEVEL: &str = "Level";
pub const SECTIONS: &str = "Sections";
pub const STATUS: &str = "Status";
pub const BIOMES: &str = "Biomes";

#[derive(Debug, Clone, Copy, Default)]
pub struct Anvil113;

/// Reads a `Level`-rooted chunk. Shared with the later families that keep
/// this structure and only change the packing or the section range.
pub fn level_layout(
    root: &NbtCompound,
    packing: Packing,
    min_section: i32,
    max_section: i32,
) -> Result<Option<ChunkLayout<'_>>, DecodeError> {
    let Some(level) = nbt::compound(root, LEVEL) else {
        return Ok(None);
    };
    if !is_generated(nbt::string(level, STATUS)) {
        return Ok(None);
    }
    let Some(sections) = nbt::list(level, SECTIONS) else {
        return Ok(None);
    };

    let biomes = nbt::int_array(level, BIOMES);
    let mut layout = ChunkLayout::new(min_section, max_section, biomes);
    for section in nbt::compounds(sections) {
        if let Some(section) = legacy_section(section, packing)? {
            layout.insert(section);
        }
    }
    Ok(Some(layout))
}

/// A `Sections` entry. Light-only sections without a palette are skipped.
fn legacy_section(section: &NbtCompound, packing: Packing) -> Result<Option<SectionData<'_>>, DecodeError> {
    let (Some(y), Some(palette)) = (nbt::int(section, "Y"), nbt::list(section, "Palette")) else {
        return Ok(None);
    };
    palette_section(section_index(y)?, palette, nbt::long_array(section, "BlockStates"), packing, 0)
}

/// Builds a section from a palette list and its packed words. A palette
/// with more than one entry but no words is treated as absent.
pub fn palette_section<'a>(
    y: i32,
    palette: &NbtList,
    words: Option<&'a [i64]>,
    packing: Packing,
    min_bits: u32,
) -> Result<Option<SectionData<'a>>, DecodeError> {
    let palette = BlockState::palette_from_nbt(palette);
    let words = match words {
        Some(words) => words,
        None if palette.len() == 1 => &[],
        None => return Ok(None),
    };
    if palette.is_empty() {
        return Ok(None);
    }
    let indices = PackedIndices::new(words, palette.len(), packing, min_bits)?;
    Ok(Some(SectionData::new(y, palette, indices)))
}

/// Projection of a `Level`-rooted chunk onto what rendering reads.
pub fn minimize_level(root: &NbtCompound) -> NbtCompound {
    let mut minimal = NbtCompound::new();
    nbt::copy_key(root, &mut minimal, crate::chunk::DATA_VERSION_KEY);
    if let Some(level) = nbt::compound(root, LEVEL) {
        let mut level_out = NbtCompound::new();
        for key in [STATUS, SECTIONS, BIOMES] {
            nbt::copy_key(level, &mut level_out, key);
        }
        minimal.insert(LEVEL, NbtTag::Compound(level_out));
    }
    minimal
}

/// Names from every section palette of a `Level`-rooted chunk.
pub fn level_palette_names(root: &NbtCompound) -> FxHashSet<&str> {
    let mut names = FxHashSet::default();
    let Some(sections) = nbt::compound(root, LEVEL).and_then(|level| nbt::list(level, SECTIONS)) else {
        return names;
    };
    for section in nbt::compounds(sections) {
        if let Some(palette) = nbt::list(section, "Palette") {
            collect_names(palette, &mut names);
        }
    }
    names
}

pub fn collect_names<'a>(palette: &'a NbtList, names: &mut FxHashSet<&'a str>) {
    for entry in nbt::compounds(palette) {
        if let Some(name) = nbt::string(entry, "Name") {
            names.insert(name);
        }
    }
}

impl ChunkRenderer for Anvil113 {
    fn layout<'a>(&self, root: &'a NbtCompound) -> Result<Option<ChunkLayout<'a>>, DecodeError> {
        level_layout(root, Packing::Compact, 0, 15)
    }

    fn minimize(&self, root: &NbtCompound) -> NbtCompound {
        minimize_level(root)
    }
}

impl ChunkFilter for Anvil113 {
    fn palette_names<'a>(&self, root: &'a NbtCompound) -> FxHashSet<&'a str> {
        level_palette_names(root)
    }

    fn structure_references<'a>(&self, root: &'a NbtCompound) -> Option<&'a NbtCompound> {
        let structures = nbt::compound(nbt::compound(root, LEVEL)?, "Structures")?;
        nbt::compound(structures, "References")
    }
}
