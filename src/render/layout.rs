use crate::biome::{self, SectionBiomes, NO_BIOME};
use crate::block_state::BlockState;
use crate::color::ColorMapping;
use crate::error::DecodeError;
use crate::packing::PackedIndices;
use std::ops::RangeInclusive;

/// Blocks per section edge.
pub const SECTION_SIZE: usize = 16;

/// Section indices any layout can hold. Chunks store `Y` as a byte.
pub const SECTION_Y_RANGE: RangeInclusive<i32> = -128..=127;

/// Checks a section `Y` read from chunk data.
pub fn section_index(y: i64) -> Result<i32, DecodeError> {
    i32::try_from(y)
        .ok()
        .filter(|y| SECTION_Y_RANGE.contains(y))
        .ok_or(DecodeError::SectionOutOfRange(y))
}

/// One 16x16x16 section with its palette resolved.
#[derive(Debug, Clone)]
pub struct SectionData<'a> {
    y: i32,
    palette: Vec<BlockState>,
    indices: PackedIndices<'a>,
    biomes: Option<SectionBiomes<'a>>,
}

impl<'a> SectionData<'a> {
    pub fn new(y: i32, palette: Vec<BlockState>, indices: PackedIndices<'a>) -> Self {
        Self {
            y,
            palette,
            indices,
            biomes: None,
        }
    }

    pub fn with_biomes(mut self, biomes: Option<SectionBiomes<'a>>) -> Self {
        self.biomes = biomes;
        self
    }

    /// Section index (block Y divided by 16).
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Absolute Y of the section's lowest block layer.
    pub fn base_y(&self) -> i32 {
        self.y * SECTION_SIZE as i32
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    /// Block at section-local coordinates (`y * 256 + z * 16 + x`).
    pub fn block(&self, x: usize, y: usize, z: usize) -> Result<&BlockState, DecodeError> {
        let index = y * SECTION_SIZE * SECTION_SIZE + z * SECTION_SIZE + x;
        Ok(&self.palette[self.indices.get(index)?])
    }
}

#[derive(Debug, Clone)]
pub struct ChunkLayout<'a> {
    min_section: i32,
    sections: Vec<Option<SectionData<'a>>>,
    biomes: Option<&'a [i32]>,
}

impl<'a> ChunkLayout<'a> {
    /// Empty layout accepting section indices `min_section..=max_section`,
    /// narrowed to [`SECTION_Y_RANGE`].
    pub fn new(min_section: i32, max_section: i32, biomes: Option<&'a [i32]>) -> Self {
        let min_section = min_section.max(*SECTION_Y_RANGE.start());
        let max_section = max_section.min(*SECTION_Y_RANGE.end());
        let count = (max_section - min_section + 1).max(0) as usize;
        Self {
            min_section,
            sections: vec![None; count],
            biomes,
        }
    }

    /// Stores a section; sections outside the accepted range are dropped and
    /// `false` is returned.
    pub fn insert(&mut self, section: SectionData<'a>) -> bool {
        match section
            .y
            .checked_sub(self.min_section)
            .and_then(|slot| usize::try_from(slot).ok())
            .and_then(|slot| self.sections.get_mut(slot))
        {
            Some(entry) => {
                *entry = Some(section);
                true
            }
            None => false,
        }
    }

    pub fn section(&self, y: i32) -> Option<&SectionData<'a>> {
        let slot = usize::try_from(y.checked_sub(self.min_section)?).ok()?;
        self.sections.get(slot)?.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(Option::is_none)
    }

    /// Present sections from the top down, each paired with the highest
    /// local layer to visit so that no block above `max_y` is read.
    pub fn descend(&self, max_y: i32) -> impl Iterator<Item = (&SectionData<'a>, usize)> {
        self.sections
            .iter()
            .rev()
            .flatten()
            .filter(move |section| section.base_y() <= max_y)
            .map(move |section| {
                let top = max_y
                    .saturating_sub(section.base_y())
                    .min(SECTION_SIZE as i32 - 1);
                (section, top as usize)
            })
    }

    /// Biome id at chunk-local `x`/`z` and absolute `y`, clamped for the
    /// colour lookup. Named per-section biomes go through the mapping.
    pub fn biome(
        &self,
        colors: &dyn ColorMapping,
        section: &SectionData<'a>,
        x: usize,
        y: i32,
        z: usize,
    ) -> i32 {
        let id = match &section.biomes {
            Some(names) => names
                .name_at(x, y.rem_euclid(SECTION_SIZE as i32) as usize, z)
                .ok()
                .and_then(|name| colors.biome_id(name))
                .unwrap_or(NO_BIOME),
            None => biome::biome_at(self.biomes, x, y, z),
        };
        biome::clamp_biome(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::{pack, Packing};

    fn uniform(y: i32, name: &str) -> SectionData<'static> {
        let indices = PackedIndices::new(&[], 1, Packing::Padded, 4).unwrap();
        SectionData::new(y, vec![BlockState::new(name)], indices)
    }

    #[test]
    fn test_insert_respects_range() {
        let mut layout = ChunkLayout::new(-4, 19, None);
        assert!(layout.insert(uniform(-4, "minecraft:deepslate")));
        assert!(layout.insert(uniform(19, "minecraft:air")));
        assert!(!layout.insert(uniform(20, "minecraft:air")));
        assert!(!layout.insert(uniform(-5, "minecraft:air")));
        assert!(layout.section(-4).is_some());
        assert!(layout.section(0).is_none());
        assert!(layout.section(-5).is_none());
    }

    #[test]
    fn test_range_is_bounded() {
        let mut layout = ChunkLayout::new(i32::MIN, i32::MAX, None);
        assert!(layout.is_empty());
        assert!(layout.insert(uniform(-128, "minecraft:stone")));
        assert!(layout.insert(uniform(127, "minecraft:stone")));
        assert!(!layout.insert(uniform(i32::MIN, "minecraft:stone")));
        assert!(!layout.insert(uniform(i32::MAX, "minecraft:stone")));
        assert!(layout.section(i32::MIN).is_none());
        assert!(layout.section(127).is_some());

        assert_eq!(section_index(-4), Ok(-4));
        assert_eq!(section_index(1_000_000_000), Err(DecodeError::SectionOutOfRange(1_000_000_000)));
        assert_eq!(section_index(i64::MIN), Err(DecodeError::SectionOutOfRange(i64::MIN)));
    }

    #[test]
    fn test_descend_clips_to_max_height() {
        let mut layout = ChunkLayout::new(0, 15, None);
        layout.insert(uniform(0, "minecraft:stone"));
        layout.insert(uniform(2, "minecraft:dirt"));
        layout.insert(uniform(5, "minecraft:air"));

        let visited: Vec<(i32, usize)> = layout.descend(40).map(|(s, top)| (s.y(), top)).collect();
        assert_eq!(visited, vec![(2, 8), (0, 15)]);

        let visited: Vec<(i32, usize)> =
            layout.descend(i32::MAX).map(|(s, top)| (s.y(), top)).collect();
        assert_eq!(visited, vec![(5, 15), (2, 15), (0, 15)]);
    }

    #[test]
    fn test_block_index_order() {
        let mut slots = vec![0u32; 4096];
        // x = 1, y = 2, z = 3
        slots[2 * 256 + 3 * 16 + 1] = 1;
        let words = pack(&slots, 4, Packing::Padded).unwrap();
        let palette = vec![
            BlockState::new("minecraft:air"),
            BlockState::new("minecraft:gold_block"),
        ];
        let indices = PackedIndices::new(&words, 2, Packing::Padded, 4).unwrap();
        let section = SectionData::new(0, palette, indices);

        assert_eq!(section.block(1, 2, 3).unwrap().name, "minecraft:gold_block");
        assert_eq!(section.block(3, 2, 1).unwrap().name, "minecraft:air");
    }
}
