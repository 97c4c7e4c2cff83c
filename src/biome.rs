use crate::error::DecodeError;
use crate::nbt::{self, NbtCompound, NbtTag};
use crate::packing::{PackedIndices, Packing, BIOME_VOLUME};

/// Returned when no biome is known for a position.
pub const NO_BIOME: i32 = -1;

const FLAT_LEN: usize = 256;
const LEGACY_LEN: usize = 1024;
const EXTENDED_LEN: usize = 1536;

/// Added to block Y before indexing a 1536-entry array.
pub const EXTENDED_Y_OFFSET: i32 = 64;

/// Biome id at chunk-local `x`/`z` and absolute block `y`.
///
/// Positions outside the array's vertical range and arrays of any other
/// length yield [`NO_BIOME`] instead of an indexing error.
pub fn biome_at(biomes: Option<&[i32]>, x: usize, y: i32, z: usize) -> i32 {
    let Some(biomes) = biomes else {
        return NO_BIOME;
    };
    let (x, z) = (x & 15, z & 15);
    let index = match biomes.len() {
        FLAT_LEN => Some(z * 16 + x),
        LEGACY_LEN => cell_index(y, 256, x, z),
        EXTENDED_LEN => cell_index(y + EXTENDED_Y_OFFSET, 384, x, z),
        _ => None,
    };
    index
        .and_then(|i| biomes.get(i).copied())
        .unwrap_or(NO_BIOME)
}

fn cell_index(y: i32, height: i32, x: usize, z: usize) -> Option<usize> {
    if !(0..height).contains(&y) {
        return None;
    }
    Some((y as usize / 4) * 16 + (z / 4) * 4 + x / 4)
}

/// Biome ids handed to colour lookups are clamped to the byte range so that
/// malformed or legacy out-of-range ids degrade instead of failing.
pub fn clamp_biome(id: i32) -> i32 {
    id.clamp(0, 255)
}

/// A section's `biomes` compound: a palette of biome names indexed by a
/// padded 64-entry array.
#[derive(Debug, Clone)]
pub struct SectionBiomes<'a> {
    palette: Vec<&'a str>,
    indices: PackedIndices<'a>,
}

impl<'a> SectionBiomes<'a> {
    /// `None` when the compound has no usable palette.
    pub fn from_nbt(compound: &'a NbtCompound) -> Result<Option<Self>, DecodeError> {
        let Some(palette) = nbt::list(compound, "palette") else {
            return Ok(None);
        };
        let palette: Vec<&str> = palette
            .iter()
            .map(|tag| match tag {
                NbtTag::String(name) => name.as_str(),
                _ => "",
            })
            .collect();
        if palette.is_empty() {
            return Ok(None);
        }
        let words = nbt::long_array(compound, "data").unwrap_or(&[]);
        let indices =
            PackedIndices::with_entries(words, palette.len(), Packing::Padded, 0, BIOME_VOLUME)?;
        Ok(Some(SectionBiomes { palette, indices }))
    }

    /// Biome name at section-local block coordinates.
    pub fn name_at(&self, x: usize, y: usize, z: usize) -> Result<&'a str, DecodeError> {
        let index = ((y & 15) >> 2) * 16 + ((z & 15) >> 2) * 4 + ((x & 15) >> 2);
        Ok(self.palette[self.indices.get(index)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::{NbtList, NbtTag};
    use crate::packing::pack;

    #[test]
    fn test_extended_bottom_maps_to_first_cell() {
        let mut biomes = vec![0i32; 1536];
        biomes[0] = 7;
        biomes[1] = 9;
        assert_eq!(biome_at(Some(&biomes), 0, -64, 0), 7);
        assert_eq!(biome_at(Some(&biomes), 3, -61, 3), 7);
        assert_eq!(biome_at(Some(&biomes), 4, -64, 0), 9);
    }

    #[test]
    fn test_extended_top_and_beyond() {
        let mut biomes = vec![0i32; 1536];
        biomes[1535] = 42;
        assert_eq!(biome_at(Some(&biomes), 15, 319, 15), 42);
        assert_eq!(biome_at(Some(&biomes), 15, 320, 15), NO_BIOME);
        assert_eq!(biome_at(Some(&biomes), 0, -65, 0), NO_BIOME);
    }

    #[test]
    fn test_legacy_negative_y_is_sentinel() {
        let biomes = vec![3i32; 1024];
        assert_eq!(biome_at(Some(&biomes), 0, -1, 0), NO_BIOME);
        assert_eq!(biome_at(Some(&biomes), 0, -64, 0), NO_BIOME);
        assert_eq!(biome_at(Some(&biomes), 0, 256, 0), NO_BIOME);
        assert_eq!(biome_at(Some(&biomes), 0, 0, 0), 3);
        assert_eq!(biome_at(Some(&biomes), 15, 255, 15), 3);
    }

    #[test]
    fn test_legacy_cell_layout() {
        let mut biomes = vec![0i32; 1024];
        // y cell 2, z cell 1, x cell 3
        biomes[2 * 16 + 4 + 3] = 21;
        assert_eq!(biome_at(Some(&biomes), 13, 9, 6), 21);
    }

    #[test]
    fn test_flat_ignores_y() {
        let mut biomes = vec![1i32; 256];
        biomes[5 * 16 + 2] = 6;
        assert_eq!(biome_at(Some(&biomes), 2, 70, 5), 6);
        assert_eq!(biome_at(Some(&biomes), 2, -20, 5), 6);
    }

    #[test]
    fn test_absent_or_odd_length() {
        assert_eq!(biome_at(None, 0, 0, 0), NO_BIOME);
        assert_eq!(biome_at(Some(&[1, 2, 3]), 0, 0, 0), NO_BIOME);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_biome(-1), 0);
        assert_eq!(clamp_biome(300), 255);
        assert_eq!(clamp_biome(12), 12);
    }

    #[test]
    fn test_section_biomes() {
        let mut compound = NbtCompound::new();
        compound.insert(
            "palette",
            NbtTag::List(NbtList::from(vec![
                NbtTag::String("minecraft:plains".to_string()),
                NbtTag::String("minecraft:river".to_string()),
            ])),
        );
        let mut slots = vec![0u32; 64];
        slots[16 + 4 + 1] = 1;
        compound.insert("data", NbtTag::LongArray(pack(&slots, 1, Packing::Padded).unwrap()));

        let biomes = SectionBiomes::from_nbt(&compound).unwrap().unwrap();
        assert_eq!(biomes.name_at(5, 6, 4).unwrap(), "minecraft:river");
        assert_eq!(biomes.name_at(0, 0, 0).unwrap(), "minecraft:plains");
    }

    #[test]
    fn test_single_biome_section() {
        let mut compound = NbtCompound::new();
        compound.insert(
            "palette",
            NbtTag::List(NbtList::from(vec![NbtTag::String(
                "minecraft:desert".to_string(),
            )])),
        );
        let biomes = SectionBiomes::from_nbt(&compound).unwrap().unwrap();
        assert_eq!(biomes.name_at(15, 15, 15).unwrap(), "minecraft:desert");
    }
}
