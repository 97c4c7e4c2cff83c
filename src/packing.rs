//! Fixed-width palette index arrays packed into 64-bit words.
//!
//! Two layouts exist in Anvil chunks:
//!
//! ```text
//! Padded  (1.16+):      each word holds floor(64 / bits) entries, the
//!                       remaining high bits are zero padding.
//! Compact (1.13-1.15):  entries are laid end to end and may straddle two
//!                       words.
//! ```
//!
//! Both store entry 0 in the least significant bits of word 0.

use crate::error::DecodeError;

/// Entries in one 16x16x16 section.
pub const SECTION_VOLUME: usize = 4096;

/// Entries in one section's 4x4x4 biome grid.
pub const BIOME_VOLUME: usize = 64;

const MAX_BITS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Packing {
    Padded,
    Compact,
}

impl Packing {
    /// Number of 64-bit words needed to hold `entries` values of `bits` each.
    pub fn word_count(self, bits: u32, entries: usize) -> usize {
        if bits == 0 {
            return 0;
        }
        match self {
            Packing::Padded => {
                let per_word = (64 / bits) as usize;
                entries.div_ceil(per_word)
            }
            Packing::Compact => (entries * bits as usize).div_ceil(64),
        }
    }
}

/// ceil(log2(len)), zero for palettes of one entry.
pub fn bits_for_palette(len: usize) -> u32 {
    if len <= 1 {
        0
    } else {
        usize::BITS - (len - 1).leading_zeros()
    }
}

fn check_bits(bits: u32) -> Result<u64, DecodeError> {
    if bits == 0 || bits > MAX_BITS {
        return Err(DecodeError::InvalidBitWidth(bits));
    }
    Ok((1u64 << bits) - 1)
}

fn word_at(words: &[i64], word: usize) -> Result<u64, DecodeError> {
    words
        .get(word)
        .map(|w| *w as u64)
        .ok_or(DecodeError::WordOutOfBounds {
            word,
            len: words.len(),
        })
}

/// Read entry `index` from a padded array.
pub fn decode(index: usize, words: &[i64], bits: u32) -> Result<u32, DecodeError> {
    let mask = check_bits(bits)?;
    let per_word = (64 / bits) as usize;
    let word = index / per_word;
    let offset = (index % per_word) as u32 * bits;
    Ok(((word_at(words, word)? >> offset) & mask) as u32)
}

/// Read entry `index` from a compact array, joining the two halves of an
/// entry that straddles a word boundary.
pub fn decode_compact(index: usize, words: &[i64], bits: u32) -> Result<u32, DecodeError> {
    let mask = check_bits(bits)?;
    let bit_index = index * bits as usize;
    let start = bit_index / 64;
    let end = (bit_index + bits as usize - 1) / 64;
    let offset = (bit_index % 64) as u32;

    let mut value = word_at(words, start)? >> offset;
    if start != end {
        value |= word_at(words, end)? << (64 - offset);
    }
    Ok((value & mask) as u32)
}

/// Write `slot` at `index`, clearing whatever was stored there before.
pub fn encode(
    index: usize,
    slot: u32,
    words: &mut [i64],
    bits: u32,
    packing: Packing,
) -> Result<(), DecodeError> {
    let mask = check_bits(bits)?;
    let value = slot as u64 & mask;
    let len = words.len();

    let (start, end, offset) = match packing {
        Packing::Padded => {
            let per_word = (64 / bits) as usize;
            let word = index / per_word;
            (word, word, (index % per_word) as u32 * bits)
        }
        Packing::Compact => {
            let bit_index = index * bits as usize;
            (
                bit_index / 64,
                (bit_index + bits as usize - 1) / 64,
                (bit_index % 64) as u32,
            )
        }
    };
    if end >= len {
        return Err(DecodeError::WordOutOfBounds { word: end, len });
    }

    let first = words[start] as u64 & !(mask << offset);
    words[start] = (first | (value << offset)) as i64;
    if start != end {
        let spill = 64 - offset;
        let second = words[end] as u64 & !(mask >> spill);
        words[end] = (second | (value >> spill)) as i64;
    }
    Ok(())
}

/// Pack `slots` into a freshly allocated word array.
pub fn pack(slots: &[u32], bits: u32, packing: Packing) -> Result<Vec<i64>, DecodeError> {
    check_bits(bits)?;
    let mut words = vec![0i64; packing.word_count(bits, slots.len())];
    for (index, &slot) in slots.iter().enumerate() {
        encode(index, slot, &mut words, bits, packing)?;
    }
    Ok(words)
}

/// A validated view over one packed index array.
///
/// The bit width is not stored in chunk data; it is recovered from the word
/// count, starting at the width the palette needs and never going below the
/// writer's minimum.
#[derive(Debug, Clone, Copy)]
pub struct PackedIndices<'a> {
    words: &'a [i64],
    bits: u32,
    packing: Packing,
    palette_len: usize,
    entries: usize,
}

impl<'a> PackedIndices<'a> {
    /// View over a 4096-entry block-state array.
    pub fn new(
        words: &'a [i64],
        palette_len: usize,
        packing: Packing,
        min_bits: u32,
    ) -> Result<Self, DecodeError> {
        Self::with_entries(words, palette_len, packing, min_bits, SECTION_VOLUME)
    }

    pub fn with_entries(
        words: &'a [i64],
        palette_len: usize,
        packing: Packing,
        min_bits: u32,
        entries: usize,
    ) -> Result<Self, DecodeError> {
        let mismatch = DecodeError::BitWidthMismatch {
            len: words.len(),
            palette_len,
            min_bits,
        };
        if palette_len == 0 {
            return Err(mismatch);
        }
        // Single-entry palettes may omit the array entirely.
        if palette_len == 1 && words.is_empty() {
            return Ok(PackedIndices {
                words,
                bits: 0,
                packing,
                palette_len,
                entries,
            });
        }

        let start = bits_for_palette(palette_len).max(min_bits).max(1);
        let bits = (start..=MAX_BITS)
            .find(|&bits| packing.word_count(bits, entries) == words.len())
            .ok_or(mismatch)?;

        Ok(PackedIndices {
            words,
            bits,
            packing,
            palette_len,
            entries,
        })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    /// Palette slot stored at `index`.
    pub fn get(&self, index: usize) -> Result<usize, DecodeError> {
        if index >= self.entries {
            return Err(DecodeError::IndexOutOfRange(index));
        }
        if self.bits == 0 {
            return Ok(0);
        }
        let slot = match self.packing {
            Packing::Padded => decode(index, self.words, self.bits)?,
            Packing::Compact => decode_compact(index, self.words, self.bits)?,
        };
        if slot as usize >= self.palette_len {
            return Err(DecodeError::SlotOutOfPalette {
                slot,
                palette_len: self.palette_len,
            });
        }
        Ok(slot as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_for(index: usize, bits: u32) -> u32 {
        // Spread values over the full width, including the top bit.
        let mask = ((1u64 << bits) - 1) as u32;
        (index as u32).wrapping_mul(2_654_435_761) & mask
    }

    #[test]
    fn test_padded_roundtrip_every_width() {
        for bits in 4..=32 {
            let slots: Vec<u32> = (0..SECTION_VOLUME).map(|i| slot_for(i, bits)).collect();
            let words = pack(&slots, bits, Packing::Padded).unwrap();
            let per_word = (64 / bits) as usize;
            assert_eq!(words.len(), SECTION_VOLUME.div_ceil(per_word));
            for (i, &slot) in slots.iter().enumerate() {
                assert_eq!(decode(i, &words, bits).unwrap(), slot, "bits {bits} index {i}");
            }
        }
    }

    #[test]
    fn test_compact_roundtrip_every_width() {
        for bits in 4..=32 {
            let slots: Vec<u32> = (0..SECTION_VOLUME).map(|i| slot_for(i, bits)).collect();
            let words = pack(&slots, bits, Packing::Compact).unwrap();
            assert_eq!(words.len(), 64 * bits as usize);
            for (i, &slot) in slots.iter().enumerate() {
                assert_eq!(
                    decode_compact(i, &words, bits).unwrap(),
                    slot,
                    "bits {bits} index {i}"
                );
            }
        }
    }

    #[test]
    fn test_padded_entries_never_straddle() {
        // 5 bits: 12 entries per word, top 4 bits are padding.
        let mut slots = vec![0u32; SECTION_VOLUME];
        slots[11] = 31;
        slots[12] = 31;
        let words = pack(&slots, 5, Packing::Padded).unwrap();

        assert_eq!((words[0] as u64) >> 60, 0);
        assert_eq!(((words[0] as u64) >> 55) & 0x1F, 31);
        assert_eq!((words[1] as u64) & 0x1F, 31);
    }

    #[test]
    fn test_compact_entry_straddles() {
        // 5 bits: entry 12 occupies bits 60..65, split over words 0 and 1.
        let mut slots = vec![0u32; SECTION_VOLUME];
        slots[12] = 0b10111;
        let words = pack(&slots, 5, Packing::Compact).unwrap();

        assert_eq!((words[0] as u64) >> 60, 0b0111);
        assert_eq!((words[1] as u64) & 0b1, 0b1);
        assert_eq!(decode_compact(12, &words, 5).unwrap(), 0b10111);
    }

    #[test]
    fn test_out_of_bounds_word_is_error() {
        let words = vec![0i64; 10];
        assert_eq!(
            decode(4095, &words, 4),
            Err(DecodeError::WordOutOfBounds { word: 255, len: 10 })
        );
        assert!(decode_compact(4095, &words, 4).is_err());
    }

    #[test]
    fn test_invalid_width() {
        assert_eq!(decode(0, &[0], 0), Err(DecodeError::InvalidBitWidth(0)));
        assert_eq!(decode(0, &[0], 33), Err(DecodeError::InvalidBitWidth(33)));
    }

    #[test]
    fn test_bits_for_palette() {
        assert_eq!(bits_for_palette(1), 0);
        assert_eq!(bits_for_palette(2), 1);
        assert_eq!(bits_for_palette(16), 4);
        assert_eq!(bits_for_palette(17), 5);
        assert_eq!(bits_for_palette(4096), 12);
    }

    #[test]
    fn test_width_recovered_from_word_count() {
        // Two-entry palette written with the modern 4-bit minimum.
        let words = vec![0i64; 256];
        let view = PackedIndices::new(&words, 2, Packing::Padded, 4).unwrap();
        assert_eq!(view.bits(), 4);

        // Same palette written at its natural width.
        let words = vec![0i64; 64];
        let view = PackedIndices::new(&words, 2, Packing::Padded, 0).unwrap();
        assert_eq!(view.bits(), 1);

        // 11 and 12 bits share a padded word count; the palette decides.
        let words = vec![0i64; 820];
        let view = PackedIndices::new(&words, 1500, Packing::Padded, 4).unwrap();
        assert_eq!(view.bits(), 11);
    }

    #[test]
    fn test_width_mismatch_is_error() {
        let words = vec![0i64; 100];
        assert!(matches!(
            PackedIndices::new(&words, 5, Packing::Padded, 4),
            Err(DecodeError::BitWidthMismatch { len: 100, .. })
        ));
        assert!(PackedIndices::new(&[], 0, Packing::Padded, 4).is_err());
    }

    #[test]
    fn test_uniform_section_without_words() {
        let view = PackedIndices::new(&[], 1, Packing::Padded, 4).unwrap();
        assert_eq!(view.get(0).unwrap(), 0);
        assert_eq!(view.get(4095).unwrap(), 0);
        assert_eq!(view.get(4096), Err(DecodeError::IndexOutOfRange(4096)));
    }

    #[test]
    fn test_slot_outside_palette() {
        let mut slots = vec![0u32; SECTION_VOLUME];
        slots[7] = 9;
        let words = pack(&slots, 4, Packing::Padded).unwrap();
        let view = PackedIndices::new(&words, 3, Packing::Padded, 4).unwrap();
        assert_eq!(view.get(6).unwrap(), 0);
        assert_eq!(
            view.get(7),
            Err(DecodeError::SlotOutOfPalette {
                slot: 9,
                palette_len: 3
            })
        );
    }
}
