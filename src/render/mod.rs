//! Top-down map rendering of chunk columns.
//!
//! Renderers never allocate output: they write into caller-owned buffers
//! through a [`TileTarget`], one chunk at a time, at a [`Placement`] inside
//! that target. Pixels a chunk has nothing to draw for keep whatever the
//! caller initialised them with.

pub mod layout;
pub mod region;
mod traverse;

pub use layout::{ChunkLayout, SectionData, SECTION_SIZE};
pub use traverse::{caves, slice, terrain};

use crate::chunk::REGION_CHUNKS;
use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Blocks per region edge.
pub const REGION_BLOCKS: usize = SECTION_SIZE * REGION_CHUNKS as usize;

/// Value of a pixel no chunk has written to.
pub const PIXEL_SENTINEL: u32 = 0;

/// Value of a height no chunk has written to.
pub const HEIGHT_SENTINEL: i16 = i16::MIN;

/// Scales are powers of two up to one pixel per chunk.
pub fn is_valid_scale(scale: usize) -> bool {
    scale.is_power_of_two() && scale <= SECTION_SIZE
}

/// Where one chunk lands in a target, in target pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: usize,
    pub z: usize,
    /// Blocks per pixel along each axis.
    pub scale: usize,
}

impl Placement {
    pub fn new(x: usize, z: usize, scale: usize) -> Self {
        Self { x, z, scale }
    }

    /// Placement of the chunk at region-local `local_x`/`local_z` in a
    /// region-sized target.
    pub fn in_region(local_x: usize, local_z: usize, scale: usize) -> Self {
        let edge = SECTION_SIZE / scale;
        Self::new(local_x * edge, local_z * edge, scale)
    }

    /// Pixels per chunk edge.
    pub fn edge(&self) -> usize {
        SECTION_SIZE / self.scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainOptions {
    /// Split water surfaces from the terrain below them.
    pub water: bool,
    /// Highest block Y to consider; `None` starts at the top section.
    pub max_height: Option<i32>,
}

impl Default for TerrainOptions {
    fn default() -> Self {
        Self {
            water: true,
            max_height: None,
        }
    }
}

/// Four parallel row-major buffers of equal length.
///
/// `pixels` holds the surface colour, `water_pixels` the colour of the
/// terrain under water (water mode only), and the height arrays the block Y
/// of each.
#[derive(Debug)]
pub struct TileTarget<'a> {
    pub pixels: &'a mut [u32],
    pub water_pixels: &'a mut [u32],
    pub terrain_heights: &'a mut [i16],
    pub water_heights: &'a mut [i16],
    pub width: usize,
}

impl<'a> TileTarget<'a> {
    pub fn new(
        pixels: &'a mut [u32],
        water_pixels: &'a mut [u32],
        terrain_heights: &'a mut [i16],
        water_heights: &'a mut [i16],
        width: usize,
    ) -> Self {
        debug_assert_eq!(pixels.len(), water_pixels.len());
        debug_assert_eq!(pixels.len(), terrain_heights.len());
        debug_assert_eq!(pixels.len(), water_heights.len());
        Self {
            pixels,
            water_pixels,
            terrain_heights,
            water_heights,
            width,
        }
    }

    /// Whether a whole chunk at `at` lies inside all four buffers.
    pub fn fits(&self, at: Placement) -> bool {
        if !is_valid_scale(at.scale) || self.width == 0 {
            return false;
        }
        let len = self
            .pixels
            .len()
            .min(self.water_pixels.len())
            .min(self.terrain_heights.len())
            .min(self.water_heights.len());
        let rows = len / self.width;
        let edge = at.edge();
        at.x.checked_add(edge).is_some_and(|right| right <= self.width)
            && at.z.checked_add(edge).is_some_and(|bottom| bottom <= rows)
    }

    pub(crate) fn check(&self, at: Placement) -> Result<(), DecodeError> {
        if self.fits(at) {
            Ok(())
        } else {
            Err(DecodeError::PlacementOutOfBounds {
                x: at.x,
                z: at.z,
                scale: at.scale,
            })
        }
    }

    pub(crate) fn index(&self, at: Placement, cx: usize, cz: usize) -> usize {
        (at.z + cz / at.scale) * self.width + at.x + cx / at.scale
    }
}

/// Sentinel-filled buffers covering one region.
#[derive(Debug, Clone)]
pub struct RegionImage {
    scale: usize,
    width: usize,
    pub pixels: Vec<u32>,
    pub water_pixels: Vec<u32>,
    pub terrain_heights: Vec<i16>,
    pub water_heights: Vec<i16>,
}

impl RegionImage {
    /// `None` unless `scale` is a power of two no larger than a chunk edge.
    pub fn new(scale: usize) -> Option<Self> {
        if !is_valid_scale(scale) {
            return None;
        }
        let width = REGION_BLOCKS / scale;
        let len = width * width;
        Some(Self {
            scale,
            width,
            pixels: vec![PIXEL_SENTINEL; len],
            water_pixels: vec![PIXEL_SENTINEL; len],
            terrain_heights: vec![HEIGHT_SENTINEL; len],
            water_heights: vec![HEIGHT_SENTINEL; len],
        })
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn target(&mut self) -> TileTarget<'_> {
        TileTarget::new(
            &mut self.pixels,
            &mut self.water_pixels,
            &mut self.terrain_heights,
            &mut self.water_heights,
            self.width,
        )
    }

    /// Placement of the chunk at `index` (`x + z * 32`) in this image.
    pub fn placement(&self, index: usize) -> Placement {
        let chunks = REGION_CHUNKS as usize;
        Placement::in_region(index % chunks, index / chunks, self.scale)
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| *p == PIXEL_SENTINEL)
            && self.terrain_heights.iter().all(|h| *h == HEIGHT_SENTINEL)
            && self.water_heights.iter().all(|h| *h == HEIGHT_SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_image_sizes() {
        assert_eq!(RegionImage::new(1).unwrap().pixels.len(), 512 * 512);
        assert_eq!(RegionImage::new(4).unwrap().width(), 128);
        assert_eq!(RegionImage::new(16).unwrap().pixels.len(), 32 * 32);
        assert!(RegionImage::new(3).is_none());
        assert!(RegionImage::new(32).is_none());
        assert!(RegionImage::new(0).is_none());
    }

    #[test]
    fn test_placement_in_region() {
        let image = RegionImage::new(2).unwrap();
        assert_eq!(image.placement(0), Placement::new(0, 0, 2));
        assert_eq!(image.placement(33), Placement::new(8, 8, 2));
        assert_eq!(image.placement(1023), Placement::new(248, 248, 2));
    }

    #[test]
    fn test_target_fits() {
        let mut image = RegionImage::new(1).unwrap();
        let target = image.target();
        assert!(target.fits(Placement::new(496, 496, 1)));
        assert!(!target.fits(Placement::new(497, 0, 1)));
        assert!(!target.fits(Placement::new(0, 0, 5)));
        assert!(!target.fits(Placement::new(usize::MAX - 4, 0, 1)));

        let (mut pixels, mut water) = (vec![0u32; 32 * 16], vec![0u32; 32 * 16]);
        let (mut terrain, mut water_heights) = (vec![0i16; 32 * 16], vec![0i16; 32 * 8]);
        let short = TileTarget {
            pixels: &mut pixels,
            water_pixels: &mut water,
            terrain_heights: &mut terrain,
            water_heights: &mut water_heights,
            width: 32,
        };
        assert!(short.fits(Placement::new(16, 0, 2)));
        assert!(!short.fits(Placement::new(16, 0, 1)));
    }
}
