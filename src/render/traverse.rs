use super::layout::{ChunkLayout, SectionData, SECTION_SIZE};
use super::{Placement, TerrainOptions, TileTarget};
use crate::block_state::BlockState;
use crate::color::ColorMapping;
use crate::error::DecodeError;
use smol_str::SmolStr;

/// Surface colour painted above waterlogged blocks.
static WATER_DUMMY: BlockState = BlockState {
    name: SmolStr::new_inline("minecraft:water"),
    properties: Vec::new(),
};

const SNOW: &str = "minecraft:snow";

/// Per-column progress of a terrain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Descending,
    /// Below a water surface, looking for the floor.
    UnderWater,
    Done,
}

fn columns(scale: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..SECTION_SIZE)
        .step_by(scale)
        .flat_map(move |cz| (0..SECTION_SIZE).step_by(scale).map(move |cx| (cx, cz)))
}

fn top_of(max_height: Option<i32>) -> i32 {
    max_height.unwrap_or(i32::MAX)
}

/// Rejects a placement outside `target` before writing anything. A decoding
/// error stops the chunk and leaves earlier pixels in place.
pub fn terrain(
    layout: &ChunkLayout<'_>,
    colors: &dyn ColorMapping,
    target: &mut TileTarget<'_>,
    at: Placement,
    options: TerrainOptions,
) -> Result<(), DecodeError> {
    target.check(at)?;
    let max_y = top_of(options.max_height);
    for (cx, cz) in columns(at.scale) {
        let pixel = target.index(at, cx, cz);
        let mut state = Column::Descending;

        'sections: for (section, top) in layout.descend(max_y) {
            for cy in (0..=top).rev() {
                let block = section.block(cx, cy, cz)?;
                if block.is_empty() {
                    continue;
                }
                let y = section.base_y() + cy as i32;
                let biome = layout.biome(colors, section, cx, y, cz);
                state = paint_terrain(target, pixel, colors, block, biome, y, state, options.water);
                if state == Column::Done {
                    break 'sections;
                }
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn paint_terrain(
    target: &mut TileTarget<'_>,
    pixel: usize,
    colors: &dyn ColorMapping,
    block: &BlockState,
    biome: i32,
    y: i32,
    state: Column,
    water: bool,
) -> Column {
    let height = y as i16;
    if !water {
        target.pixels[pixel] = colors.rgb(block, biome);
        target.terrain_heights[pixel] = height;
        return Column::Done;
    }

    if block.is_water() {
        if state == Column::Descending {
            target.pixels[pixel] = colors.rgb(block, biome);
            target.water_heights[pixel] = height;
        }
        return Column::UnderWater;
    }

    // Waterlogged blocks also take the water surface when under open water.
    if block.is_waterlogged() {
        target.pixels[pixel] = colors.rgb(&WATER_DUMMY, biome);
        target.water_heights[pixel] = height;
        target.water_pixels[pixel] = colors.rgb(block, biome);
        target.terrain_heights[pixel] = height - 1;
        return Column::Done;
    }

    if state == Column::Descending {
        target.pixels[pixel] = colors.rgb(block, biome);
        target.water_heights[pixel] = height;
    }
    target.water_pixels[pixel] = colors.rgb(block, biome);
    target.terrain_heights[pixel] = height;
    Column::Done
}

/// Paints the single block layer at absolute `height`.
pub fn slice(
    layout: &ChunkLayout<'_>,
    colors: &dyn ColorMapping,
    target: &mut TileTarget<'_>,
    at: Placement,
    height: i32,
) -> Result<(), DecodeError> {
    target.check(at)?;
    let Some(section) = layout.section(height.div_euclid(SECTION_SIZE as i32)) else {
        return Ok(());
    };
    let cy = height.rem_euclid(SECTION_SIZE as i32) as usize;
    for (cx, cz) in columns(at.scale) {
        let block = section.block(cx, cy, cz)?;
        if block.is_empty() {
            continue;
        }
        let biome = layout.biome(colors, section, cx, height, cz);
        let pixel = target.index(at, cx, cz);
        target.pixels[pixel] = colors.rgb(block, biome);
    }
    Ok(())
}

/// Blocks the cave walk sees through: the empty set and snow layers when
/// they carry no properties, and anything the mapping calls foliage.
fn is_open(block: &BlockState, colors: &dyn ColorMapping) -> bool {
    if BlockState::is_empty_name(&block.name) || block.name == SNOW {
        block.properties.is_empty()
    } else {
        colors.is_foliage(&block.name)
    }
}

/// Paints the first solid block found below an opening, skipping the solid
/// crust above it. Columns that never open up stay blank.
pub fn caves(
    layout: &ChunkLayout<'_>,
    colors: &dyn ColorMapping,
    target: &mut TileTarget<'_>,
    at: Placement,
    max_height: Option<i32>,
) -> Result<(), DecodeError> {
    target.check(at)?;
    let max_y = top_of(max_height);
    for (cx, cz) in columns(at.scale) {
        let mut ignored = 0usize;
        let mut done_skipping = false;

        'sections: for (section, top) in layout.descend(max_y) {
            for cy in (0..=top).rev() {
                let block = section.block(cx, cy, cz)?;
                if is_open(block, colors) {
                    if ignored > 0 {
                        done_skipping = true;
                    }
                    continue;
                }
                if !done_skipping {
                    ignored += 1;
                    continue;
                }
                paint_cave(layout, colors, target, at, section, block, cx, cy, cz);
                break 'sections;
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn paint_cave(
    layout: &ChunkLayout<'_>,
    colors: &dyn ColorMapping,
    target: &mut TileTarget<'_>,
    at: Placement,
    section: &SectionData<'_>,
    block: &BlockState,
    cx: usize,
    cy: usize,
    cz: usize,
) {
    let y = section.base_y() + cy as i32;
    let biome = layout.biome(colors, section, cx, y, cz);
    let pixel = target.index(at, cx, cz);
    target.pixels[pixel] = colors.rgb(block, biome);
    target.terrain_heights[pixel] = y as i16;
}
