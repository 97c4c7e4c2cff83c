use super::{Placement, RegionImage, TileTarget};
use crate::chunk::{Chunk, CHUNKS_PER_REGION, REGION_CHUNKS};
use crate::color::ColorMapping;
use crate::config::{RenderMode, RenderSettings};
use crate::error::{ChunkError, ConfigError};
use crate::version::VersionRegistry;
use rayon::prelude::*;

/// A chunk that could not be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// Index in the region (`x + z * 32`).
    pub index: usize,
    pub error: ChunkError,
}

/// Draws one chunk with the family its data version resolves to.
pub fn render_chunk(
    chunk: &Chunk,
    registry: &VersionRegistry,
    colors: &dyn ColorMapping,
    target: &mut TileTarget<'_>,
    at: Placement,
    settings: &RenderSettings,
) -> Result<(), ChunkError> {
    let renderer = registry.renderer(chunk.data_version)?;
    match settings.mode {
        RenderMode::Terrain => {
            renderer.render_terrain(&chunk.root, colors, target, at, settings.terrain_options())?
        }
        RenderMode::Caves => renderer.render_caves(&chunk.root, colors, target, at, settings.max_height)?,
        RenderMode::Slice => renderer.render_slice(&chunk.root, colors, target, at, settings.layer)?,
    }
    Ok(())
}

/// Renders up to 1024 chunks (`chunks[x + z * 32]`, `None` for chunks the
/// region does not contain) into a fresh image.
pub fn render_region(
    chunks: &[Option<Chunk>],
    registry: &VersionRegistry,
    colors: &dyn ColorMapping,
    settings: &RenderSettings,
) -> Result<(RegionImage, Vec<ChunkFailure>), ConfigError> {
    settings.validate()?;
    let mut image = RegionImage::new(settings.scale).ok_or(ConfigError::InvalidScale(settings.scale))?;
    let failures = render_into(&mut image, chunks, registry, colors, settings);
    Ok((image, failures))
}

/// Renders into an existing image, leaving pixels of absent chunks as they
/// are. The image's own scale wins over `settings.scale`.
pub fn render_into(
    image: &mut RegionImage,
    chunks: &[Option<Chunk>],
    registry: &VersionRegistry,
    colors: &dyn ColorMapping,
    settings: &RenderSettings,
) -> Vec<ChunkFailure> {
    let width = image.width();
    let scale = image.scale();
    let edge = Placement::new(0, 0, scale).edge();
    let band = width * edge;
    let row = REGION_CHUNKS as usize;
    let chunks = &chunks[..chunks.len().min(CHUNKS_PER_REGION)];

    let mut failures: Vec<ChunkFailure> = image
        .pixels
        .par_chunks_mut(band)
        .zip(image.water_pixels.par_chunks_mut(band))
        .zip(image.terrain_heights.par_chunks_mut(band))
        .zip(image.water_heights.par_chunks_mut(band))
        .enumerate()
        .flat_map_iter(|(z, (((pixels, water_pixels), terrain_heights), water_heights))| {
            let mut target = TileTarget::new(pixels, water_pixels, terrain_heights, water_heights, width);
            let mut failed = Vec::new();
            for x in 0..row {
                let index = z * row + x;
                let Some(Some(chunk)) = chunks.get(index) else {
                    continue;
                };
                let at = Placement::new(x * edge, 0, scale);
                if let Err(error) = render_chunk(chunk, registry, colors, &mut target, at, settings) {
                    failed.push(ChunkFailure { index, error });
                }
            }
            failed
        })
        .collect();

    failures.sort_by_key(|failure| failure.index);
    for failure in &failures {
        tracing::warn!(index = failure.index, error = %failure.error, "skipped chunk");
    }
    failures
}
