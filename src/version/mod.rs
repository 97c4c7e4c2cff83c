pub mod anvil113;
pub mod anvil116;
pub mod anvil117;
pub mod anvil118;

use crate::chunk::Chunk;
use crate::color::ColorMapping;
use crate::error::{DecodeError, UnsupportedVersionError};
use crate::filter::StructureCatalog;
use crate::nbt::{self, NbtCompound};
use crate::render::{self, ChunkLayout, Placement, TerrainOptions, TileTarget};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::OnceLock;

/// Newest data version any family is known to read.
pub const LATEST_DATA_VERSION: i32 = 4671;

/// Status values of chunks that were never generated.
const EMPTY_STATUS: [&str; 2] = ["empty", "minecraft:empty"];

/// Whether a status value (if any) marks a chunk worth drawing.
pub fn is_generated(status: Option<&str>) -> bool {
    matches!(status, Some(status) if !EMPTY_STATUS.contains(&status))
}

pub trait ChunkRenderer: Send + Sync {
    /// Sections of a generated chunk, or `None` when there is nothing to
    /// draw.
    fn layout<'a>(&self, root: &'a NbtCompound) -> Result<Option<ChunkLayout<'a>>, DecodeError>;

    /// Copy of the tree holding only what rendering reads.
    fn minimize(&self, root: &NbtCompound) -> NbtCompound;

    fn render_terrain(
        &self,
        root: &NbtCompound,
        colors: &dyn ColorMapping,
        target: &mut TileTarget<'_>,
        at: Placement,
        options: TerrainOptions,
    ) -> Result<(), DecodeError> {
        match self.layout(root)? {
            Some(layout) => render::terrain(&layout, colors, target, at, options),
            None => Ok(()),
        }
    }

    fn render_slice(
        &self,
        root: &NbtCompound,
        colors: &dyn ColorMapping,
        target: &mut TileTarget<'_>,
        at: Placement,
        height: i32,
    ) -> Result<(), DecodeError> {
        match self.layout(root)? {
            Some(layout) => render::slice(&layout, colors, target, at, height),
            None => Ok(()),
        }
    }

    fn render_caves(
        &self,
        root: &NbtCompound,
        colors: &dyn ColorMapping,
        target: &mut TileTarget<'_>,
        at: Placement,
        max_height: Option<i32>,
    ) -> Result<(), DecodeError> {
        match self.layout(root)? {
            Some(layout) => render::caves(&layout, colors, target, at, max_height),
            None => Ok(()),
        }
    }
}

pub trait ChunkFilter: Send + Sync {
    /// Union of the block names in every section palette.
    fn palette_names<'a>(&self, root: &'a NbtCompound) -> FxHashSet<&'a str>;

    /// The structure `References` compound, if the chunk has one.
    fn structure_references<'a>(&self, root: &'a NbtCompound) -> Option<&'a NbtCompound>;

    /// Every name occurs somewhere in the chunk.
    fn match_block_names(&self, root: &NbtCompound, names: &[String]) -> bool {
        let palette = self.palette_names(root);
        names.iter().all(|name| palette.contains(name.as_str()))
    }

    /// At least one name occurs somewhere in the chunk.
    fn match_any_block_name(&self, root: &NbtCompound, names: &[String]) -> bool {
        let palette = self.palette_names(root);
        names.iter().any(|name| palette.contains(name.as_str()))
    }

    /// The chunk holds exactly these block names, no more and no fewer.
    fn palette_equals(&self, root: &NbtCompound, names: &[String]) -> bool {
        let palette = self.palette_names(root);
        let wanted: FxHashSet<&str> = names.iter().map(String::as_str).collect();
        palette == wanted
    }

    /// Every structure has a non-empty reference entry.
    fn contains_structures(
        &self,
        root: &NbtCompound,
        names: &[String],
        catalog: &StructureCatalog,
    ) -> bool {
        match self.structure_references(root) {
            Some(references) => names
                .iter()
                .all(|name| has_reference(references, name, catalog)),
            None => false,
        }
    }

    /// At least one structure has a non-empty reference entry.
    fn intersects_structures(
        &self,
        root: &NbtCompound,
        names: &[String],
        catalog: &StructureCatalog,
    ) -> bool {
        match self.structure_references(root) {
            Some(references) => names
                .iter()
                .any(|name| has_reference(references, name, catalog)),
            None => false,
        }
    }
}

/// Looks a structure up under its own name, then under its canonical
/// spelling.
fn has_reference(references: &NbtCompound, name: &str, catalog: &StructureCatalog) -> bool {
    let present = |key: &str| nbt::tag(references, key).is_some_and(|tag| !nbt::is_empty_value(tag));
    present(name) || catalog.canonical(name).is_some_and(present)
}

/// The renderer and filter bound to a range of data versions.
#[derive(Clone, Copy)]
pub struct Capabilities {
    pub family: &'static str,
    pub renderer: &'static dyn ChunkRenderer,
    pub filter: &'static dyn ChunkFilter,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

/// Ordered `(min_version, capabilities)` bindings.
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    bindings: Vec<(i32, Capabilities)>,
    ceiling: i32,
}

impl VersionRegistry {
    /// Empty registry rejecting every version above `ceiling`.
    pub fn new(ceiling: i32) -> Self {
        Self {
            bindings: Vec::new(),
            ceiling,
        }
    }

    /// Binds `capabilities` to every version from `min_version` up to the
    /// next binding. A second binding at the same threshold replaces the
    /// first.
    pub fn register(&mut self, min_version: i32, capabilities: Capabilities) {
        match self
            .bindings
            .binary_search_by_key(&min_version, |(threshold, _)| *threshold)
        {
            Ok(existing) => self.bindings[existing].1 = capabilities,
            Err(slot) => self.bindings.insert(slot, (min_version, capabilities)),
        }
    }

    /// All families from 1.13 onwards.
    pub fn standard() -> Self {
        let mut registry = Self::new(LATEST_DATA_VERSION);
        registry.register(anvil113::MIN_DATA_VERSION, anvil113::CAPABILITIES);
        registry.register(anvil116::MIN_DATA_VERSION, anvil116::CAPABILITIES);
        registry.register(anvil117::MIN_DATA_VERSION, anvil117::CAPABILITIES);
        registry.register(anvil118::MIN_DATA_VERSION, anvil118::CAPABILITIES);
        registry
    }

    pub fn ceiling(&self) -> i32 {
        self.ceiling
    }

    /// Capabilities of the greatest threshold not above `version`.
    pub fn resolve(&self, version: i32) -> Result<Capabilities, UnsupportedVersionError> {
        let unsupported = UnsupportedVersionError { version };
        if version > self.ceiling {
            tracing::debug!(version, ceiling = self.ceiling, "data version above registry ceiling");
            return Err(unsupported);
        }
        let slot = self
            .bindings
            .partition_point(|(threshold, _)| *threshold <= version);
        match slot.checked_sub(1) {
            Some(slot) => Ok(self.bindings[slot].1),
            None => {
                tracing::debug!(version, "data version below every family");
                Err(unsupported)
            }
        }
    }

    pub fn renderer(&self, version: i32) -> Result<&'static dyn ChunkRenderer, UnsupportedVersionError> {
        Ok(self.resolve(version)?.renderer)
    }

    pub fn filter(&self, version: i32) -> Result<&'static dyn ChunkFilter, UnsupportedVersionError> {
        Ok(self.resolve(version)?.filter)
    }

    /// Shortcut for a chunk's own stamp.
    pub fn resolve_chunk(&self, chunk: &Chunk) -> Result<Capabilities, UnsupportedVersionError> {
        self.resolve(chunk.data_version)
    }
}

static REGISTRY: OnceLock<VersionRegistry> = OnceLock::new();

/// Process-wide [`VersionRegistry::standard`].
pub fn registry() -> &'static VersionRegistry {
    REGISTRY.get_or_init(VersionRegistry::standard)
}
