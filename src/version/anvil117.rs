use super::anvil113;
use super::anvil116::Anvil116;
use super::{Capabilities, ChunkFilter, ChunkRenderer};
use crate::error::DecodeError;
use crate::nbt::NbtCompound;
use crate::packing::Packing;
use crate::render::ChunkLayout;
use rustc_hash::FxHashSet;

/// 20w49a
pub const MIN_DATA_VERSION: i32 = 2724;

pub const MIN_SECTION: i32 = -4;
pub const MAX_SECTION: i32 = 19;

pub const CAPABILITIES: Capabilities = Capabilities {
    family: "anvil117",
    renderer: &Anvil117,
    filter: &Anvil117,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Anvil117;

impl ChunkRenderer for Anvil117 {
    fn layout<'a>(&self, root: &'a NbtCompound) -> Result<Option<ChunkLayout<'a>>, DecodeError> {
        anvil113::level_layout(root, Packing::Padded, MIN_SECTION, MAX_SECTION)
    }

    fn minimize(&self, root: &NbtCompound) -> NbtCompound {
        Anvil116.minimize(root)
    }
}

impl ChunkFilter for Anvil117 {
    fn palette_names<'a>(&self, root: &'a NbtCompound) -> FxHashSet<&'a str> {
        Anvil116.palette_names(root)
    }

    fn structure_references<'a>(&self, root: &'a NbtCompound) -> Option<&'a NbtCompound> {
        Anvil116.structure_references(root)
    }
}
