use super::anvil113::{self, Anvil113};
use super::{Capabilities, ChunkFilter, ChunkRenderer};
use crate::error::DecodeError;
use crate::nbt::NbtCompound;
use crate::packing::Packing;
use crate::render::ChunkLayout;
use rustc_hash::FxHashSet;

/// 20w17a
pub const MIN_DATA_VERSION: i32 = 2566;

pub const CAPABILITIES: Capabilities = Capabilities {
    family: "anvil116",
    renderer: &Anvil116,
    filter: &Anvil116,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Anvil116;

impl ChunkRenderer for Anvil116 {
    fn layout<'a>(&self, root: &'a NbtCompound) -> Result<Option<ChunkLayout<'a>>, DecodeError> {
        anvil113::level_layout(root, Packing::Padded, 0, 15)
    }

    fn minimize(&self, root: &NbtCompound) -> NbtCompound {
        Anvil113.minimize(root)
    }
}

impl ChunkFilter for Anvil116 {
    fn palette_names<'a>(&self, root: &'a NbtCompound) -> FxHashSet<&'a str> {
        Anvil113.palette_names(root)
    }

    fn structure_references<'a>(&self, root: &'a NbtCompound) -> Option<&'a NbtCompound> {
        Anvil113.structure_references(root)
    }
}
