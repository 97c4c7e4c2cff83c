use crate::block_state::BlockState;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Colour returned for blocks the mapping does not know.
pub const MISSING_COLOR: u32 = 0xFF00FF;

pub trait ColorMapping: Send + Sync {
    /// 24-bit `0xRRGGBB` colour of a block state in a biome.
    fn rgb(&self, state: &BlockState, biome: i32) -> u32;

    /// Whether the block is foliage (leaves, grass, vines...). The cave
    /// renderer treats foliage like air.
    fn is_foliage(&self, name: &str) -> bool;

    /// Numeric id for a named biome, for chunks that store biome names.
    fn biome_id(&self, name: &str) -> Option<i32> {
        let _ = name;
        None
    }
}

/// Tint applied to foliage-like blocks per biome id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tint {
    Grass,
    Foliage,
    Water,
}

/// Serialized form of a [`StaticColorMapping`].
///
/// ```json
/// {
///   "blocks": { "minecraft:stone": 8355711, "minecraft:oak_leaves": 4764952 },
///   "tinted": { "minecraft:oak_leaves": "Foliage", "minecraft:water": "Water" },
///   "foliage": ["minecraft:oak_leaves"],
///   "biomes": { "minecraft:plains": { "id": 1, "grass": 9551193, "foliage": 7842607, "water": 4159204 } }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorTable {
    #[serde(default)]
    pub blocks: HashMap<String, u32>,
    #[serde(default)]
    pub tinted: HashMap<String, Tint>,
    #[serde(default)]
    pub foliage: Vec<String>,
    #[serde(default)]
    pub biomes: HashMap<String, BiomeColors>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BiomeColors {
    pub id: i32,
    #[serde(default)]
    pub grass: Option<u32>,
    #[serde(default)]
    pub foliage: Option<u32>,
    #[serde(default)]
    pub water: Option<u32>,
}

/// Colour table keyed by block name; tinted blocks take their colour from
/// the biome instead.
#[derive(Debug, Clone, Default)]
pub struct StaticColorMapping {
    blocks: FxHashMap<String, u32>,
    tinted: FxHashMap<String, Tint>,
    foliage: FxHashSet<String>,
    biome_ids: FxHashMap<String, i32>,
    biome_colors: FxHashMap<i32, BiomeColors>,
}

impl StaticColorMapping {
    pub fn new(table: ColorTable) -> Self {
        let mut mapping = StaticColorMapping {
            blocks: table.blocks.into_iter().collect(),
            tinted: table.tinted.into_iter().collect(),
            foliage: table.foliage.into_iter().collect(),
            ..Default::default()
        };
        for (name, colors) in table.biomes {
            mapping.biome_ids.insert(name, colors.id);
            mapping.biome_colors.insert(colors.id, colors);
        }
        mapping
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn with_block(mut self, name: impl Into<String>, rgb: u32) -> Self {
        self.blocks.insert(name.into(), rgb & 0xFFFFFF);
        self
    }

    pub fn with_foliage(mut self, name: impl Into<String>) -> Self {
        self.foliage.insert(name.into());
        self
    }

    pub fn with_biome(mut self, name: impl Into<String>, colors: BiomeColors) -> Self {
        self.biome_ids.insert(name.into(), colors.id);
        self.biome_colors.insert(colors.id, colors);
        self
    }

    fn tint(&self, tint: Tint, biome: i32) -> Option<u32> {
        let colors = self.biome_colors.get(&biome)?;
        match tint {
            Tint::Grass => colors.grass,
            Tint::Foliage => colors.foliage,
            Tint::Water => colors.water,
        }
    }
}

impl ColorMapping for StaticColorMapping {
    fn rgb(&self, state: &BlockState, biome: i32) -> u32 {
        let name = state.name.as_str();
        if let Some(rgb) = self
            .tinted
            .get(name)
            .and_then(|tint| self.tint(*tint, biome))
        {
            return rgb;
        }
        self.blocks.get(name).copied().unwrap_or(MISSING_COLOR)
    }

    fn is_foliage(&self, name: &str) -> bool {
        self.foliage.contains(name)
    }

    fn biome_id(&self, name: &str) -> Option<i32> {
        self.biome_ids.get(name).copied()
    }
}
