use crate::nbt::{self, NbtCompound, NbtList, NbtTag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Blocks that render as nothing when they carry no properties.
const EMPTY_BLOCKS: [&str; 6] = [
    "minecraft:air",
    "minecraft:cave_air",
    "minecraft:void_air",
    "minecraft:barrier",
    "minecraft:structure_void",
    "minecraft:light",
];

const WATER_BLOCKS: [&str; 2] = ["minecraft:water", "minecraft:bubble_column"];

/// One palette entry: a namespaced block name plus its state properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    pub properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for (k, v) in &self.properties {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.properties.push((key, value)),
        }
        self
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Air-like and technical blocks without properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && Self::is_empty_name(&self.name)
    }

    pub fn is_empty_name(name: &str) -> bool {
        EMPTY_BLOCKS.contains(&name)
    }

    pub fn is_water(&self) -> bool {
        WATER_BLOCKS.contains(&self.name.as_str())
    }

    pub fn is_waterlogged(&self) -> bool {
        self.get_property("waterlogged").map(|v| v.as_str()) == Some("true")
    }

    /// Parse a palette entry. Entries without a string `Name` are rejected.
    pub fn from_nbt(compound: &NbtCompound) -> Option<Self> {
        let name = nbt::string(compound, "Name")?;
        let mut properties = Vec::new();
        if let Some(props) = nbt::compound(compound, "Properties") {
            for (key, value) in props.inner() {
                if let NbtTag::String(value) = value {
                    properties.push((SmolStr::new(key), SmolStr::new(value)));
                }
            }
            // Map iteration order is unspecified; keep equality stable.
            properties.sort();
        }
        Some(BlockState {
            name: SmolStr::new(name),
            properties,
        })
    }

    pub fn to_nbt(&self) -> NbtTag {
        let mut compound = NbtCompound::new();
        compound.insert("Name", self.name.to_string());

        if !self.properties.is_empty() {
            let mut properties = NbtCompound::new();
            for (key, value) in &self.properties {
                properties.insert(key.to_string(), value.to_string());
            }
            compound.insert("Properties", properties);
        }

        NbtTag::Compound(compound)
    }

    /// Parse a whole palette list. Malformed entries become air so that
    /// palette slots keep their positions.
    pub fn palette_from_nbt(list: &NbtList) -> Vec<BlockState> {
        list.iter()
            .map(|tag| match tag {
                NbtTag::Compound(compound) => BlockState::from_nbt(compound),
                _ => None,
            })
            .map(|state| state.unwrap_or_else(|| BlockState::new("minecraft:air")))
            .collect()
    }
}
