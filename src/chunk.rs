use crate::nbt::{self, NbtCompound};
use quartz_nbt::io::NbtIoError;
use serde::{Deserialize, Serialize};

/// Chunks per region edge.
pub const REGION_CHUNKS: i32 = 32;

/// Chunks in one region.
pub const CHUNKS_PER_REGION: usize = 1024;

/// Root key holding the format version stamp.
pub const DATA_VERSION_KEY: &str = "DataVersion";

/// Absolute chunk coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn region(&self) -> RegionPos {
        RegionPos::new(
            self.x.div_euclid(REGION_CHUNKS),
            self.z.div_euclid(REGION_CHUNKS),
        )
    }

    /// Position inside the owning region, both in `0..32`.
    pub fn local(&self) -> (usize, usize) {
        (
            self.x.rem_euclid(REGION_CHUNKS) as usize,
            self.z.rem_euclid(REGION_CHUNKS) as usize,
        )
    }

    /// Index into a region's 1024-entry arrays (`x + z * 32`).
    pub fn region_index(&self) -> usize {
        let (x, z) = self.local();
        x + z * REGION_CHUNKS as usize
    }
}

/// Region coordinate (a 32x32 block of chunks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Packed 64-bit key: `x` in the high half, `z` in the low half.
    pub fn as_long(&self) -> i64 {
        ((self.x as i64) << 32) | (self.z as u32 as i64)
    }

    pub fn from_long(key: i64) -> Self {
        Self::new((key >> 32) as i32, key as i32)
    }

    /// Absolute position of the chunk at `index` (`x + z * 32`).
    pub fn chunk(&self, index: usize) -> ChunkPos {
        let local_x = (index % REGION_CHUNKS as usize) as i32;
        let local_z = (index / REGION_CHUNKS as usize) as i32;
        ChunkPos::new(
            self.x * REGION_CHUNKS + local_x,
            self.z * REGION_CHUNKS + local_z,
        )
    }
}

/// A decoded chunk root as it arrives from the region container.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub pos: ChunkPos,
    pub data_version: i32,
    pub root: NbtCompound,
}

impl Chunk {
    /// Wraps a root compound. A missing stamp reads as 0, which no version
    /// family accepts.
    pub fn new(pos: ChunkPos, root: NbtCompound) -> Self {
        let data_version = nbt::int(&root, DATA_VERSION_KEY)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(0);
        Self {
            pos,
            data_version,
            root,
        }
    }

    /// Parse an already decompressed NBT blob.
    pub fn from_bytes(pos: ChunkPos, bytes: &[u8]) -> Result<Self, NbtIoError> {
        Ok(Self::new(pos, nbt::read_compound(bytes)?))
    }
}
